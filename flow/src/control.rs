//! Signals steering a flow run and the outcome of a completed run.

/// Returned by every handler: keep going, or halt the whole flow here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepControl {
  /// Run the remaining handlers of this step and the following steps.
  Continue,
  /// Halt immediately. No further handler in this or any later step runs.
  Halt,
}

/// Final outcome of a flow run that did not error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
  /// Every non-skipped step ran to the end.
  Completed,
  /// A handler answered [`StepControl::Halt`].
  Halted,
}
