//! The [`Flow`] definition: named steps, hook registration, and execution.

use crate::context::ContextData;
use crate::control::{FlowOutcome, StepControl};
use crate::error::FlowError;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{event, span, Level};

/// Predicate deciding at runtime whether a step is skipped for this run.
pub type SkipWhen<TData> = Arc<dyn Fn(ContextData<TData>) -> bool + Send + Sync + 'static>;

/// An async step handler: takes a clone of the shared context, answers with a
/// [`StepControl`] or the flow's error type.
pub type StepHandler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<StepControl, Err>> + Send>>
    + Send
    + Sync,
>;

/// Definition of a single step: its name, whether the flow tolerates the step
/// having no handlers, and an optional skip predicate over the root context.
#[derive(Clone)]
pub struct StepDef<TData: 'static + Send + Sync> {
  pub name: String,
  pub optional: bool,
  pub skip_when: Option<SkipWhen<TData>>,
}

impl<TData: 'static + Send + Sync> std::fmt::Debug for StepDef<TData> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("optional", &self.optional)
      .field("has_skip_when", &self.skip_when.is_some())
      .finish()
  }
}

/// An ordered pipeline of named steps over a shared context `TData`.
///
/// `Err` is the error type the application's handlers return; it must absorb
/// [`FlowError`] so engine-level failures (e.g. a required step without a
/// handler) surface through the same channel.
pub struct Flow<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  steps: Vec<StepDef<TData>>,
  before: HashMap<String, Vec<StepHandler<TData, Err>>>,
  on: HashMap<String, Vec<StepHandler<TData, Err>>>,
  after: HashMap<String, Vec<StepHandler<TData, Err>>>,
}

impl<TData, Err> Flow<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a flow from `(name, optional, skip_when)` step definitions.
  pub fn new(step_defs: &[(&str, bool, Option<SkipWhen<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, optional, skip)| StepDef {
        name: (*name).to_string(),
        optional: *optional,
        skip_when: skip.clone(),
      })
      .collect();
    Self {
      steps,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  fn ensure_step_exists(&self, step_name: &str) {
    // A typo'd step name is a programming error; fail loudly at registration.
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!("flow setup error: step '{}' not found in flow definition", step_name);
    }
  }

  /// Registers a `before` hook for `step_name`.
  pub fn before_step<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<StepControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let handler: StepHandler<TData, Err> = Box::new(move |ctx| {
      let fut = handler_fn(ctx);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    self.before.entry(step_name.to_string()).or_default().push(handler);
  }

  /// Registers the main handler for `step_name`. A step may carry several.
  pub fn on_step<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<StepControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let handler: StepHandler<TData, Err> = Box::new(move |ctx| {
      let fut = handler_fn(ctx);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    self.on.entry(step_name.to_string()).or_default().push(handler);
  }

  /// Registers an `after` hook for `step_name`.
  pub fn after_step<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<StepControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let handler: StepHandler<TData, Err> = Box::new(move |ctx| {
      let fut = handler_fn(ctx);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    self.after.entry(step_name.to_string()).or_default().push(handler);
  }

  async fn run_phase(
    &self,
    handlers: Option<&Vec<StepHandler<TData, Err>>>,
    phase: &'static str,
    ctx_data: &ContextData<TData>,
  ) -> Result<StepControl, Err> {
    if let Some(handlers) = handlers {
      for (idx, handler_fn) in handlers.iter().enumerate() {
        let handler_span = span!(Level::DEBUG, "flow_handler", phase, handler_index = idx);
        let _guard = handler_span.enter();
        match handler_fn(ctx_data.clone()).await {
          Ok(StepControl::Continue) => {}
          Ok(StepControl::Halt) => {
            event!(Level::INFO, phase, "flow halted by handler");
            return Ok(StepControl::Halt);
          }
          Err(e) => {
            event!(Level::ERROR, phase, error = %e, "flow handler failed");
            return Err(e);
          }
        }
      }
    }
    Ok(StepControl::Continue)
  }

  /// Executes the flow against `ctx_data`, step by step.
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<FlowOutcome, Err> {
    let flow_span = span!(
      Level::INFO,
      "flow_run",
      context_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    );
    let _flow_guard = flow_span.enter();

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let name = step_def.name.as_str();
      let step_span = span!(Level::INFO, "flow_step", step = name, step_index = step_idx);
      let _step_guard = step_span.enter();

      if let Some(skip_fn) = &step_def.skip_when {
        if skip_fn(ctx_data.clone()) {
          event!(Level::DEBUG, step = name, "step skipped by skip_when");
          continue;
        }
      }

      let has_any = [&self.before, &self.on, &self.after]
        .iter()
        .any(|m| m.get(name).map_or(false, |v| !v.is_empty()));
      if !has_any {
        if step_def.optional {
          event!(Level::DEBUG, step = name, "optional step has no handlers, skipping");
          continue;
        }
        return Err(Err::from(FlowError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      for (phase, handlers) in [
        ("before", self.before.get(name)),
        ("on", self.on.get(name)),
        ("after", self.after.get(name)),
      ] {
        if self.run_phase(handlers, phase, &ctx_data).await? == StepControl::Halt {
          return Ok(FlowOutcome::Halted);
        }
      }
    }

    event!(Level::DEBUG, "flow completed");
    Ok(FlowOutcome::Completed)
  }
}
