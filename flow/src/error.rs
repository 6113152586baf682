use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Failures raised by the engine itself, as opposed to errors returned by the
/// application's own step handlers (those surface as the flow's `Err` type).
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("handler missing for required step '{step_name}'")]
  HandlerMissing { step_name: String },

  #[error("flow setup error for step '{step_name}': {message}")]
  Setup { step_name: String, message: String },

  #[error("no flow registered for context type {context_type}")]
  NotRegistered { context_type: String },

  #[error("context type mismatch during dispatch (expected {expected_type})")]
  ContextMismatch { expected_type: String },

  #[error("error in a step handler: {source}")]
  Handler {
    #[source]
    source: AnyhowError,
  },

  #[error("internal flow error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    FlowError::Handler { source: err }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
