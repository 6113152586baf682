#![allow(dead_code)]

use darzi_flow::{ContextData, FlowError, StepControl, StepHandler};
use tracing::Level;

#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub message: String,
  pub steps_executed: Vec<String>,
  pub halt_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("engine error: {0}")]
  Engine(String),

  #[error("handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(fe: FlowError) -> Self {
    // Stringified so the test error stays Eq-comparable.
    TestError::Engine(format!("{:?}", fe))
  }
}

pub fn simple_handler(step_name: &'static str, append: &'static str) -> StepHandler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    let step = step_name.to_string();
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.message.push_str(append);
      guard.steps_executed.push(step.clone());
      if guard.halt_at.as_deref() == Some(step.as_str()) {
        return Ok(StepControl::Halt);
      }
      Ok(StepControl::Continue)
    })
  })
}

pub fn failing_handler(step_name: &'static str, error_message: &'static str) -> StepHandler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    let step = step_name.to_string();
    let msg = error_message.to_string();
    Box::pin(async move {
      ctx.write().steps_executed.push(step);
      Err(TestError::Handler(msg))
    })
  })
}

use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
