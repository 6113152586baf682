mod common;

use common::*;
use darzi_flow::{ContextData, Flow, FlowError, FlowOutcome, StepControl};
use serial_test::serial;
use std::sync::Arc;

#[tokio::test]
#[serial]
async fn runs_steps_in_order() {
  setup_tracing();
  let mut flow =
    Flow::<TestContext, TestError>::new(&[("step1", false, None), ("step2", false, None), ("step3", false, None)]);

  flow.on_step("step1", simple_handler("step1", " S1"));
  flow.on_step("step2", simple_handler("step2", " S2"));
  flow.on_step("step3", simple_handler("step3", " S3"));

  let ctx = ContextData::new(TestContext::default());
  let outcome = flow.run(ctx.clone()).await.unwrap();

  assert_eq!(outcome, FlowOutcome::Completed);
  let guard = ctx.read();
  assert_eq!(guard.counter, 3);
  assert_eq!(guard.message, " S1 S2 S3");
  assert_eq!(guard.steps_executed, vec!["step1", "step2", "step3"]);
}

#[tokio::test]
#[serial]
async fn halts_on_step_control_halt() {
  setup_tracing();
  let mut flow = Flow::<TestContext, TestError>::new(&[
    ("stepA", false, None),
    ("halt_step", false, None),
    ("stepC", false, None),
  ]);

  flow.on_step("stepA", simple_handler("stepA", "A"));
  flow.on_step("halt_step", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push("halt_step".to_string());
      Ok::<StepControl, FlowError>(StepControl::Halt)
    })
  });
  flow.on_step("stepC", simple_handler("stepC", "C"));

  let ctx = ContextData::new(TestContext::default());
  let outcome = flow.run(ctx.clone()).await.unwrap();

  assert_eq!(outcome, FlowOutcome::Halted);
  let guard = ctx.read();
  assert_eq!(guard.counter, 1);
  assert_eq!(guard.steps_executed, vec!["stepA", "halt_step"]);
}

#[tokio::test]
#[serial]
async fn propagates_handler_error_and_stops() {
  setup_tracing();
  let mut flow = Flow::<TestContext, TestError>::new(&[
    ("good_step", false, None),
    ("bad_step", false, None),
    ("never_step", false, None),
  ]);

  flow.on_step("good_step", simple_handler("good_step", "Good"));
  flow.on_step("bad_step", failing_handler("bad_step", "boom"));
  flow.on_step("never_step", simple_handler("never_step", "NeverRun"));

  let ctx = ContextData::new(TestContext::default());
  let err = flow.run(ctx.clone()).await.unwrap_err();
  assert_eq!(err, TestError::Handler("boom".to_string()));

  let guard = ctx.read();
  assert_eq!(guard.counter, 1);
  assert_eq!(guard.message, "Good");
  assert_eq!(guard.steps_executed, vec!["good_step", "bad_step"]);
}

#[tokio::test]
#[serial]
async fn skips_step_when_predicate_is_true() {
  setup_tracing();
  let mut flow = Flow::<TestContext, TestError>::new(&[
    ("step1", false, None),
    (
      "skipped_step",
      false,
      Some(Arc::new(|ctx: ContextData<TestContext>| ctx.read().counter > 0)),
    ),
    ("step3", false, None),
  ]);

  flow.on_step("step1", simple_handler("step1", " S1"));
  flow.on_step("skipped_step", simple_handler("skipped_step", " SKIPPED"));
  flow.on_step("step3", simple_handler("step3", " S3"));

  let ctx = ContextData::new(TestContext::default());
  let outcome = flow.run(ctx.clone()).await.unwrap();

  assert_eq!(outcome, FlowOutcome::Completed);
  let guard = ctx.read();
  assert_eq!(guard.counter, 2);
  assert_eq!(guard.message, " S1 S3");
  assert_eq!(guard.steps_executed, vec!["step1", "step3"]);
}

#[tokio::test]
#[serial]
async fn required_step_without_handler_fails() {
  setup_tracing();
  let flow = Flow::<TestContext, TestError>::new(&[("bare_step", false, None)]);

  let ctx = ContextData::new(TestContext::default());
  let err = flow.run(ctx).await.unwrap_err();
  match err {
    TestError::Engine(s) => {
      assert!(s.contains("HandlerMissing"));
      assert!(s.contains("bare_step"));
    }
    other => panic!("expected engine error, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn optional_step_without_handler_is_skipped() {
  setup_tracing();
  let flow = Flow::<TestContext, TestError>::new(&[("optional_bare", true, None)]);

  let ctx = ContextData::new(TestContext::default());
  let outcome = flow.run(ctx.clone()).await.unwrap();
  assert_eq!(outcome, FlowOutcome::Completed);
  assert!(ctx.read().steps_executed.is_empty());
}

#[tokio::test]
#[serial]
async fn before_and_after_hooks_run_around_on() {
  setup_tracing();
  let mut flow = Flow::<TestContext, TestError>::new(&[("staged", false, None)]);

  flow.before_step("staged", simple_handler("staged:before", "<"));
  flow.on_step("staged", simple_handler("staged:on", "="));
  flow.after_step("staged", simple_handler("staged:after", ">"));

  let ctx = ContextData::new(TestContext::default());
  let outcome = flow.run(ctx.clone()).await.unwrap();

  assert_eq!(outcome, FlowOutcome::Completed);
  let guard = ctx.read();
  assert_eq!(guard.message, "<=>");
  assert_eq!(guard.steps_executed, vec!["staged:before", "staged:on", "staged:after"]);
}

#[tokio::test]
#[serial]
async fn halt_in_after_hook_skips_following_steps() {
  setup_tracing();
  let mut flow = Flow::<TestContext, TestError>::new(&[("first", false, None), ("second", false, None)]);

  flow.on_step("first", simple_handler("first", "1"));
  flow.after_step("first", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push("first:after".to_string());
      Ok::<StepControl, FlowError>(StepControl::Halt)
    })
  });
  flow.on_step("second", simple_handler("second", "2"));

  let ctx = ContextData::new(TestContext::default());
  let outcome = flow.run(ctx.clone()).await.unwrap();

  assert_eq!(outcome, FlowOutcome::Halted);
  let guard = ctx.read();
  assert_eq!(guard.message, "1");
  assert_eq!(guard.steps_executed, vec!["first", "first:after"]);
}
