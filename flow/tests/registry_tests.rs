mod common;

use common::*;
use darzi_flow::{ContextData, Flow, FlowOutcome, FlowRegistry, StepControl};
use serial_test::serial;

#[derive(Clone, Debug, Default)]
struct OtherContext {
  tag: String,
}

#[tokio::test]
#[serial]
async fn dispatches_by_context_type() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  let mut test_flow = Flow::<TestContext, TestError>::new(&[("only", false, None)]);
  test_flow.on_step("only", simple_handler("only", "ran"));
  registry.register(test_flow);

  let mut other_flow = Flow::<OtherContext, TestError>::new(&[("mark", false, None)]);
  other_flow.on_step("mark", |ctx: ContextData<OtherContext>| {
    Box::pin(async move {
      ctx.write().tag = "other".to_string();
      Ok::<StepControl, TestError>(StepControl::Continue)
    })
  });
  registry.register(other_flow);

  let test_ctx = ContextData::new(TestContext::default());
  assert_eq!(registry.run(test_ctx.clone()).await.unwrap(), FlowOutcome::Completed);
  assert_eq!(test_ctx.read().message, "ran");

  let other_ctx = ContextData::new(OtherContext::default());
  assert_eq!(registry.run(other_ctx.clone()).await.unwrap(), FlowOutcome::Completed);
  assert_eq!(other_ctx.read().tag, "other");
}

#[tokio::test]
#[serial]
async fn unregistered_context_type_errors() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  let ctx = ContextData::new(TestContext::default());
  let err = registry.run(ctx).await.unwrap_err();
  match err {
    TestError::Engine(s) => assert!(s.contains("NotRegistered")),
    other => panic!("expected engine error, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn handler_errors_surface_through_the_registry() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  let mut flow = Flow::<TestContext, TestError>::new(&[("boom", false, None)]);
  flow.on_step("boom", failing_handler("boom", "from registry"));
  registry.register(flow);

  let ctx = ContextData::new(TestContext::default());
  let err = registry.run(ctx).await.unwrap_err();
  assert_eq!(err, TestError::Handler("from registry".to_string()));
}

#[tokio::test]
#[serial]
async fn re_registering_replaces_the_flow() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  let mut first = Flow::<TestContext, TestError>::new(&[("v", false, None)]);
  first.on_step("v", simple_handler("v", "first"));
  registry.register(first);

  let mut second = Flow::<TestContext, TestError>::new(&[("v", false, None)]);
  second.on_step("v", simple_handler("v", "second"));
  registry.register(second);

  let ctx = ContextData::new(TestContext::default());
  registry.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().message, "second");
}
