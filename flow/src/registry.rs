//! Type-keyed registry dispatching flow runs by context type.

use crate::context::ContextData;
use crate::control::FlowOutcome;
use crate::error::FlowError;
use crate::flow::Flow;

use async_trait::async_trait;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use tracing::{event, Level};

/// Type-erased runner so flows over different context types live in one map.
#[async_trait]
trait AnyFlowRunner<AppErr>: Send + Sync
where
  AppErr: std::error::Error + Send + Sync + 'static,
{
  /// `ctx_obj` must contain a `ContextData<TData>` for the runner's `TData`.
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<FlowOutcome, AppErr>;
}

struct FlowRunner<TData, HandlerErr, AppErr>
where
  TData: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<HandlerErr> + From<FlowError> + Send + Sync + 'static,
{
  flow: Arc<Flow<TData, HandlerErr>>,
  _phantom: PhantomData<fn() -> (HandlerErr, AppErr)>,
}

#[async_trait]
impl<TData, HandlerErr, AppErr> AnyFlowRunner<AppErr> for FlowRunner<TData, HandlerErr, AppErr>
where
  TData: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<HandlerErr> + From<FlowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<FlowOutcome, AppErr> {
    let ctx_data = match ctx_obj.downcast::<ContextData<TData>>() {
      Ok(boxed) => *boxed,
      Err(_) => {
        let expected = std::any::type_name::<ContextData<TData>>();
        event!(Level::ERROR, %expected, "context object type mismatch in registry dispatch");
        return Err(AppErr::from(FlowError::ContextMismatch {
          expected_type: expected.to_string(),
        }));
      }
    };
    self.flow.run(ctx_data).await.map_err(AppErr::from)
  }
}

/// Holds one flow per context type; `run` looks the flow up by the context's
/// `TypeId` and executes it. `AppErr` is the application error `run` returns,
/// which must absorb both handler errors and engine errors.
pub struct FlowRegistry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  registry: Mutex<HashMap<TypeId, Arc<dyn AnyFlowRunner<AppErr>>>>,
}

impl<AppErr> FlowRegistry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      registry: Mutex::new(HashMap::new()),
    }
  }

  /// Registers `flow` for its context type. A later registration for the same
  /// context type replaces the earlier one.
  pub fn register<TData, HandlerErr>(&self, flow: Flow<TData, HandlerErr>)
  where
    TData: 'static + Send + Sync,
    HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
    AppErr: From<HandlerErr>,
  {
    event!(
      Level::DEBUG,
      context_type = %std::any::type_name::<TData>(),
      "registering flow"
    );
    let runner = FlowRunner::<TData, HandlerErr, AppErr> {
      flow: Arc::new(flow),
      _phantom: PhantomData,
    };
    self
      .registry
      .lock()
      .unwrap()
      .insert(TypeId::of::<TData>(), Arc::new(runner));
  }

  /// Runs the flow registered for `TData` against `ctx_data`.
  pub async fn run<TData>(&self, ctx_data: ContextData<TData>) -> Result<FlowOutcome, AppErr>
  where
    TData: 'static + Send + Sync,
  {
    let runner = {
      let reg = self.registry.lock().unwrap();
      reg.get(&TypeId::of::<TData>()).cloned()
    };
    let runner = runner.ok_or_else(|| {
      let context_type = std::any::type_name::<TData>();
      event!(Level::ERROR, %context_type, "no flow registered for context type");
      AppErr::from(FlowError::NotRegistered {
        context_type: context_type.to_string(),
      })
    })?;

    let ctx_obj: Box<dyn Any + Send> = Box::new(ctx_data);
    runner.run_erased(ctx_obj).await
  }
}

impl<AppErr> Default for FlowRegistry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}
