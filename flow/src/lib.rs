//! darzi-flow: a small async, type-safe step-pipeline engine.
//!
//! A [`Flow`] is an ordered list of named steps. Each step can carry
//! `before`/`on`/`after` handlers, can be marked optional, and can be skipped
//! at runtime through a predicate over the shared context. Handlers receive a
//! [`ContextData`] clone (shared, lock-guarded state) and answer with a
//! [`StepControl`] to continue or halt the run.
//!
//! Flows are registered once, keyed by their context type, in a
//! [`FlowRegistry`]; callers dispatch with `registry.run(ContextData::new(ctx))`.

pub mod context;
pub mod control;
pub mod error;
pub mod flow;
pub mod registry;

pub use crate::context::ContextData;
pub use crate::control::{FlowOutcome, StepControl};
pub use crate::error::{FlowError, FlowResult};
pub use crate::flow::{Flow, SkipWhen, StepDef, StepHandler};
pub use crate::registry::FlowRegistry;
