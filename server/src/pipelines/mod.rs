//! Defines and registers every flow the server runs.

use crate::errors::AppError;
use crate::state::AppState;
use darzi_flow::FlowRegistry;
use std::sync::Arc;

pub mod contexts;

pub mod broadcast_flow;
pub mod checkout_flow;
pub mod signin_flow;
pub mod signup_flow;
pub mod status_flow;

/// Called once at startup.
pub fn register_all_flows(registry: &Arc<FlowRegistry<AppError>>, app_state: &AppState) {
  tracing::info!("Registering flows...");

  status_flow::register_status_flow(registry, app_state);
  checkout_flow::register_checkout_flow(registry, app_state);
  signup_flow::register_signup_flow(registry, app_state);
  signin_flow::register_signin_flow(registry, app_state);
  broadcast_flow::register_broadcast_flow(registry, app_state);

  tracing::info!("All flows registered.");
}
