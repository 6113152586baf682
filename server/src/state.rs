use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::mailer::Mailer;
use crate::services::pdf::PdfRenderer;
use darzi_flow::FlowRegistry;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub db_pool: PgPool,
  pub flows: Arc<FlowRegistry<AppError>>,
  pub config: Arc<AppConfig>,
  pub mailer: Arc<dyn Mailer>,
  pub pdf: Arc<dyn PdfRenderer>,
}
