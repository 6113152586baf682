use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  /// Public base URL, used when building feedback links in emails.
  pub app_base_url: String,

  pub jwt_secret: String,
  pub admin_password: String,

  pub smtp_host: String,
  pub smtp_port: u16,
  pub smtp_username: String,
  pub smtp_password: String,
  pub email_sender: String,
  pub email_sender_name: String,

  /// WebDriver endpoint of the headless Chrome used for invoice PDFs.
  pub webdriver_url: String,

  /// Broadcast throttling: recipients per batch and pause between batches.
  pub broadcast_batch_size: usize,
  pub broadcast_batch_delay_ms: u64,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;
    let app_base_url = get_env("APP_BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));

    let jwt_secret = get_env("JWT_SECRET")?;
    let admin_password = get_env("ADMIN_PASSWORD")?;

    let smtp_host = get_env("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string());
    let smtp_port = get_env("SMTP_PORT")
      .unwrap_or_else(|_| "587".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SMTP_PORT: {}", e)))?;
    let smtp_username = get_env("SMTP_USERNAME").unwrap_or_default();
    let smtp_password = get_env("SMTP_PASSWORD").unwrap_or_default();
    let email_sender = get_env("EMAIL_SENDER").unwrap_or_else(|_| "orders@darzi.example".to_string());
    let email_sender_name = get_env("EMAIL_SENDER_NAME").unwrap_or_else(|_| "DARZI".to_string());

    let webdriver_url = get_env("WEBDRIVER_URL").unwrap_or_else(|_| "http://localhost:9515".to_string());

    let broadcast_batch_size = get_env("BROADCAST_BATCH_SIZE")
      .unwrap_or_else(|_| "25".to_string())
      .parse::<usize>()
      .map_err(|e| AppError::Config(format!("Invalid BROADCAST_BATCH_SIZE: {}", e)))?;
    let broadcast_batch_delay_ms = get_env("BROADCAST_BATCH_DELAY_MS")
      .unwrap_or_else(|_| "2000".to_string())
      .parse::<u64>()
      .map_err(|e| AppError::Config(format!("Invalid BROADCAST_BATCH_DELAY_MS: {}", e)))?;

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      app_base_url,
      jwt_secret,
      admin_password,
      smtp_host,
      smtp_port,
      smtp_username,
      smtp_password,
      email_sender,
      email_sender_name,
      webdriver_url,
      broadcast_batch_size,
      broadcast_batch_delay_ms,
    })
  }
}
