//! HTML → PDF rasterization through a WebDriver-driven headless Chrome.
//!
//! The session is pooled: one WebDriver connection is kept alive behind a
//! mutex and reused across renders, reconnecting only after a failure,
//! instead of launching a browser per invoice.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thirtyfour::common::capabilities::chromium::ChromiumLikeCapabilities;
use thirtyfour::extensions::cdp::ChromeDevTools;
use thirtyfour::{DesiredCapabilities, WebDriver};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::errors::AppError;

#[async_trait]
pub trait PdfRenderer: Send + Sync {
  async fn render_pdf(&self, html: &str) -> Result<Vec<u8>, AppError>;
}

pub struct WebDriverPdfRenderer {
  webdriver_url: String,
  session: Mutex<Option<WebDriver>>,
}

impl WebDriverPdfRenderer {
  pub fn new(webdriver_url: impl Into<String>) -> Self {
    Self {
      webdriver_url: webdriver_url.into(),
      session: Mutex::new(None),
    }
  }

  async fn connect(&self) -> Result<WebDriver, AppError> {
    let mut caps = DesiredCapabilities::chrome();
    caps
      .set_headless()
      .map_err(|e| AppError::Pdf(format!("Failed to set headless capability: {}", e)))?;
    let driver = WebDriver::new(&self.webdriver_url, caps)
      .await
      .map_err(|e| AppError::Pdf(format!("Failed to start WebDriver session: {}", e)))?;
    info!(url = %self.webdriver_url, "webdriver session established");
    Ok(driver)
  }

  async fn print_with(&self, driver: &WebDriver, html: &str) -> Result<Vec<u8>, AppError> {
    let data_url = format!("data:text/html;base64,{}", BASE64.encode(html.as_bytes()));
    driver
      .goto(data_url)
      .await
      .map_err(|e| AppError::Pdf(format!("Failed to load invoice HTML: {}", e)))?;

    let dev_tools = ChromeDevTools::new(driver.handle.clone());
    let result = dev_tools
      .execute_cdp_with_params(
        "Page.printToPDF",
        serde_json::json!({
          "printBackground": true,
          "preferCSSPageSize": true,
        }),
      )
      .await
      .map_err(|e| AppError::Pdf(format!("Page.printToPDF failed: {}", e)))?;

    let encoded = result
      .get("data")
      .and_then(|v| v.as_str())
      .ok_or_else(|| AppError::Pdf("Page.printToPDF returned no data".to_string()))?;
    BASE64
      .decode(encoded)
      .map_err(|e| AppError::Pdf(format!("Invalid PDF payload from browser: {}", e)))
  }
}

#[async_trait]
impl PdfRenderer for WebDriverPdfRenderer {
  #[instrument(name = "pdf::render", skip_all, fields(html_len = html.len()))]
  async fn render_pdf(&self, html: &str) -> Result<Vec<u8>, AppError> {
    let mut guard = self.session.lock().await;

    if guard.is_none() {
      *guard = Some(self.connect().await?);
    }
    let Some(driver) = guard.as_ref() else {
      return Err(AppError::Pdf("WebDriver session unavailable".to_string()));
    };

    match self.print_with(driver, html).await {
      Ok(bytes) => Ok(bytes),
      Err(first_err) => {
        // The session may have died; reconnect once and retry the render.
        warn!(error = %first_err, "render failed, recycling webdriver session");
        if let Some(dead) = guard.take() {
          let _ = dead.quit().await;
        }
        let fresh = self.connect().await?;
        let result = self.print_with(&fresh, html).await;
        *guard = Some(fresh);
        result
      }
    }
  }
}
