//! Outbound email behind a trait so pipelines stay testable without SMTP.

use async_trait::async_trait;
use lettre::{
  message::{header::ContentType, Attachment, MultiPart, SinglePart},
  transport::smtp::authentication::Credentials,
  AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{info, instrument};

use crate::config::AppConfig;
use crate::errors::AppError;

#[derive(Debug, Clone)]
pub struct EmailAttachment {
  pub filename: String,
  pub content_type: String,
  pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct OutboundEmail {
  pub to: String,
  pub subject: String,
  pub html_body: String,
  pub attachment: Option<EmailAttachment>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, email: OutboundEmail) -> Result<(), AppError>;
  fn sender(&self) -> &str;
}

pub struct SmtpMailer {
  transport: AsyncSmtpTransport<Tokio1Executor>,
  from_email: String,
  from_name: String,
}

impl SmtpMailer {
  pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
    let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
      .map_err(|e| AppError::Config(format!("Failed to create SMTP transport: {}", e)))?
      .port(config.smtp_port);

    if !config.smtp_username.is_empty() {
      builder = builder.credentials(Credentials::new(
        config.smtp_username.clone(),
        config.smtp_password.clone(),
      ));
    }

    Ok(Self {
      transport: builder.build(),
      from_email: config.email_sender.clone(),
      from_name: config.email_sender_name.clone(),
    })
  }
}

#[async_trait]
impl Mailer for SmtpMailer {
  #[instrument(name = "mailer::send", skip(self, email), fields(to = %email.to, subject = %email.subject))]
  async fn send(&self, email: OutboundEmail) -> Result<(), AppError> {
    let from_address = format!("{} <{}>", self.from_name, self.from_email);
    let builder = Message::builder()
      .from(
        from_address
          .parse()
          .map_err(|e| AppError::Mail(format!("Invalid from address: {}", e)))?,
      )
      .to(email
        .to
        .parse()
        .map_err(|e| AppError::Mail(format!("Invalid to address: {}", e)))?)
      .subject(&email.subject);

    let html_part = SinglePart::builder()
      .header(ContentType::TEXT_HTML)
      .body(email.html_body.clone());

    let message = match email.attachment {
      Some(att) => {
        let content_type = ContentType::parse(&att.content_type)
          .map_err(|e| AppError::Mail(format!("Invalid attachment content type: {}", e)))?;
        let attachment_part = Attachment::new(att.filename).body(att.bytes, content_type);
        builder
          .multipart(MultiPart::mixed().singlepart(html_part).singlepart(attachment_part))
          .map_err(|e| AppError::Mail(format!("Failed to build email: {}", e)))?
      }
      None => builder
        .singlepart(html_part)
        .map_err(|e| AppError::Mail(format!("Failed to build email: {}", e)))?,
    };

    self
      .transport
      .send(message)
      .await
      .map_err(|e| AppError::Mail(format!("Failed to send email via SMTP: {}", e)))?;

    info!("email dispatched");
    Ok(())
  }

  fn sender(&self) -> &str {
    &self.from_email
  }
}
