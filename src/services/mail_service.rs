use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Delivers one-time reset codes to an email address.
#[async_trait]
pub trait OtpNotifier: Send + Sync {
    async fn send_otp(&self, to: &str, code: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    smtp_host: String,
    smtp_port: u16,
    credentials: Credentials,
    from_email: String,
    from_name: String,
}

impl SmtpMailer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            smtp_host: config.smtp_host.clone(),
            smtp_port: config.smtp_port,
            credentials: Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ),
            from_email: config.mail_from_address.clone(),
            from_name: config.mail_from_name.clone(),
        }
    }

    fn build_transport(&self) -> Result<SmtpTransport> {
        let transport = SmtpTransport::relay(&self.smtp_host)
            .map_err(|e| AppError::Mail(format!("SMTP relay error: {}", e)))?
            .port(self.smtp_port)
            .credentials(self.credentials.clone())
            .build();
        Ok(transport)
    }

    fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }
}

#[async_trait]
impl OtpNotifier for SmtpMailer {
    async fn send_otp(&self, to: &str, code: &str) -> Result<()> {
        let body = format!(
            "Your password reset OTP is: {}.\n\n\
             Enter this code on the verification page to continue.\n\
             If you did not request a password reset, you can ignore this email.\n",
            code
        );

        let email = Message::builder()
            .from(
                self.from_header()
                    .parse()
                    .map_err(|e| AppError::Mail(format!("Invalid from address: {}", e)))?,
            )
            .to(to
                .parse()
                .map_err(|e| AppError::Mail(format!("Invalid to address: {}", e)))?)
            .subject("Your password reset code")
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| AppError::Mail(format!("Failed to build email: {}", e)))?;

        let mailer = self.build_transport()?;

        // lettre's SMTP transport is blocking
        tokio::task::spawn_blocking(move || {
            mailer
                .send(&email)
                .map_err(|e| AppError::Mail(format!("Failed to send email: {}", e)))
        })
        .await
        .map_err(|e| AppError::Mail(format!("Email task failed: {}", e)))??;

        Ok(())
    }
}
