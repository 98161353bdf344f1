//! Outgoing mail for password reset codes

use mail_send::mail_builder::MessageBuilder;
use mail_send::{Credentials, SmtpClientBuilder};
use thiserror::Error;
use tracer_common::config::SmtpConfig;
use tracer_common::password::OTP_VALIDITY_MINUTES;
use tracing::{info, warn};

pub const OTP_SUBJECT: &str = "Kode OTP Reset Password - CDC Universitas Andalas";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP is not configured")]
    NotConfigured,

    #[error("SMTP error: {0}")]
    Smtp(#[from] mail_send::Error),
}

/// Mail transport chosen at startup
#[derive(Debug, Clone)]
pub enum Mailer {
    Smtp(SmtpConfig),
    /// No SMTP settings; sends fail and nothing leaves the host
    Disabled,
}

impl Mailer {
    pub fn from_config(config: &SmtpConfig) -> Self {
        if config.is_configured() {
            Mailer::Smtp(config.clone())
        } else {
            warn!("SMTP not configured; password reset emails are disabled");
            Mailer::Disabled
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Mailer::Smtp(_))
    }

    /// Mail a reset code to `to`
    pub async fn send_otp(&self, to: &str, username: &str, otp: &str) -> Result<(), MailError> {
        let config = match self {
            Mailer::Smtp(config) => config,
            Mailer::Disabled => {
                warn!(to = %to, "Password reset email not sent, SMTP disabled");
                return Err(MailError::NotConfigured);
            }
        };
        let from_addr = config.sender_address().ok_or(MailError::NotConfigured)?;

        let text = format!(
            "Halo {username},\n\n\
             Kami menerima permintaan reset password untuk akun Anda.\n\n\
             Kode OTP Anda: {otp}\n\n\
             Kode ini berlaku selama {OTP_VALIDITY_MINUTES} menit. \
             Jika Anda tidak meminta reset password, abaikan email ini.\n\n\
             CDC Universitas Andalas"
        );
        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 480px">
  <h2>Reset Password</h2>
  <p>Halo <strong>{username}</strong>,</p>
  <p>Kami menerima permintaan reset password untuk akun Anda. Gunakan kode berikut:</p>
  <p style="font-size: 28px; letter-spacing: 6px; font-weight: bold">{otp}</p>
  <p>Kode ini berlaku selama {OTP_VALIDITY_MINUTES} menit.
     Jika Anda tidak meminta reset password, abaikan email ini.</p>
  <p>CDC Universitas Andalas</p>
</div>"#,
            username = crate::ui::escape(username),
        );

        let message = MessageBuilder::new()
            .from((config.from_name.as_str(), from_addr))
            .to((username, to))
            .subject(OTP_SUBJECT)
            .text_body(text)
            .html_body(html);

        let mut builder =
            SmtpClientBuilder::new(config.host.as_str(), config.port).implicit_tls(config.implicit_tls);
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.as_str(), pass.as_str()));
        }

        builder.connect().await?.send(message).await?;

        info!(to = %to, "Password reset email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_mailer_refuses() {
        let mailer = Mailer::from_config(&SmtpConfig::default());
        assert!(!mailer.is_enabled());
        let err = mailer.send_otp("a@example.com", "a", "123456").await.unwrap_err();
        assert!(matches!(err, MailError::NotConfigured));
    }
}
