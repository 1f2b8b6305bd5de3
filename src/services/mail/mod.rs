//! 邮件发送
//!
//! `mail.smtp_host` 为空时使用只写日志的 [`ConsoleMailer`]，否则通过 SMTP 发送。
//! 发送本身总是经由 [`queue::EmailQueue`] 异步进行。

pub mod queue;
pub mod templates;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::MailConfig;
use crate::errors::{CourseHubError, Result};

pub use queue::{EmailQueue, RetryPolicy};

/// 一封待发送的邮件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// SMTP 发送
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &MailConfig) -> Result<Self> {
        let host = config.smtp_host.trim();
        if host.is_empty() {
            return Err(CourseHubError::mail("未配置 SMTP 主机"));
        }

        let mut builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        }
        .port(config.smtp_port);

        if !config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from: config.from_address.parse()?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email.to.parse()?)
            .subject(email.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                email.text.clone(),
                email.html.clone(),
            ))?;

        self.transport.send(message).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

/// 只把邮件写进日志，用于开发环境
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        info!(
            to = %email.to,
            subject = %email.subject,
            "console mailer:\n{}",
            email.text
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

/// 按配置选择发送后端，SMTP 初始化失败时退回控制台
pub fn create_mailer(config: &MailConfig) -> Arc<dyn Mailer> {
    if config.smtp_host.trim().is_empty() {
        return Arc::new(ConsoleMailer);
    }
    match SmtpMailer::from_config(config) {
        Ok(mailer) => Arc::new(mailer),
        Err(e) => {
            warn!("Failed to create SMTP mailer: {}, falling back to console", e);
            Arc::new(ConsoleMailer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_mailer_without_smtp_host() {
        let config = MailConfig::default();
        assert_eq!(create_mailer(&config).name(), "console");
    }

    #[test]
    fn test_smtp_mailer_rejects_bad_from_address() {
        let config = MailConfig {
            smtp_host: "smtp.example.com".into(),
            starttls: false,
            from_address: "not an address".into(),
            ..Default::default()
        };
        let err = SmtpMailer::from_config(&config).err().unwrap();
        assert_eq!(err.code(), "E011");
        assert_eq!(create_mailer(&config).name(), "console");
    }

    #[tokio::test]
    async fn test_console_mailer_always_succeeds() {
        let email = OutgoingEmail {
            to: "a@example.com".into(),
            subject: "s".into(),
            text: "t".into(),
            html: "<p>t</p>".into(),
        };
        assert!(ConsoleMailer.send(&email).await.is_ok());
    }
}
