use async_trait::async_trait;
use chrono::Utc;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("no alert recipients configured")]
    NoRecipients,
    #[error("invalid address {address}: {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },
    #[error("could not build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("mail relay rejected message: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

pub fn problem_subject(check_name: &str, host: &str) -> String {
    format!("[PROBLEM] {check_name} failed on {host}")
}

pub fn recovery_subject(check_name: &str, host: &str) -> String {
    format!("[RECOVERY] {check_name} succeeded on {host}")
}

/// Delivers problem and recovery notifications. `false` means the
/// notification did not go out; the cause has already been logged.
#[async_trait]
pub trait Alerter: Send + Sync {
    async fn send_problem(&self, recipients: &[String], host: &str, check_name: &str) -> bool;
    async fn send_recovery(&self, recipients: &[String], host: &str, check_name: &str) -> bool;
}

/// Sends plain-text mail through an unauthenticated relay, normally the
/// local MTA.
pub struct SmtpAlerter {
    from: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpAlerter {
    pub fn new(from: impl Into<String>, relay_host: &str, relay_port: u16) -> Self {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(relay_host)
            .port(relay_port)
            .build();
        Self {
            from: from.into(),
            transport,
        }
    }

    fn build_message(&self, subject: &str, recipients: &[String]) -> Result<Message, AlertError> {
        if recipients.is_empty() {
            return Err(AlertError::NoRecipients);
        }

        let mut builder = Message::builder()
            .from(parse_mailbox(&self.from)?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for recipient in recipients {
            builder = builder.to(parse_mailbox(recipient)?);
        }

        let body = format!(
            "Sent from {} at {}\n",
            env!("CARGO_PKG_NAME"),
            Utc::now().to_rfc2822()
        );
        Ok(builder.body(body)?)
    }

    async fn deliver(&self, subject: &str, recipients: &[String]) -> Result<(), AlertError> {
        let message = self.build_message(subject, recipients)?;
        let response = self.transport.send(message).await?;
        debug!(code = %response.code(), "mail relay accepted message");
        Ok(())
    }

    async fn send(&self, subject: String, recipients: &[String]) -> bool {
        match self.deliver(&subject, recipients).await {
            Ok(()) => {
                info!(%subject, recipients = %recipients.join(", "), "alert sent");
                true
            }
            Err(e) => {
                error!(%subject, error = %e, "failed to send alert");
                false
            }
        }
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, AlertError> {
    address.parse().map_err(|source| AlertError::Address {
        address: address.to_string(),
        source,
    })
}

#[async_trait]
impl Alerter for SmtpAlerter {
    async fn send_problem(&self, recipients: &[String], host: &str, check_name: &str) -> bool {
        self.send(problem_subject(check_name, host), recipients).await
    }

    async fn send_recovery(&self, recipients: &[String], host: &str, check_name: &str) -> bool {
        self.send(recovery_subject(check_name, host), recipients).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alerter() -> SmtpAlerter {
        // Nothing listens on port 1, so any delivery attempt is refused.
        SmtpAlerter::new("watch@example.com", "127.0.0.1", 1)
    }

    #[test]
    fn subjects_follow_templates() {
        assert_eq!(problem_subject("check_load", "db1"), "[PROBLEM] check_load failed on db1");
        assert_eq!(
            recovery_subject("check_load", "db1"),
            "[RECOVERY] check_load succeeded on db1"
        );
    }

    #[test]
    fn message_carries_subject_and_all_recipients() {
        let recipients = vec!["ops@example.com".to_string(), "dev@example.com".to_string()];
        let message = alerter()
            .build_message(&problem_subject("check_load", "db1"), &recipients)
            .unwrap();

        assert_eq!(message.envelope().to().len(), 2);
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: [PROBLEM] check_load failed on db1"));
        assert!(raw.contains("From: watch@example.com"));
    }

    #[test]
    fn bad_recipient_is_rejected() {
        let err = alerter()
            .build_message("subject", &["not an address".to_string()])
            .unwrap_err();
        assert!(matches!(err, AlertError::Address { ref address, .. } if address == "not an address"));
    }

    #[tokio::test]
    async fn empty_recipient_list_reports_failure() {
        assert!(!alerter().send_problem(&[], "db1", "check_load").await);
    }

    #[tokio::test]
    async fn unreachable_relay_reports_failure() {
        let recipients = vec!["ops@example.com".to_string()];
        assert!(!alerter().send_recovery(&recipients, "db1", "check_load").await);
    }
}
