use async_trait::async_trait;

use crate::ports::{EmailError, EmailMessage, EmailSender};

/// Writes emails to the log instead of sending them. Used when no email
/// provider is configured.
#[derive(Debug, Default, Clone)]
pub struct LoggingEmailSender;

impl LoggingEmailSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmailSender for LoggingEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        tracing::info!(
            template = %message.template,
            recipient = %message.recipient,
            subject = message.subject.as_deref().unwrap_or_default(),
            body = %super::resend::render_text(&message),
            "Email not sent; no provider configured"
        );
        Ok(())
    }
}
