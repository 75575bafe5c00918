//! Email sender port.
//!
//! The engine names a template and supplies data; rendering and delivery
//! belong to the adapter.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from email delivery.
#[derive(Debug, Clone, Error)]
pub enum EmailError {
    #[error("Invalid email message: {0}")]
    InvalidMessage(String),

    #[error("Email provider rejected the message: {0}")]
    Rejected(String),

    #[error("Email transport failed: {0}")]
    Transport(String),
}

/// One outgoing email, configured with builder calls before `send`.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub template: String,
    pub recipient: String,
    pub data: BTreeMap<String, Value>,
    pub from: Option<String>,
    pub subject: Option<String>,
    pub headers: Vec<(String, String)>,
    pub attachments: Vec<String>,
}

impl EmailMessage {
    pub fn new(template: impl Into<String>, recipient: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            recipient: recipient.into(),
            data: BTreeMap::new(),
            from: None,
            subject: None,
            headers: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Adds one template variable.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Adds a template variable only when a value is present.
    pub fn with_optional(self, key: impl Into<String>, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.with_data(key, value),
            None => self,
        }
    }

    /// Overrides the sender, e.g. `Memberships <billing@example.com>`.
    pub fn set_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn set_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Replaces the extra headers.
    pub fn set_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    /// Attaches a file by path or URL.
    pub fn add_attachment(mut self, path: impl Into<String>) -> Self {
        self.attachments.push(path.into());
        self
    }

    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Delivers the message. `Ok` means the provider accepted it.
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError>;
}
