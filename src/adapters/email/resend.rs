use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::ports::{EmailError, EmailMessage, EmailSender};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Delivers template emails through the Resend HTTP API.
///
/// Template data is rendered as a plain-text body; the template name picks
/// the subject when the caller did not set one.
#[derive(Clone)]
pub struct ResendEmailSender {
    client: Client,
    api_key: SecretString,
    from: String,
    api_url: String,
}

impl ResendEmailSender {
    pub fn new(api_key: SecretString, from: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            from: from.into(),
            api_url: RESEND_API_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

#[derive(Serialize)]
struct ResendReq<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<&'a str, &'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<ResendAttachment<'a>>,
}

#[derive(Serialize)]
struct ResendAttachment<'a> {
    path: &'a str,
    filename: &'a str,
}

/// Subject used when the message does not carry one.
fn default_subject(template: &str) -> String {
    let mut words = template.split('_').filter(|w| !w.is_empty());
    let mut subject = String::new();
    if let Some(first) = words.next() {
        let mut chars = first.chars();
        if let Some(c) = chars.next() {
            subject.extend(c.to_uppercase());
            subject.push_str(chars.as_str());
        }
    }
    for word in words {
        subject.push(' ');
        subject.push_str(word);
    }
    subject
}

/// Renders template data as `key: value` lines in key order.
pub(super) fn render_text(message: &EmailMessage) -> String {
    message
        .data
        .iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("{}: {}", key, s),
            other => format!("{}: {}", key, other),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl EmailSender for ResendEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        if message.recipient.trim().is_empty() {
            return Err(EmailError::InvalidMessage("recipient is empty".to_string()));
        }

        let subject = message
            .subject
            .clone()
            .unwrap_or_else(|| default_subject(&message.template));
        let text = render_text(&message);
        let body = ResendReq {
            from: message.from.as_deref().unwrap_or(&self.from),
            to: [message.recipient.as_str()],
            subject: &subject,
            text: &text,
            headers: message
                .headers
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
            attachments: message
                .attachments
                .iter()
                .map(|path| ResendAttachment {
                    path,
                    filename: path.rsplit('/').next().unwrap_or(path),
                })
                .collect(),
        };

        self.client
            .post(&self.api_url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| EmailError::Rejected(e.to_string()))?;

        tracing::debug!(template = %message.template, "Email accepted by Resend");
        Ok(())
    }
}
