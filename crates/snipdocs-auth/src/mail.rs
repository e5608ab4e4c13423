//! Outgoing account email

use std::sync::Mutex;

use tracing::info;
use url::Url;

/// A transactional email carrying a single action link
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub link: String,
}

pub trait EmailSender: Send + Sync {
    fn send(&self, message: EmailMessage) -> Result<(), String>;
}

/// Writes messages to the log instead of delivering them
#[derive(Debug, Default)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: EmailMessage) -> Result<(), String> {
        info!(
            to = %message.to,
            subject = %message.subject,
            link = %message.link,
            "Email (not delivered)"
        );
        Ok(())
    }
}

/// Keeps messages in memory for inspection
#[derive(Debug, Default)]
pub struct MemoryEmailSender {
    sent: Mutex<Vec<EmailMessage>>,
}

impl MemoryEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Most recent message addressed to `to`
    pub fn last_to(&self, to: &str) -> Option<EmailMessage> {
        self.sent().into_iter().rev().find(|m| m.to == to)
    }
}

impl EmailSender for MemoryEmailSender {
    fn send(&self, message: EmailMessage) -> Result<(), String> {
        self.sent
            .lock()
            .map_err(|_| "mailbox lock poisoned".to_string())?
            .push(message);
        Ok(())
    }
}

/// Decoded value of query parameter `name` in `link`
pub fn link_param(link: &str, name: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}
