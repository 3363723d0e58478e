//! Slack webhook notification payloads.
//!
//! Message shapes for release announcements. Delivery is not wired to a
//! transport yet; [`Notifier::send`] reports that plainly instead of
//! pretending to post.

use serde::Serialize;

use crate::error::{Error, Result};

/// A rich-layout block within a message.
#[derive(Debug, Clone, Serialize)]
pub struct MessageBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<BlockText>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockText {
    #[serde(rename = "type")]
    pub text_type: String,
    pub text: String,
}

impl MessageBlock {
    /// A `section` block with markdown body text.
    pub fn section(text: impl Into<String>) -> Self {
        Self {
            block_type: "section".to_string(),
            text: Some(BlockText {
                text_type: "mrkdwn".to_string(),
                text: text.into(),
            }),
        }
    }

    pub fn divider() -> Self {
        Self {
            block_type: "divider".to_string(),
            text: None,
        }
    }
}

/// A webhook message: fallback text, markdown flag, optional thread
/// reference, rich content blocks.
#[derive(Debug, Clone, Serialize)]
pub struct SlackMessage {
    pub text: String,
    pub mrkdwn: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<MessageBlock>,
}

impl SlackMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mrkdwn: true,
            thread_ts: None,
            blocks: Vec::new(),
        }
    }

    pub fn in_thread(mut self, thread_ts: impl Into<String>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }

    pub fn with_block(mut self, block: MessageBlock) -> Self {
        self.blocks.push(block);
        self
    }
}

/// Webhook-addressed notifier.
pub struct Notifier {
    webhook_url: String,
}

impl Notifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
        }
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    /// Serialized request body for `message`.
    pub fn payload(&self, message: &SlackMessage) -> Result<String> {
        serde_json::to_string(message).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize slack message".to_string()))
        })
    }

    /// Deliver `message` to the webhook. No transport is wired; the
    /// payload is validated and the gap reported.
    pub fn send(&self, message: &SlackMessage) -> Result<()> {
        let _ = self.payload(message)?;
        Err(Error::internal_unexpected(format!(
            "slack delivery to {} is not wired to a transport",
            self.webhook_url
        )))
    }
}
