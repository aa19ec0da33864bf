//! Outbound message channel.
//!
//! The publisher only needs four operations against the roster channel, so
//! they are expressed as the [`MessageSink`] trait. [`DiscordClient`] talks to
//! the Discord REST API; [`MemorySink`] keeps messages in process for dry runs
//! and tests.

mod client;
mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::roster::RosterEmbed;

pub use client::{DiscordClient, DEFAULT_API_URL};
pub use memory::MemorySink;

/// A message that exists in a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub id: String,
    pub channel_id: String,
}

/// Errors from the message channel.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Message not found: {0}")]
    NotFound(String),

    #[error("Missing permissions: {0}")]
    Forbidden(String),

    #[error("Unauthorized: bot token missing or invalid")]
    Unauthorized,

    #[error("Rate limited, retry after {retry_after:.1}s")]
    RateLimited { retry_after: f64 },

    #[error("Channel error: {0}")]
    Server(String),
}

#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn fetch_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<SentMessage, SinkError>;

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        embed: &RosterEmbed,
    ) -> Result<(), SinkError>;

    async fn send_message(
        &self,
        channel_id: &str,
        embed: &RosterEmbed,
    ) -> Result<SentMessage, SinkError>;

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), SinkError>;
}
