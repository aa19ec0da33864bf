use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{MessageSink, SentMessage, SinkError};
use crate::roster::RosterEmbed;

/// In-process message channel.
///
/// Used by `--dry-run` and by tests. Message ids are sequential numbers
/// rendered as strings. Sends and edits can be made to fail to exercise the
/// publisher's fallback paths.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<HashMap<String, StoredMessage>>,
    next_id: AtomicU64,
    sends: AtomicU64,
    edits: AtomicU64,
    fail_sends: AtomicBool,
    fail_edits: AtomicBool,
}

#[derive(Debug, Clone)]
struct StoredMessage {
    channel_id: String,
    embed: RosterEmbed,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent edit fail.
    pub fn set_fail_edits(&self, fail: bool) {
        self.fail_edits.store(fail, Ordering::SeqCst);
    }

    /// Remove a message as if someone deleted it in the client.
    pub fn forget(&self, message_id: &str) -> bool {
        self.messages
            .lock()
            .expect("sink lock poisoned")
            .remove(message_id)
            .is_some()
    }

    /// Current content of a message.
    pub fn embed(&self, message_id: &str) -> Option<RosterEmbed> {
        self.messages
            .lock()
            .expect("sink lock poisoned")
            .get(message_id)
            .map(|m| m.embed.clone())
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().expect("sink lock poisoned").len()
    }

    pub fn send_count(&self) -> u64 {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn edit_count(&self) -> u64 {
        self.edits.load(Ordering::SeqCst)
    }

    fn lookup(&self, channel_id: &str, message_id: &str) -> Result<StoredMessage, SinkError> {
        self.messages
            .lock()
            .expect("sink lock poisoned")
            .get(message_id)
            .filter(|m| m.channel_id == channel_id)
            .cloned()
            .ok_or_else(|| SinkError::NotFound(message_id.to_string()))
    }
}

#[async_trait]
impl MessageSink for MemorySink {
    async fn fetch_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<SentMessage, SinkError> {
        let stored = self.lookup(channel_id, message_id)?;
        Ok(SentMessage {
            id: message_id.to_string(),
            channel_id: stored.channel_id,
        })
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        embed: &RosterEmbed,
    ) -> Result<(), SinkError> {
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(SinkError::Forbidden("edits disabled".to_string()));
        }
        self.lookup(channel_id, message_id)?;

        let mut messages = self.messages.lock().expect("sink lock poisoned");
        if let Some(stored) = messages.get_mut(message_id) {
            stored.embed = embed.clone();
        }
        self.edits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_message(
        &self,
        channel_id: &str,
        embed: &RosterEmbed,
    ) -> Result<SentMessage, SinkError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(SinkError::Server("sends disabled".to_string()));
        }

        let id = (self.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string();
        self.messages.lock().expect("sink lock poisoned").insert(
            id.clone(),
            StoredMessage {
                channel_id: channel_id.to_string(),
                embed: embed.clone(),
            },
        );
        self.sends.fetch_add(1, Ordering::SeqCst);

        Ok(SentMessage {
            id,
            channel_id: channel_id.to_string(),
        })
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), SinkError> {
        self.lookup(channel_id, message_id)?;
        self.forget(message_id);
        Ok(())
    }
}
