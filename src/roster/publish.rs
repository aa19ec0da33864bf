//! Keeps one roster message per branch in the roster channel.
//!
//! A branch with a stored message id gets that message edited in place. When
//! the message can't be fetched or edited (deleted, moved, permissions
//! changed), a new one is sent and its id replaces the stale one. The id is
//! written back only after the send succeeds.
//!
//! Syncs are serialized through one lock held from the read of the stored id
//! to the write of the new one, so two triggers for the same branch can't
//! both send. A read-only publisher never writes ids back, which keeps dry
//! runs from replacing real message ids with in-memory ones.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::aggregate::build_roster;
use super::render::{render_roster, RosterEmbed};
use crate::db::Database;
use crate::discord::{MessageSink, SinkError};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),

    #[error("channel error: {0}")]
    Channel(#[from] SinkError),
}

/// What happened to a branch's roster message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The branch no longer exists.
    Missing,
    Edited {
        message_id: String,
        fields: usize,
    },
    Created {
        message_id: String,
        fields: usize,
        /// Stored id that could not be edited.
        replaced: Option<String>,
    },
}

impl SyncOutcome {
    pub fn message_id(&self) -> Option<&str> {
        match self {
            Self::Missing => None,
            Self::Edited { message_id, .. } | Self::Created { message_id, .. } => Some(message_id),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub synced: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct RosterPublisher {
    db: Database,
    sink: Arc<dyn MessageSink>,
    channel_id: String,
    persist_ids: bool,
    sync_lock: Arc<Mutex<()>>,
}

impl RosterPublisher {
    pub fn new(db: Database, sink: Arc<dyn MessageSink>, channel_id: impl Into<String>) -> Self {
        Self {
            db,
            sink,
            channel_id: channel_id.into(),
            persist_ids: true,
            sync_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Publisher that renders and sends but never stores message ids.
    pub fn read_only(mut self) -> Self {
        self.persist_ids = false;
        self
    }

    /// Renders a branch without touching the channel.
    pub fn preview(&self, branch_id: Uuid) -> anyhow::Result<Option<RosterEmbed>> {
        Ok(build_roster(&self.db, branch_id)?.map(|view| render_roster(&view, Utc::now())))
    }

    /// Renders a branch and creates or updates its message.
    pub async fn sync_branch(&self, branch_id: Uuid) -> Result<SyncOutcome, PublishError> {
        let _guard = self.sync_lock.lock().await;
        let Some(view) = build_roster(&self.db, branch_id)? else {
            return Ok(SyncOutcome::Missing);
        };
        let embed = render_roster(&view, Utc::now());
        let fields = embed.fields.len();
        let branch = &view.branch;

        if let Some(message_id) = branch.message_id.as_deref() {
            match self.edit_existing(message_id, &embed).await {
                Ok(()) => {
                    tracing::info!("Updated {} message ({} fields)", branch.name, fields);
                    return Ok(SyncOutcome::Edited {
                        message_id: message_id.to_string(),
                        fields,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        "Could not edit {} message {}, sending a new one: {}",
                        branch.name,
                        message_id,
                        e
                    );
                }
            }
        }

        let sent = self.sink.send_message(&self.channel_id, &embed).await?;
        if self.persist_ids {
            self.db.set_branch_message_id(branch_id, &sent.id)?;
        } else {
            tracing::debug!("Read-only: not storing message {} for {}", sent.id, branch.name);
        }
        tracing::info!(
            "Created new message for {} ({} fields)",
            branch.name,
            fields
        );

        Ok(SyncOutcome::Created {
            message_id: sent.id,
            fields,
            replaced: branch.message_id.clone(),
        })
    }

    async fn edit_existing(&self, message_id: &str, embed: &RosterEmbed) -> Result<(), SinkError> {
        let message = self.sink.fetch_message(&self.channel_id, message_id).await?;
        self.sink
            .edit_message(&message.channel_id, &message.id, embed)
            .await
    }

    /// Like [`sync_branch`](Self::sync_branch), but logs failures instead of
    /// returning them.
    pub async fn refresh_branch(&self, branch_id: Uuid) -> Option<SyncOutcome> {
        match self.sync_branch(branch_id).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!("Error updating branch message for {}: {}", branch_id, e);
                None
            }
        }
    }

    /// Refreshes every branch, one at a time, in display order.
    pub async fn refresh_all(&self) -> RefreshSummary {
        let branches = match self.db.get_all_branches() {
            Ok(branches) => branches,
            Err(e) => {
                tracing::error!("Could not load branches for refresh: {:#}", e);
                return RefreshSummary::default();
            }
        };

        let mut summary = RefreshSummary::default();
        for branch in branches {
            match self.refresh_branch(branch.id).await {
                Some(_) => summary.synced += 1,
                None => summary.failed += 1,
            }
        }

        tracing::info!(
            synced = summary.synced,
            failed = summary.failed,
            "Roster refresh finished"
        );
        summary
    }

    /// Deletes the message of a branch that no longer exists. Failures are
    /// logged and ignored; the message may already be gone.
    pub async fn retire_message(&self, message_id: &str) {
        if let Err(e) = self.sink.delete_message(&self.channel_id, message_id).await {
            tracing::debug!("Could not delete roster message {}: {}", message_id, e);
        }
    }
}
