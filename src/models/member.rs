use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A roster entry.
///
/// `rank_id` must reference a rank of the same branch; `sub_branch_id`, when
/// set, must reference a sub-branch of the same branch. The store checks both
/// on insert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub rank_id: Uuid,
    pub sub_branch_id: Option<Uuid>,
    pub name: String,
    /// Alternate or legacy name, shown in parentheses.
    pub alt: Option<String>,
    /// Title or role text, shown after a dash.
    pub title: Option<String>,
    /// Free-text notes. Never rendered.
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A member joined with the names of its rank and sub-branch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberRow {
    #[serde(flatten)]
    pub member: Member,
    pub rank_name: String,
    pub rank_order: i64,
    pub sub_branch_name: Option<String>,
}

/// Input for adding a member to a branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMemberInput {
    pub rank_id: Uuid,
    pub sub_branch_id: Option<Uuid>,
    pub name: String,
    pub alt: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
}

/// Result of removing members by name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemovedMembers {
    pub removed: usize,
}
