use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An optional secondary grouping inside a branch (a squadron, a division).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubBranch {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub name: String,
    pub display_order: i64,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a sub-branch in a branch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSubBranchInput {
    pub name: String,
    #[serde(default)]
    pub display_order: i64,
}
