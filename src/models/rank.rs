use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named tier within a branch. Names are unique per branch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rank {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub name: String,
    pub display_order: i64,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a rank in a branch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateRankInput {
    pub name: String,
    #[serde(default)]
    pub display_order: i64,
}

/// Input for updating an existing rank. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRankInput {
    pub name: Option<String>,
    pub display_order: Option<i64>,
}
