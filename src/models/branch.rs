use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Glyph used when a branch is created without one.
pub const DEFAULT_BRANCH_EMOJI: &str = "📋";

/// Special section name used by dual-section branches that don't set one.
pub const DEFAULT_SPECIAL_SECTION: &str = "Talon Squadron";

/// A top-level organizational branch of the roster.
///
/// Branches are listed by `display_order`, then `name`. Once the branch has
/// been rendered, `message_id` holds the id of the chat message that shows it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Branch {
    pub id: Uuid,
    pub name: String,
    pub emoji: String,
    pub display_order: i64,
    pub layout: LayoutKind,
    /// Sub-branch name split out into its own section for dual-section layouts.
    pub special_section: Option<String>,
    pub message_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Branch {
    /// Name of the special section for a dual-section layout.
    pub fn special_section_name(&self) -> &str {
        self.special_section
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_SPECIAL_SECTION)
    }
}

/// How a branch's members are arranged in its roster message.
///
/// - `Grouped`: members grouped by sub-branch, then rank. Members without a
///   sub-branch come first.
/// - `DualSection`: regular members by rank, followed by a single special
///   section (one designated sub-branch) by rank.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    #[default]
    Grouped,
    DualSection,
}

impl LayoutKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grouped => "grouped",
            Self::DualSection => "dual_section",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "grouped" => Some(Self::Grouped),
            "dual_section" => Some(Self::DualSection),
            _ => None,
        }
    }
}

/// Input for creating a new branch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateBranchInput {
    pub name: String,
    /// Defaults to [`DEFAULT_BRANCH_EMOJI`].
    pub emoji: Option<String>,
    #[serde(default)]
    pub display_order: i64,
    #[serde(default)]
    pub layout: LayoutKind,
    pub special_section: Option<String>,
}

/// Input for updating an existing branch. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBranchInput {
    pub name: Option<String>,
    pub emoji: Option<String>,
    pub display_order: Option<i64>,
    pub layout: Option<LayoutKind>,
    pub special_section: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(layout: LayoutKind, special_section: Option<&str>) -> Branch {
        Branch {
            id: Uuid::new_v4(),
            name: "IMPERIAL NAVY".to_string(),
            emoji: "🔵".to_string(),
            display_order: 3,
            layout,
            special_section: special_section.map(str::to_string),
            message_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_special_section_defaults() {
        assert_eq!(
            branch(LayoutKind::DualSection, None).special_section_name(),
            "Talon Squadron"
        );
        assert_eq!(
            branch(LayoutKind::DualSection, Some("  ")).special_section_name(),
            "Talon Squadron"
        );
        assert_eq!(
            branch(LayoutKind::DualSection, Some("Wraith Wing")).special_section_name(),
            "Wraith Wing"
        );
    }

    #[test]
    fn test_layout_kind_strings() {
        for kind in [LayoutKind::Grouped, LayoutKind::DualSection] {
            assert_eq!(LayoutKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(LayoutKind::from_str("navy"), None);
    }
}
