//! Paginates a roster into embed fields.
//!
//! Each embed field value is capped at [`MAX_FIELD_LENGTH`] characters. Rank
//! sections and sub-branch headers are accumulated into the current field and
//! start a new one when they would overflow it, so a section is only ever cut
//! by the final truncation when it is too large on its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::aggregate::{RankGroup, RosterSections, RosterView};

/// Discord's limit on an embed field value.
pub const MAX_FIELD_LENGTH: usize = 1024;

/// Embed colour for roster messages.
pub const ROSTER_COLOR: u32 = 0x990000;

const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━━━";
const CONTINUATION_LABEL: &str = " ";
const EMPTY_DESCRIPTION: &str = "No members in this branch";
const EMPTY_VALUE: &str = "No members assigned";

/// The rendered roster message for one branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEmbed {
    pub title: String,
    pub color: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
}

/// Renders a roster view into an embed stamped with `timestamp`.
pub fn render_roster(view: &RosterView, timestamp: DateTime<Utc>) -> RosterEmbed {
    let mut pager = FieldPager::new();

    match &view.sections {
        RosterSections::DualSection { regular, special } => {
            pager.push_ranks(regular);
            if !special.ranks.is_empty() {
                pager.push_unit(&sub_header(&special.name));
                pager.push_ranks(&special.ranks);
            }
        }
        RosterSections::Grouped { groups } => {
            // The aggregator keeps the no-sub-branch group first; emit it
            // before any named group regardless.
            if let Some(main) = groups.iter().find(|g| g.sub_branch_id.is_none()) {
                pager.push_ranks(&main.ranks);
            }
            for group in groups.iter().filter(|g| g.sub_branch_id.is_some()) {
                pager.push_unit(&sub_header(group.name.as_deref().unwrap_or_default()));
                pager.push_ranks(&group.ranks);
            }
        }
    }

    let mut fields = pager.finish();
    let description = if fields.is_empty() {
        fields.push(EmbedField {
            name: DIVIDER.to_string(),
            value: EMPTY_VALUE.to_string(),
        });
        Some(EMPTY_DESCRIPTION.to_string())
    } else {
        None
    };

    RosterEmbed {
        title: format!("{} {}", view.branch.emoji, view.branch.name),
        color: ROSTER_COLOR,
        timestamp,
        description,
        fields,
    }
}

/// `\n**RANK**\n` followed by the member lines, one per line.
pub fn rank_section(rank: &RankGroup) -> String {
    format!("\n**{}**\n{}\n", rank.name, rank.lines.join("\n"))
}

pub fn sub_header(name: &str) -> String {
    format!("\n__**{}**__\n", name)
}

/// Accumulates text units into size-bounded embed fields.
///
/// The first field is labelled with the member total counted so far at the
/// moment it is flushed, which is not necessarily the branch total.
#[derive(Debug, Default)]
pub struct FieldPager {
    fields: Vec<EmbedField>,
    current: String,
    current_len: usize,
    total_members: usize,
}

impl FieldPager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Members counted so far.
    pub fn total_members(&self) -> usize {
        self.total_members
    }

    pub fn fields(&self) -> &[EmbedField] {
        &self.fields
    }

    pub fn push_ranks(&mut self, ranks: &[RankGroup]) {
        for rank in ranks {
            self.push_rank(rank);
        }
    }

    /// Counts the rank's members, then appends its section.
    pub fn push_rank(&mut self, rank: &RankGroup) {
        self.total_members += rank.lines.len();
        self.push_unit(&rank_section(rank));
    }

    /// Appends a unit to the current field, starting a new field first if it
    /// would not fit.
    pub fn push_unit(&mut self, unit: &str) {
        let unit_len = unit.chars().count();
        if self.current_len + unit_len > MAX_FIELD_LENGTH {
            self.flush();
            self.current = unit.to_string();
            self.current_len = unit_len;
        } else {
            self.current.push_str(unit);
            self.current_len += unit_len;
        }
    }

    /// Flushes whatever is left and returns the fields.
    pub fn finish(mut self) -> Vec<EmbedField> {
        self.flush();
        self.fields
    }

    fn flush(&mut self) {
        let content = std::mem::take(&mut self.current);
        self.current_len = 0;
        if content.trim().is_empty() {
            return;
        }

        let name = if self.fields.is_empty() {
            format!("{}\nTotal Members: {}", DIVIDER, self.total_members)
        } else {
            CONTINUATION_LABEL.to_string()
        };
        self.fields.push(EmbedField {
            name,
            value: truncate_chars(&content, MAX_FIELD_LENGTH),
        });
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
