//! Turns a branch's member rows into the nested display model.

use std::collections::HashMap;

use anyhow::Result;
use serde::Serialize;
use uuid::Uuid;

use crate::db::Database;
use crate::models::{Branch, LayoutKind, MemberRow};

/// The roster of one branch, grouped and ordered for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterView {
    pub branch: Branch,
    pub sections: RosterSections,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum RosterSections {
    /// Regular members by rank, then the special section by rank.
    DualSection {
        regular: Vec<RankGroup>,
        special: SpecialSection,
    },
    /// Sub-branch groups. The group without a sub-branch is always first.
    Grouped { groups: Vec<SubBranchGroup> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecialSection {
    pub name: String,
    pub ranks: Vec<RankGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubBranchGroup {
    /// `None` for members without a sub-branch.
    pub sub_branch_id: Option<Uuid>,
    pub name: Option<String>,
    pub ranks: Vec<RankGroup>,
}

/// Formatted member lines under one rank header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankGroup {
    pub rank_id: Uuid,
    pub name: String,
    pub lines: Vec<String>,
}

impl RosterView {
    pub fn member_count(&self) -> usize {
        let count = |ranks: &[RankGroup]| ranks.iter().map(|r| r.lines.len()).sum::<usize>();
        match &self.sections {
            RosterSections::DualSection { regular, special } => {
                count(regular) + count(&special.ranks)
            }
            RosterSections::Grouped { groups } => groups.iter().map(|g| count(&g.ranks)).sum(),
        }
    }
}

/// Loads a branch and its members and builds the display model.
///
/// Returns `Ok(None)` when the branch does not exist.
pub fn build_roster(db: &Database, branch_id: Uuid) -> Result<Option<RosterView>> {
    let Some(branch) = db.get_branch(branch_id)? else {
        return Ok(None);
    };
    let rows = db.get_members_by_branch(branch_id)?;
    Ok(Some(aggregate(branch, &rows)))
}

/// Groups already-ordered member rows according to the branch layout.
///
/// Grouping is keyed on rank and sub-branch ids; names only label the headers.
/// Ranks and sub-branches appear in the order they are first seen in `rows`.
pub fn aggregate(branch: Branch, rows: &[MemberRow]) -> RosterView {
    let sections = match branch.layout {
        LayoutKind::DualSection => {
            let special_name = branch.special_section_name();
            let mut regular = RankBuckets::default();
            let mut special = RankBuckets::default();

            for row in rows {
                let target = if row.sub_branch_name.as_deref() == Some(special_name) {
                    &mut special
                } else {
                    &mut regular
                };
                target.push(row);
            }

            RosterSections::DualSection {
                regular: regular.into_groups(),
                special: SpecialSection {
                    name: special_name.to_string(),
                    ranks: special.into_groups(),
                },
            }
        }
        LayoutKind::Grouped => {
            let mut main: Option<RankBuckets> = None;
            let mut named: Vec<(Uuid, String, RankBuckets)> = Vec::new();
            let mut named_index: HashMap<Uuid, usize> = HashMap::new();

            for row in rows {
                match row.member.sub_branch_id {
                    None => main.get_or_insert_with(RankBuckets::default).push(row),
                    Some(sub_id) => {
                        let idx = *named_index.entry(sub_id).or_insert_with(|| {
                            let name = row.sub_branch_name.clone().unwrap_or_default();
                            named.push((sub_id, name, RankBuckets::default()));
                            named.len() - 1
                        });
                        named[idx].2.push(row);
                    }
                }
            }

            let mut groups = Vec::with_capacity(named.len() + 1);
            if let Some(main) = main {
                groups.push(SubBranchGroup {
                    sub_branch_id: None,
                    name: None,
                    ranks: main.into_groups(),
                });
            }
            groups.extend(named.into_iter().map(|(id, name, buckets)| SubBranchGroup {
                sub_branch_id: Some(id),
                name: Some(name),
                ranks: buckets.into_groups(),
            }));

            RosterSections::Grouped { groups }
        }
    };

    RosterView { branch, sections }
}

/// Display line for one member: `• name (alt) - title`.
pub fn format_member_line(name: &str, alt: Option<&str>, title: Option<&str>) -> String {
    let mut line = format!("• {}", name);
    if let Some(alt) = alt.filter(|a| !a.is_empty()) {
        line.push_str(&format!(" ({})", alt));
    }
    if let Some(title) = title.filter(|t| !t.is_empty()) {
        line.push_str(&format!(" - {}", title));
    }
    line
}

/// Insertion-ordered rank -> lines mapping.
#[derive(Default)]
struct RankBuckets {
    groups: Vec<RankGroup>,
    index: HashMap<Uuid, usize>,
}

impl RankBuckets {
    fn push(&mut self, row: &MemberRow) {
        let rank_id = row.member.rank_id;
        let idx = match self.index.get(&rank_id) {
            Some(&idx) => idx,
            None => {
                self.groups.push(RankGroup {
                    rank_id,
                    name: row.rank_name.clone(),
                    lines: Vec::new(),
                });
                self.index.insert(rank_id, self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        self.groups[idx].lines.push(format_member_line(
            &row.member.name,
            row.member.alt.as_deref(),
            row.member.title.as_deref(),
        ));
    }

    fn into_groups(self) -> Vec<RankGroup> {
        self.groups
    }
}
