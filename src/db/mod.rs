mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{ffi, Connection, ErrorCode, Row};
use uuid::Uuid;

use crate::models::*;

const BRANCH_COLUMNS: &str =
    "id, name, emoji, display_order, layout, special_section, message_id, created_at";

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Default location: `<data dir>/roster-keeper/roster.db`.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "roster-keeper")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("roster.db"))
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Branch operations
    // ============================================================

    pub fn get_all_branches(&self) -> Result<Vec<Branch>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {BRANCH_COLUMNS} FROM branches ORDER BY display_order, name"
        ))?;

        let branches = stmt
            .query_map([], branch_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(branches)
    }

    pub fn get_branch(&self, id: Uuid) -> Result<Option<Branch>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!("SELECT {BRANCH_COLUMNS} FROM branches WHERE id = ?"))?;

        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(branch_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn get_branch_by_name(&self, name: &str) -> Result<Option<Branch>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt =
            conn.prepare(&format!("SELECT {BRANCH_COLUMNS} FROM branches WHERE name = ?"))?;

        let mut rows = stmt.query([name])?;
        match rows.next()? {
            Some(row) => Ok(Some(branch_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn create_branch(&self, input: CreateBranchInput) -> Result<Branch> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();
        let emoji = input
            .emoji
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BRANCH_EMOJI.to_string());
        let special_section = input.special_section.filter(|s| !s.trim().is_empty());

        conn.execute(
            "INSERT INTO branches (id, name, emoji, display_order, layout, special_section, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.name,
                &emoji,
                input.display_order,
                input.layout.as_str(),
                &special_section,
                now.to_rfc3339(),
            ),
        )
        .map_err(|e| unique_violation(e, "Branch name"))?;

        Ok(Branch {
            id,
            name: input.name,
            emoji,
            display_order: input.display_order,
            layout: input.layout,
            special_section,
            message_id: None,
            created_at: now,
        })
    }

    pub fn update_branch(&self, id: Uuid, input: UpdateBranchInput) -> Result<Option<Branch>> {
        let Some(existing) = self.get_branch(id)? else {
            return Ok(None);
        };

        let conn = self.conn.lock().expect("database lock poisoned");
        let name = input.name.unwrap_or(existing.name);
        let emoji = input
            .emoji
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(existing.emoji);
        let display_order = input.display_order.unwrap_or(existing.display_order);
        let layout = input.layout.unwrap_or(existing.layout);
        // An empty string clears the special section
        let special_section = match input.special_section {
            Some(s) if s.trim().is_empty() => None,
            Some(s) => Some(s),
            None => existing.special_section,
        };

        conn.execute(
            "UPDATE branches SET name = ?, emoji = ?, display_order = ?, layout = ?, special_section = ?
             WHERE id = ?",
            (
                &name,
                &emoji,
                display_order,
                layout.as_str(),
                &special_section,
                id.to_string(),
            ),
        )
        .map_err(|e| unique_violation(e, "Branch name"))?;

        Ok(Some(Branch {
            id,
            name,
            emoji,
            display_order,
            layout,
            special_section,
            message_id: existing.message_id,
            created_at: existing.created_at,
        }))
    }

    /// Deletes a branch together with its ranks, sub-branches and members.
    pub fn delete_branch(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM branches WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    /// Records the chat message that displays this branch.
    pub fn set_branch_message_id(&self, branch_id: Uuid, message_id: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE branches SET message_id = ? WHERE id = ?",
            (message_id, branch_id.to_string()),
        )?;
        Ok(rows > 0)
    }

    // ============================================================
    // Rank operations
    // ============================================================

    pub fn get_ranks_by_branch(&self, branch_id: Uuid) -> Result<Vec<Rank>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, branch_id, name, display_order, created_at
             FROM ranks WHERE branch_id = ? ORDER BY display_order, name",
        )?;

        let ranks = stmt
            .query_map([branch_id.to_string()], rank_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ranks)
    }

    pub fn get_rank(&self, id: Uuid) -> Result<Option<Rank>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, branch_id, name, display_order, created_at FROM ranks WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(rank_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn create_rank(&self, branch_id: Uuid, input: CreateRankInput) -> Result<Rank> {
        self.get_branch(branch_id)?
            .ok_or_else(|| anyhow::anyhow!("Branch not found"))?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO ranks (id, branch_id, name, display_order, created_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                id.to_string(),
                branch_id.to_string(),
                &input.name,
                input.display_order,
                now.to_rfc3339(),
            ),
        )
        .map_err(|e| unique_violation(e, "Rank name"))?;

        Ok(Rank {
            id,
            branch_id,
            name: input.name,
            display_order: input.display_order,
            created_at: now,
        })
    }

    pub fn update_rank(&self, id: Uuid, input: UpdateRankInput) -> Result<Option<Rank>> {
        let Some(existing) = self.get_rank(id)? else {
            return Ok(None);
        };

        let conn = self.conn.lock().expect("database lock poisoned");
        let name = input.name.unwrap_or(existing.name);
        let display_order = input.display_order.unwrap_or(existing.display_order);

        conn.execute(
            "UPDATE ranks SET name = ?, display_order = ? WHERE id = ?",
            (&name, display_order, id.to_string()),
        )
        .map_err(|e| unique_violation(e, "Rank name"))?;

        Ok(Some(Rank {
            id,
            branch_id: existing.branch_id,
            name,
            display_order,
            created_at: existing.created_at,
        }))
    }

    /// Deletes a rank and every member holding it.
    pub fn delete_rank(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM ranks WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Sub-branch operations
    // ============================================================

    pub fn get_sub_branches_by_branch(&self, branch_id: Uuid) -> Result<Vec<SubBranch>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, branch_id, name, display_order, created_at
             FROM sub_branches WHERE branch_id = ? ORDER BY display_order, name",
        )?;

        let subs = stmt
            .query_map([branch_id.to_string()], sub_branch_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(subs)
    }

    pub fn get_sub_branch(&self, id: Uuid) -> Result<Option<SubBranch>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, branch_id, name, display_order, created_at FROM sub_branches WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(sub_branch_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn create_sub_branch(
        &self,
        branch_id: Uuid,
        input: CreateSubBranchInput,
    ) -> Result<SubBranch> {
        self.get_branch(branch_id)?
            .ok_or_else(|| anyhow::anyhow!("Branch not found"))?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO sub_branches (id, branch_id, name, display_order, created_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                id.to_string(),
                branch_id.to_string(),
                &input.name,
                input.display_order,
                now.to_rfc3339(),
            ),
        )
        .map_err(|e| unique_violation(e, "Sub-branch name"))?;

        Ok(SubBranch {
            id,
            branch_id,
            name: input.name,
            display_order: input.display_order,
            created_at: now,
        })
    }

    /// Deletes a sub-branch. Its members stay in the branch without a sub-branch.
    pub fn delete_sub_branch(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM sub_branches WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Member operations
    // ============================================================

    /// All members of a branch joined with rank and sub-branch names.
    ///
    /// Members without a sub-branch come first, then sub-branches by display
    /// order and name; within a group, ranks by display order and name, then
    /// members by name.
    pub fn get_members_by_branch(&self, branch_id: Uuid) -> Result<Vec<MemberRow>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT m.id, m.branch_id, m.rank_id, m.sub_branch_id, m.name, m.alt, m.title,
                    m.notes, m.created_at, r.name, r.display_order, sb.name
             FROM members m
             JOIN ranks r ON m.rank_id = r.id
             LEFT JOIN sub_branches sb ON m.sub_branch_id = sb.id
             WHERE m.branch_id = ?
             ORDER BY
                CASE WHEN sb.id IS NULL THEN 0 ELSE 1 END,
                sb.display_order,
                sb.name,
                r.display_order,
                r.name,
                m.name",
        )?;

        let members = stmt
            .query_map([branch_id.to_string()], |row| {
                Ok(MemberRow {
                    member: member_from_row(row)?,
                    rank_name: row.get(9)?,
                    rank_order: row.get(10)?,
                    sub_branch_name: row.get(11)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(members)
    }

    pub fn get_member(&self, id: Uuid) -> Result<Option<Member>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, branch_id, rank_id, sub_branch_id, name, alt, title, notes, created_at
             FROM members WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(member_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn create_member(&self, branch_id: Uuid, input: CreateMemberInput) -> Result<Member> {
        self.get_branch(branch_id)?
            .ok_or_else(|| anyhow::anyhow!("Branch not found"))?;

        let rank = self
            .get_rank(input.rank_id)?
            .filter(|r| r.branch_id == branch_id)
            .ok_or_else(|| anyhow::anyhow!("Rank not found in branch"))?;

        if let Some(sub_branch_id) = input.sub_branch_id {
            self.get_sub_branch(sub_branch_id)?
                .filter(|sb| sb.branch_id == branch_id)
                .ok_or_else(|| anyhow::anyhow!("Sub-branch not found in branch"))?;
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO members (id, branch_id, rank_id, sub_branch_id, name, alt, title, notes, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                branch_id.to_string(),
                rank.id.to_string(),
                input.sub_branch_id.map(|id| id.to_string()),
                &input.name,
                &input.alt,
                &input.title,
                &input.notes,
                now.to_rfc3339(),
            ),
        )?;

        Ok(Member {
            id,
            branch_id,
            rank_id: rank.id,
            sub_branch_id: input.sub_branch_id,
            name: input.name,
            alt: input.alt,
            title: input.title,
            notes: input.notes,
            created_at: now,
        })
    }

    pub fn delete_member(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM members WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    /// Removes every member with this exact name, across all branches.
    /// Returns the affected branch ids alongside the number of removed rows.
    pub fn delete_members_by_name(&self, name: &str) -> Result<(usize, Vec<Uuid>)> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        let branch_ids = {
            let mut stmt = tx.prepare("SELECT DISTINCT branch_id FROM members WHERE name = ?")?;
            let ids = stmt
                .query_map([name], |row| Ok(parse_uuid(row.get::<_, String>(0)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            ids
        };
        // Statement is dropped before commit
        let removed = tx.execute("DELETE FROM members WHERE name = ?", [name])?;
        tx.commit()?;

        Ok((removed, branch_ids))
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn branch_from_row(row: &Row<'_>) -> rusqlite::Result<Branch> {
    Ok(Branch {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        emoji: row.get(2)?,
        display_order: row.get(3)?,
        layout: LayoutKind::from_str(&row.get::<_, String>(4)?).unwrap_or_default(),
        special_section: row.get(5)?,
        message_id: row.get(6)?,
        created_at: parse_datetime(row.get::<_, String>(7)?),
    })
}

fn rank_from_row(row: &Row<'_>) -> rusqlite::Result<Rank> {
    Ok(Rank {
        id: parse_uuid(row.get::<_, String>(0)?),
        branch_id: parse_uuid(row.get::<_, String>(1)?),
        name: row.get(2)?,
        display_order: row.get(3)?,
        created_at: parse_datetime(row.get::<_, String>(4)?),
    })
}

fn sub_branch_from_row(row: &Row<'_>) -> rusqlite::Result<SubBranch> {
    Ok(SubBranch {
        id: parse_uuid(row.get::<_, String>(0)?),
        branch_id: parse_uuid(row.get::<_, String>(1)?),
        name: row.get(2)?,
        display_order: row.get(3)?,
        created_at: parse_datetime(row.get::<_, String>(4)?),
    })
}

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<Member> {
    Ok(Member {
        id: parse_uuid(row.get::<_, String>(0)?),
        branch_id: parse_uuid(row.get::<_, String>(1)?),
        rank_id: parse_uuid(row.get::<_, String>(2)?),
        sub_branch_id: row.get::<_, Option<String>>(3)?.map(parse_uuid),
        name: row.get(4)?,
        alt: row.get(5)?,
        title: row.get(6)?,
        notes: row.get(7)?,
        created_at: parse_datetime(row.get::<_, String>(8)?),
    })
}

/// Turns a UNIQUE violation into a readable error the API can surface.
/// Other constraint failures pass through unchanged.
fn unique_violation(err: rusqlite::Error, what: &str) -> anyhow::Error {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            anyhow::anyhow!("{} already exists", what)
        }
        _ => err.into(),
    }
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraint_error(extended_code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(extended_code), None)
    }

    #[test]
    fn test_unique_violation_is_readable() {
        let err = unique_violation(constraint_error(ffi::SQLITE_CONSTRAINT_UNIQUE), "Rank name");
        assert_eq!(err.to_string(), "Rank name already exists");
    }

    #[test]
    fn test_other_constraints_pass_through() {
        for code in [
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            ffi::SQLITE_CONSTRAINT_NOTNULL,
            ffi::SQLITE_CONSTRAINT_CHECK,
        ] {
            let err = unique_violation(constraint_error(code), "Branch name");
            assert!(!err.to_string().contains("already exists"));
        }
    }
}
