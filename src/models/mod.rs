//! Domain models for the roster.
//!
//! # Hierarchy
//!
//! - [`Branch`]: Top-level organizational unit. Each branch owns one rendered
//!   roster message in the roster channel.
//! - [`Rank`]: Named tier within a branch; the primary grouping key for display.
//! - [`SubBranch`]: Optional secondary grouping (a squadron, a division),
//!   orthogonal to rank.
//! - [`Member`]: A roster entry with a required rank and an optional sub-branch.
//!
//! [`MemberRow`] is the read shape the renderer consumes: a member joined with
//! its rank and sub-branch names.

mod branch;
mod member;
mod rank;
mod sub_branch;

pub use branch::*;
pub use member::*;
pub use rank::*;
pub use sub_branch::*;
