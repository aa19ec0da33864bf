//! Guild roster bot.
//!
//! Staff maintain branches, ranks, sub-branches and members through the admin
//! API; every branch is rendered as one auto-updating Discord embed in the
//! roster channel.

pub mod api;
pub mod config;
pub mod db;
pub mod discord;
pub mod models;
pub mod roster;
