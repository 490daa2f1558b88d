//! Git operations for fetching repository snapshots
//!
//! This module handles:
//! - Cloning repositories over HTTPS, SSH and local paths
//! - Resolving refs (branches, tags, SHAs) to exact commits
//! - Authentication with the per-resolution credential only
//!
//! Unlike a developer's git client, nothing here reads the git config,
//! credential helpers, the SSH agent or `~/.ssh`. See [`auth`].

pub mod auth;
pub mod checkout;
pub mod clone;
pub mod error;
pub mod url;

pub use clone::{CloneRequest, GitSnapshot, fetch_snapshot, set_server_timeouts};
pub use url::Transport;
