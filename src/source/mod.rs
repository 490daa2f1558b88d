//! Source handling
//!
//! This module describes what a resolution fetches and with which credential:
//! - `descriptor.rs`: `SourceDescriptor` and `SourceKind`
//! - `credential.rs`: `Credential` variants and the SSH `HostKeyPolicy`

pub mod credential;
pub mod descriptor;

pub use credential::{Credential, HostKeyPolicy};
pub use descriptor::{SourceDescriptor, SourceKind};
