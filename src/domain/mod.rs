//! Domain models for the bundle resolver
//!
//! This module contains the values a resolution produces. They carry no
//! credentials and are never mutated after creation.

pub mod bundle;
pub mod resource;

pub use bundle::Bundle;
pub use resource::Resource;
