//! Chart repository fetching
//!
//! This module handles:
//! - Reading a repository's `index.yaml` and selecting a chart version
//! - Downloading chart archives with optional basic auth
//! - Extracting archives in memory into path-addressed files

pub mod archive;
pub mod client;
pub mod index;

pub use client::{FetchedChart, HelmRepository, fetch_chart_archive};
pub use index::{ChartVersion, IndexFile};
