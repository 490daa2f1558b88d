//! Ignore files
//!
//! An ignore file holds one glob pattern per line; blank lines and lines
//! starting with `#` are skipped. Patterns apply to entries beneath the
//! directory the ignore file sits in:
//! - A pattern containing `/` matches the path relative to that directory
//! - A pattern without `/` matches the entry's file name at any depth
//! - A trailing `/` restricts the pattern to directories

use std::fs;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;
use wax::{CandidatePath, Glob, Pattern};

use crate::error::{ResolveError, Result};

struct Rule {
    glob: Glob<'static>,
    anchored: bool,
    dir_only: bool,
}

impl Rule {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let dir_only = line.ends_with('/');
        let pattern = line.trim_end_matches('/').trim_start_matches("./");
        let anchored = pattern.contains('/');
        let pattern = pattern.trim_start_matches('/');
        if pattern.is_empty() {
            return None;
        }

        match Glob::new(pattern) {
            Ok(glob) => Some(Self {
                glob: glob.into_owned(),
                anchored,
                dir_only,
            }),
            Err(e) => {
                warn!(pattern, error = %e, "skipping invalid ignore pattern");
                None
            }
        }
    }

    fn matches(&self, relative: &str, is_dir: bool) -> bool {
        if self.dir_only && !is_dir {
            return false;
        }
        if self
            .glob
            .matched(&CandidatePath::from(relative))
            .is_some()
        {
            return true;
        }
        if self.anchored {
            return false;
        }
        let name = relative.rsplit('/').next().unwrap_or(relative);
        self.glob.matched(&CandidatePath::from(name)).is_some()
    }
}

/// Rules of one ignore file
struct RuleSet {
    /// Directory of the ignore file, relative to the root, `/`-separated;
    /// empty for the root itself
    base: String,
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Path of `relative` below this rule set's directory, if it is below it
    fn scoped<'a>(&self, relative: &'a str) -> Option<&'a str> {
        if self.base.is_empty() {
            return Some(relative);
        }
        relative
            .strip_prefix(self.base.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
    }
}

/// Every ignore file found beneath a collection root
#[derive(Default)]
pub struct IgnoreRules {
    sets: Vec<RuleSet>,
}

impl IgnoreRules {
    /// Find and parse every `file_name` beneath `root`
    ///
    /// `.git` directories are not searched.
    pub fn load(root: &Path, file_name: &str) -> Result<Self> {
        let mut sets = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.file_name() != ".git");

        for entry in walker.filter_map(std::result::Result::ok) {
            if !entry.file_type().is_file() || entry.file_name() != file_name {
                continue;
            }

            let content =
                fs::read_to_string(entry.path()).map_err(|e| ResolveError::FileReadFailed {
                    path: entry.path().display().to_string(),
                    reason: e.to_string(),
                })?;
            let rules: Vec<Rule> = content.lines().filter_map(Rule::parse).collect();
            if rules.is_empty() {
                continue;
            }

            let base = entry
                .path()
                .parent()
                .and_then(|dir| dir.strip_prefix(root).ok())
                .map(|dir| {
                    dir.components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/")
                })
                .unwrap_or_default();

            debug!(dir = %base, rules = rules.len(), "loaded ignore file");
            sets.push(RuleSet { base, rules });
        }

        Ok(Self { sets })
    }

    /// Parse a single ignore file's content as if it sat at the root
    #[cfg(test)]
    fn from_content(content: &str) -> Self {
        Self {
            sets: vec![RuleSet {
                base: String::new(),
                rules: content.lines().filter_map(Rule::parse).collect(),
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Whether the root-relative, `/`-separated path is ignored
    pub fn is_ignored(&self, relative: &str, is_dir: bool) -> bool {
        self.sets.iter().any(|set| {
            set.scoped(relative)
                .is_some_and(|scoped| set.rules.iter().any(|rule| rule.matches(scoped, is_dir)))
        })
    }
}
