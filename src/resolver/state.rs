//! Resolution lifecycle
//!
//! `Created → Fetching → Collecting → Assembled`, or `→ Failed` from any
//! state that is not terminal. There are no retries: a failed resolution
//! stays failed.

use std::fmt;

use tracing::{debug, warn};

use crate::error::ResolveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Created,
    Fetching,
    Collecting,
    Assembled,
    Failed,
}

impl ResolutionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Assembled | Self::Failed)
    }

    /// Whether `next` may follow this state
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Fetching)
                | (Self::Fetching, Self::Collecting)
                | (Self::Collecting, Self::Assembled)
        ) || (!self.is_terminal() && next == Self::Failed)
    }
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Fetching => "fetching",
            Self::Collecting => "collecting",
            Self::Assembled => "assembled",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks and logs the state of one resolution
#[derive(Debug)]
pub struct Resolution<'a> {
    location: &'a str,
    state: ResolutionState,
}

impl<'a> Resolution<'a> {
    pub fn new(location: &'a str) -> Self {
        Self {
            location,
            state: ResolutionState::Created,
        }
    }

    pub fn state(&self) -> ResolutionState {
        self.state
    }

    /// Move to `next`, logging the transition
    pub fn advance(&mut self, next: ResolutionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid resolution transition {} -> {next}",
            self.state
        );
        debug!(
            location = self.location,
            from = %self.state,
            to = %next,
            "resolution state changed"
        );
        self.state = next;
    }

    /// Mark the resolution failed
    pub fn fail(&mut self, error: &ResolveError) {
        warn!(
            location = self.location,
            from = %self.state,
            kind = ?error.kind(),
            error = %error,
            "resolution failed"
        );
        self.state = ResolutionState::Failed;
    }
}
