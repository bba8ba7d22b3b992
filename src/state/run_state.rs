/// Run state definitions for tracking crawl progress
///
/// This module defines all phases a crawl run passes through.
use std::fmt;

/// Represents the current phase of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunState {
    // ===== Active States =====
    /// Run has been created but nothing was requested yet
    #[default]
    Idle,

    /// Index pages are being fetched sequentially
    Discovering,

    /// Detail links have been collected from every index page
    LinksExtracted,

    /// Detail pages are being fetched by the worker pool
    Fetching,

    /// Fields are being extracted from the fetched pages
    Extracting,

    // ===== Terminal States =====
    /// The dataset has been persisted
    Written,

    /// The run produced no dataset
    Failed,
}

impl RunState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Written | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    ///
    /// Runs move strictly forward. `Failed` is reachable from discovery (first
    /// index page unavailable) and from extraction (the dataset could not be
    /// written).
    pub fn can_transition_to(&self, next: RunState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Discovering)
                | (Self::Discovering, Self::LinksExtracted)
                | (Self::Discovering, Self::Failed)
                | (Self::LinksExtracted, Self::Fetching)
                | (Self::Fetching, Self::Extracting)
                | (Self::Extracting, Self::Written)
                | (Self::Extracting, Self::Failed)
        )
    }

    /// Short lowercase label used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Discovering => "discovering",
            Self::LinksExtracted => "links_extracted",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Written => "written",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible run states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Idle,
            Self::Discovering,
            Self::LinksExtracted,
            Self::Fetching,
            Self::Extracting,
            Self::Written,
            Self::Failed,
        ]
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
