//! Page state definitions for tracking crawl progress

use std::fmt;

/// Lifecycle of a URL inside the frontier
///
/// Every URL the frontier accepts moves through these states exactly once:
/// `Queued -> InFlight -> {Processed | Failed | Abandoned}`, or
/// `Queued -> Skipped` when a safety bound or cancellation drops it before
/// it is claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Active States =====
    /// Discovered and waiting for a worker
    Queued,

    /// Claimed by a worker; a fetch is running
    InFlight,

    // ===== Terminal States =====
    /// Fetched and extracted
    Processed,

    /// Fetch failed permanently (after retries, if the failure was transient)
    Failed,

    /// Dropped before fetching by the page bound or by cancellation
    Skipped,

    /// Claimed but abandoned because the crawl was cancelled mid-fetch
    Abandoned,
}

impl PageState {
    /// Returns true if this is a terminal state (the URL counts as visited)
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true if the page may still be processed
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::InFlight)
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Processed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: PageState) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::InFlight)
                | (Self::Queued, Self::Skipped)
                | (Self::InFlight, Self::Processed)
                | (Self::InFlight, Self::Failed)
                | (Self::InFlight, Self::Abandoned)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InFlight => "in_flight",
            Self::Processed => "processed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [PageState; 6] = [
        PageState::Queued,
        PageState::InFlight,
        PageState::Processed,
        PageState::Failed,
        PageState::Skipped,
        PageState::Abandoned,
    ];

    #[test]
    fn test_is_terminal() {
        assert!(!PageState::Queued.is_terminal());
        assert!(!PageState::InFlight.is_terminal());

        assert!(PageState::Processed.is_terminal());
        assert!(PageState::Failed.is_terminal());
        assert!(PageState::Skipped.is_terminal());
        assert!(PageState::Abandoned.is_terminal());
    }

    #[test]
    fn test_is_success() {
        assert!(PageState::Processed.is_success());
        assert!(!PageState::Failed.is_success());
        assert!(!PageState::Abandoned.is_success());
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in ALL.iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_in_flight_cannot_return_to_queue() {
        assert!(!PageState::InFlight.can_transition_to(PageState::Queued));
        assert!(!PageState::Queued.can_transition_to(PageState::Processed));
        assert!(PageState::Queued.can_transition_to(PageState::InFlight));
        assert!(PageState::InFlight.can_transition_to(PageState::Processed));
    }

    #[test]
    fn test_display() {
        assert_eq!(PageState::InFlight.to_string(), "in_flight");
    }
}
