/// URL state definitions for tracking crawl progress
///
/// Every accepted URL moves through `Queued -> InFlight -> Done` exactly once.
use std::fmt;

/// Represents which frontier set a URL currently belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlState {
    /// Accepted into the frontier, waiting for a concurrency slot
    Queued,

    /// Holding a concurrency slot, currently being fetched and processed
    InFlight,

    /// Outcome recorded; never revisited
    Done,
}

impl UrlState {
    /// Returns true if the URL still counts as outstanding work
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::InFlight)
    }

    /// Checks whether moving from `from` to `to` is allowed
    ///
    /// `None` stands for a URL that has been discovered but never accepted.
    /// A URL may also be finished straight from `Queued` when its worker
    /// never obtained a slot (it is recorded as a failure).
    pub fn can_transition(from: Option<Self>, to: Self) -> bool {
        matches!(
            (from, to),
            (None, Self::Queued)
                | (Some(Self::Queued), Self::InFlight)
                | (Some(Self::Queued), Self::Done)
                | (Some(Self::InFlight), Self::Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InFlight => "in_flight",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for UrlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
