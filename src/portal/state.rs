/// Fetch state definitions for tracking one backend fetch
///
/// A fetch walks `Init → SessionEstablished → QuerySubmitted → PageParsed`,
/// loops on `PageParsed` while pages remain, and ends in `Done` or `Failed`.
use std::fmt;

/// Represents the current state of a single `fetch` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchState {
    // ===== Active States =====
    /// Nothing sent yet
    Init,

    /// Entry page loaded and session fields harvested
    SessionEstablished,

    /// Query payload posted (or first API page requested)
    QuerySubmitted,

    /// At least one result page parsed
    PageParsed,

    // ===== Terminal States =====
    /// No more pages, or the page limit was reached
    Done,

    /// An unrecovered failure ended the fetch; no records are returned
    Failed,
}

impl FetchState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    ///
    /// `Failed` is reachable from every active state. A new query cycle may
    /// start from `PageParsed` (weekly searches submit one query per week).
    pub fn can_transition_to(&self, next: FetchState) -> bool {
        use FetchState::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Failed) => true,
            (Init, SessionEstablished | QuerySubmitted) => true,
            (SessionEstablished, SessionEstablished | QuerySubmitted) => true,
            (QuerySubmitted, PageParsed) => true,
            (PageParsed, PageParsed | SessionEstablished | QuerySubmitted | Done) => true,
            // A session may be established with nothing worth querying
            (SessionEstablished, Done) => true,
            _ => false,
        }
    }

    /// Returns the lowercase label used in logs and summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::SessionEstablished => "session_established",
            Self::QuerySubmitted => "query_submitted",
            Self::PageParsed => "page_parsed",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
