//! Pagination walk state machine.
//!
//! `PageWalk` decides which page to request next and when to stop. It does
//! no I/O: the caller fetches pages and feeds results back in, which keeps
//! the termination rules testable without a network.
//!
//! The walk ends when:
//! - the remote reports no further pages (`Exhausted`),
//! - a fetch fails (`RemoteFailed`), which is treated as end of data,
//! - the remote points back at a page already requested (`Stalled`),
//! - the page budget is used up (`PageLimit`).

use crate::ids::TicketId;
use crate::page::RegistrationsPage;
use std::collections::BTreeSet;
use std::fmt;

/// Default upper bound on pages fetched in one walk.
pub const DEFAULT_MAX_PAGES: u32 = 1000;

/// Why a walk stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkEnd {
    /// The remote reported no more pages.
    Exhausted,
    /// A page fetch failed; ids gathered so far are kept.
    RemoteFailed {
        /// The page that failed.
        page: u32,
    },
    /// The remote pointed at a page that was already requested.
    Stalled {
        /// The repeated page number.
        page: u32,
    },
    /// The page budget was used up while the remote still reported more.
    PageLimit {
        /// The configured budget.
        max_pages: u32,
    },
}

impl WalkEnd {
    /// Whether the walk saw every page the remote reported.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

impl fmt::Display for WalkEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted => write!(f, "exhausted"),
            Self::RemoteFailed { page } => write!(f, "remote failed on page {}", page),
            Self::Stalled { page } => write!(f, "stalled on repeated page {}", page),
            Self::PageLimit { max_pages } => write!(f, "page limit {} reached", max_pages),
        }
    }
}

/// Result of a finished walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOutcome {
    /// Every ticket id seen, in page-arrival order, duplicates included.
    pub ids: Vec<TicketId>,
    /// Number of pages successfully decoded.
    pub pages_fetched: u32,
    /// Why the walk stopped.
    pub end: WalkEnd,
}

/// Pagination walk - NO I/O, just page bookkeeping.
#[derive(Debug, Clone)]
pub struct PageWalk {
    max_pages: u32,
    next: Option<u32>,
    requested: BTreeSet<u32>,
    ids: Vec<TicketId>,
    pages_fetched: u32,
    end: Option<WalkEnd>,
}

impl PageWalk {
    /// Start a walk at page 1 with the given page budget.
    ///
    /// A budget of zero is treated as one page.
    pub fn new(max_pages: u32) -> Self {
        Self {
            max_pages: max_pages.max(1),
            next: Some(1),
            requested: BTreeSet::new(),
            ids: Vec::new(),
            pages_fetched: 0,
            end: None,
        }
    }

    /// The page to fetch next, or `None` once the walk has ended.
    pub fn next_page(&self) -> Option<u32> {
        self.next
    }

    /// Record a successfully decoded page.
    ///
    /// Returns the page to fetch next, if any.
    pub fn on_page(&mut self, page: RegistrationsPage) -> Option<u32> {
        let requested = self.next.take()?;
        self.requested.insert(requested);
        self.pages_fetched += 1;
        self.ids.extend(page.tickets.into_iter().map(|t| t.id));

        if !page.meta.has_more() {
            self.end = Some(WalkEnd::Exhausted);
            return None;
        }

        let following = page.meta.following_page();
        if self.requested.contains(&following) {
            self.end = Some(WalkEnd::Stalled { page: following });
            return None;
        }
        if self.pages_fetched >= self.max_pages {
            self.end = Some(WalkEnd::PageLimit {
                max_pages: self.max_pages,
            });
            return None;
        }

        self.next = Some(following);
        self.next
    }

    /// Record a failed fetch of the pending page. Ends the walk.
    pub fn on_failure(&mut self) {
        if let Some(page) = self.next.take() {
            self.end = Some(WalkEnd::RemoteFailed { page });
        }
    }

    /// Whether the walk has ended.
    pub fn is_finished(&self) -> bool {
        self.next.is_none()
    }

    /// Consume the walk and return what it gathered.
    ///
    /// A walk abandoned before it ended reports `RemoteFailed` on the page
    /// that was pending.
    pub fn finish(self) -> WalkOutcome {
        let end = match (self.end, self.next) {
            (Some(end), _) => end,
            (None, Some(page)) => WalkEnd::RemoteFailed { page },
            (None, None) => WalkEnd::Exhausted,
        };
        WalkOutcome {
            ids: self.ids,
            pages_fetched: self.pages_fetched,
            end,
        }
    }
}

impl Default for PageWalk {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAGES)
    }
}
