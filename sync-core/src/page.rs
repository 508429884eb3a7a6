//! Page envelope types for the registrations API.
//!
//! A page carries a batch of tickets plus pagination metadata telling the
//! caller whether another page exists and which page number to ask for.

use crate::ids::{RawTicketId, TicketId};
use serde::{Deserialize, Serialize};

/// Pagination metadata returned alongside each page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    /// Page number of this response (1-based).
    pub current_page: u32,
    /// Page number to request next, if the remote reports one.
    #[serde(default)]
    pub next_page: Option<u32>,
    /// Total number of pages the remote reports.
    pub total_pages: u32,
}

impl PageMeta {
    /// Whether another page should be requested.
    ///
    /// True when the remote names a next page, or when the current page is
    /// below the reported total.
    pub fn has_more(&self) -> bool {
        self.next_page.is_some() || self.current_page < self.total_pages
    }

    /// The page number to request after this one.
    ///
    /// Falls back to `current_page + 1` when no next page is reported.
    pub fn following_page(&self) -> u32 {
        self.next_page
            .unwrap_or_else(|| self.current_page.saturating_add(1))
    }
}

/// A single remote ticket. Only the identifier matters to sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Remote identifier.
    pub id: TicketId,
}

/// One decoded page of registrations.
///
/// Tickets without a usable id (missing, null or blank) are dropped while
/// decoding and counted in `skipped_tickets`, so one bad record never costs
/// the rest of the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPage")]
pub struct RegistrationsPage {
    /// Pagination metadata.
    pub meta: PageMeta,
    /// Tickets on this page (absent or null decodes as empty).
    pub tickets: Vec<Ticket>,
    /// Tickets dropped for lacking a usable id.
    #[serde(skip)]
    pub skipped_tickets: usize,
}

impl RegistrationsPage {
    /// Iterate over the ticket ids on this page, in page order.
    pub fn ticket_ids(&self) -> impl Iterator<Item = &TicketId> {
        self.tickets.iter().map(|t| &t.id)
    }
}

#[derive(Deserialize)]
struct RawPage {
    meta: PageMeta,
    #[serde(default)]
    tickets: Option<Vec<RawTicket>>,
}

#[derive(Deserialize)]
struct RawTicket {
    #[serde(default)]
    id: Option<RawTicketId>,
}

impl From<RawPage> for RegistrationsPage {
    fn from(raw: RawPage) -> Self {
        let raw_tickets = raw.tickets.unwrap_or_default();
        let total = raw_tickets.len();
        let tickets: Vec<Ticket> = raw_tickets
            .into_iter()
            .filter_map(|t| t.id?.into_ticket_id().ok())
            .map(|id| Ticket { id })
            .collect();
        Self {
            meta: raw.meta,
            skipped_tickets: total - tickets.len(),
            tickets,
        }
    }
}
