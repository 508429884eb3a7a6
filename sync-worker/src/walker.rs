//! Pagination walker.
//!
//! Drives a [`RegistrationSource`] through every page using the pure
//! [`PageWalk`] state machine. A failed fetch ends the walk: whatever was
//! gathered before the failure is returned and the next scheduled run
//! starts again from page 1.

use crate::remote::RegistrationSource;
use sync_core::{PageWalk, WalkEnd, WalkOutcome};

/// Walk every page the source reports, collecting ticket ids in page order.
///
/// Never fails; fetch errors are logged and end the walk.
pub async fn walk_all(source: &dyn RegistrationSource, max_pages: u32) -> WalkOutcome {
    let mut walk = PageWalk::new(max_pages);

    while let Some(page_number) = walk.next_page() {
        match source.fetch_page(page_number).await {
            Ok(page) => {
                let count = page.tickets.len();
                if page.skipped_tickets > 0 {
                    tracing::warn!(
                        "Skipped {} tickets without an id on page {}",
                        page.skipped_tickets,
                        page_number
                    );
                }
                if page_number == 1 {
                    tracing::info!("Retrieved {} tickets from Tito", count);
                } else if count > 0 {
                    tracing::info!("Found {} more tickets from Tito (page {})", count, page_number);
                }
                walk.on_page(page);
            }
            Err(e) => {
                tracing::error!(page = e.page(), "Error reading Tito registrations: {}", e);
                walk.on_failure();
            }
        }
    }

    let outcome = walk.finish();
    match outcome.end {
        WalkEnd::Exhausted | WalkEnd::RemoteFailed { .. } => {}
        WalkEnd::Stalled { page } => {
            tracing::warn!("Tito pagination did not advance (page {} repeated); stopping", page)
        }
        WalkEnd::PageLimit { max_pages } => {
            tracing::warn!("Stopped after {} pages; remote still reports more", max_pages)
        }
    }
    outcome
}
