//! Search-as-you-type helpers. Each query gets a ticket; a response is only handed back if its
//! ticket is still the newest one issued, so a slow answer to an old query can never overwrite
//! the answer to a newer one.

use crate::catalog::CatalogApi;
use crate::models::{Media, Person};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
pub struct QueryGenerations {
    latest: AtomicU64,
}

impl QueryGenerations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issuing a ticket invalidates every earlier one.
    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

pub struct LatestSearch {
    catalog: Arc<dyn CatalogApi>,
    generations: QueryGenerations,
}

impl LatestSearch {
    pub fn new(catalog: Arc<dyn CatalogApi>) -> Self {
        Self {
            catalog,
            generations: QueryGenerations::new(),
        }
    }

    /// `None` means a newer query was issued while this one was in flight.
    pub async fn search(&self, query: &str, page: u32) -> Option<Vec<Media>> {
        let ticket = self.generations.issue();
        let results = self.catalog.search(query, page).await;
        self.keep_if_current(ticket, query, results)
    }

    pub async fn search_people(&self, query: &str, page: u32) -> Option<Vec<Person>> {
        let ticket = self.generations.issue();
        let results = self.catalog.search_people(query, page).await;
        self.keep_if_current(ticket, query, results)
    }

    fn keep_if_current<T>(&self, ticket: Ticket, query: &str, results: T) -> Option<T> {
        if self.generations.is_current(ticket) {
            Some(results)
        } else {
            debug!("Discarding stale results for '{}'", query);
            None
        }
    }
}
