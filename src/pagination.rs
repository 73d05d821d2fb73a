//! Keyset pagination over an [`EntityStore`].
//!
//! A page is located from the decoded cursor by scanning the ordered records
//! for the first one at or past the cursor's boundary. The next cursor names
//! the first record of the following page directly, so resuming never needs
//! an extra increment.

use crate::cursor::{self, Cursor, CursorDecodeError};
use crate::store::{EntityRecord, EntityStore};

/// Default number of records per page
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// One resolved page of records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a> {
    pub records: &'a [EntityRecord],
    /// Token for the next page, `None` on the terminal page
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl Page<'_> {
    fn empty() -> Self {
        Page {
            records: &[],
            next_cursor: None,
            has_more: false,
        }
    }
}

/// Stateless page resolver
#[derive(Debug, Clone, Copy)]
pub struct PageResolver {
    page_size: usize,
}

impl Default for PageResolver {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PageResolver {
    /// Create a resolver. A page size of zero is treated as one.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Resolve the page addressed by an optional cursor token
    pub fn resolve<'a>(
        &self,
        store: &'a EntityStore,
        token: Option<&str>,
    ) -> Result<Page<'a>, CursorDecodeError> {
        let cursor = token.map(cursor::decode).transpose()?;
        Ok(self.resolve_cursor(store, cursor.as_ref()))
    }

    /// Resolve the page starting at an already decoded cursor
    pub fn resolve_cursor<'a>(&self, store: &'a EntityStore, cursor: Option<&Cursor>) -> Page<'a> {
        if store.is_empty() {
            return Page::empty();
        }
        let records = store.records();

        let start = match cursor {
            None => 0,
            Some(cursor) => match find_start(records, cursor) {
                Some(idx) => idx,
                None => return Page::empty(),
            },
        };

        let end = start
            .saturating_add(self.page_size - 1)
            .min(records.len() - 1);
        let has_more = end < records.len() - 1;

        let next_cursor = if has_more {
            let next = &records[end + 1];
            Some(cursor::encode(next.order_key, Some(&next.id)))
        } else {
            None
        };

        Page {
            records: &records[start..=end],
            next_cursor,
            has_more,
        }
    }
}

/// First index at or past the cursor boundary, or `None` when the cursor
/// points beyond the last record.
fn find_start(records: &[EntityRecord], cursor: &Cursor) -> Option<usize> {
    records.iter().position(|record| {
        if record.order_key == cursor.order_key {
            match &cursor.id {
                Some(id) => record.id == *id,
                None => true,
            }
        } else {
            // The named record is gone, resume at the first later one
            record.order_key > cursor.order_key
        }
    })
}
