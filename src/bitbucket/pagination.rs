//! Pagination cursors for Bitbucket list endpoints.
//!
//! Bitbucket pages with `start`/`limit` offsets rather than page numbers.
//! Responses carry `isLastPage` and `nextPageStart`, which callers feed back
//! into the next request.

/// Offset cursor for a paged Bitbucket request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    /// Offset of the first item to return.
    start: u32,
    /// Maximum items per page.
    limit: u32,
}

impl PageCursor {
    /// Cursor for the first page with the given page size.
    #[must_use]
    pub const fn first(limit: u32) -> Self {
        Self { start: 0, limit }
    }

    /// Returns the offset of the first item on this page.
    #[must_use]
    pub const fn start(&self) -> u32 {
        self.start
    }

    /// Returns the maximum items per page.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Cursor for the page starting at the server-reported offset.
    #[must_use]
    pub const fn advanced_to(self, start: u32) -> Self {
        Self {
            start,
            limit: self.limit,
        }
    }

    /// Query parameters for this cursor.
    #[must_use]
    pub fn query(&self) -> [(String, String); 2] {
        [
            ("start".to_owned(), self.start.to_string()),
            ("limit".to_owned(), self.limit.to_string()),
        ]
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::first(25)
    }
}

#[cfg(test)]
mod tests {
    use super::PageCursor;

    #[test]
    fn first_page_starts_at_zero() {
        let cursor = PageCursor::first(50);
        assert_eq!(cursor.start(), 0);
        assert_eq!(cursor.limit(), 50);
    }

    #[test]
    fn advancing_preserves_the_page_size() {
        let cursor = PageCursor::first(50).advanced_to(150);
        assert_eq!(cursor.start(), 150);
        assert_eq!(cursor.limit(), 50);
    }

    #[test]
    fn query_parameters_match_cursor_state() {
        let cursor = PageCursor::first(25).advanced_to(75);
        let [start, limit] = cursor.query();
        assert_eq!(start, ("start".to_owned(), "75".to_owned()));
        assert_eq!(limit, ("limit".to_owned(), "25".to_owned()));
    }
}
