//! Paginated results.

use crate::value::Row;
use once_cell::unsync::OnceCell;
use serde::Serialize;
use serde_json::json;

/// One entry of the page index: 1-based page number and its row offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub index: u64,
    pub start: u64,
}

/// Window of page numbers around the current page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompactNav {
    pub current: u64,
    pub first: Option<u64>,
    pub prev: Option<u64>,
    pub pages: Vec<u64>,
    pub next: Option<u64>,
    pub last: Option<u64>,
}

impl CompactNav {
    /// Window of `side` pages left and right of the page holding `start`.
    pub fn compute(start: u64, per_page: u64, page_count: u64, side: u64) -> Self {
        let current = start / per_page.max(1) + 1;
        if page_count == 0 {
            return Self {
                current,
                first: None,
                prev: None,
                pages: Vec::new(),
                next: None,
                last: None,
            };
        }

        let low = current.saturating_sub(side).max(1);
        let high = current.saturating_add(side).min(page_count);
        Self {
            current,
            first: Some(1),
            prev: (current > 1).then(|| current - 1),
            pages: (low..=high).collect(),
            next: (current < page_count).then(|| current + 1),
            last: Some(page_count),
        }
    }
}

/// One page of a SELECT plus the arithmetic around it.
#[derive(Debug, Clone)]
pub struct Paginated {
    total_rows: u64,
    page_count: u64,
    start: u64,
    per_page: u64,
    rows: Vec<Row>,
    pages: Vec<Page>,
    compact: OnceCell<CompactNav>,
}

impl Paginated {
    /// `page_count = ceil(total_rows / per_page)`. The page index is only
    /// built when there are rows. A `per_page` of 0 counts as 1.
    pub fn new(rows: Vec<Row>, total_rows: u64, start: u64, per_page: u64) -> Self {
        let per_page = per_page.max(1);
        let page_count = total_rows.div_ceil(per_page);
        let pages = if total_rows > 0 {
            (0..page_count)
                .map(|i| Page {
                    index: i + 1,
                    start: i * per_page,
                })
                .collect()
        } else {
            Vec::new()
        };
        Self {
            total_rows,
            page_count,
            start,
            per_page,
            rows,
            pages,
            compact: OnceCell::new(),
        }
    }

    /// Compact navigation with `side` pages either side of the current one.
    ///
    /// Computed on the first call and cached; later calls return the cached
    /// window even when `side` differs. Use [`CompactNav::compute`] for an
    /// uncached window.
    pub fn compact_nav(&self, side: u64) -> &CompactNav {
        self.compact
            .get_or_init(|| CompactNav::compute(self.start, self.per_page, self.page_count, side))
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Number of rows materialized for this page.
    pub fn count(&self) -> usize {
        self.rows.len()
    }

    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    pub fn page_count(&self) -> u64 {
        self.page_count
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    /// JSON export. `compactNav` is `null` until [`Paginated::compact_nav`]
    /// was called; `pages` is `null` unless `include_pages`.
    pub fn to_json(&self, include_pages: bool) -> serde_json::Value {
        json!({
            "totalRows": self.total_rows,
            "count": self.count(),
            "rows": self.rows,
            "start": self.start,
            "perPage": self.per_page,
            "pageCount": self.page_count,
            "compactNav": self.compact.get(),
            "pages": if include_pages { Some(&self.pages) } else { None },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result() {
        let p = Paginated::new(Vec::new(), 0, 0, 100);
        assert_eq!(p.page_count(), 0);
        assert!(p.rows().is_empty());
        assert!(p.pages().is_empty());
        assert!(p.compact_nav(5).pages.is_empty());
    }

    #[test]
    fn test_page_index() {
        let p = Paginated::new(Vec::new(), 95, 0, 20);
        assert_eq!(p.page_count(), 5);
        let starts: Vec<u64> = p.pages().iter().map(|pg| pg.start).collect();
        assert_eq!(starts, vec![0, 20, 40, 60, 80]);
        assert_eq!(p.pages()[4].index, 5);
    }

    #[test]
    fn test_exact_multiple() {
        let p = Paginated::new(Vec::new(), 100, 0, 20);
        assert_eq!(p.page_count(), 5);
    }

    #[test]
    fn test_compact_nav_window() {
        let nav = CompactNav::compute(100, 10, 30, 3);
        assert_eq!(nav.current, 11);
        assert_eq!(nav.pages, vec![8, 9, 10, 11, 12, 13, 14]);
        assert_eq!(nav.prev, Some(10));
        assert_eq!(nav.next, Some(12));
        assert_eq!(nav.last, Some(30));

        let nav = CompactNav::compute(0, 10, 3, 5);
        assert_eq!(nav.pages, vec![1, 2, 3]);
        assert_eq!(nav.prev, None);
    }

    #[test]
    fn test_compact_nav_is_cached() {
        let p = Paginated::new(Vec::new(), 500, 0, 10);
        assert_eq!(p.compact_nav(2).pages, vec![1, 2, 3]);
        assert_eq!(p.compact_nav(5).pages, vec![1, 2, 3]);
    }

    #[test]
    fn test_json_export() {
        let p = Paginated::new(vec![Row::new().with("id", 1)], 1, 0, 10);
        let out = p.to_json(false);
        assert_eq!(out["totalRows"], 1);
        assert_eq!(out["rows"][0]["id"], 1);
        assert!(out["compactNav"].is_null());
        assert!(out["pages"].is_null());

        p.compact_nav(5);
        let out = p.to_json(true);
        assert_eq!(out["compactNav"]["current"], 1);
        assert_eq!(out["pages"][0]["index"], 1);
    }
}
