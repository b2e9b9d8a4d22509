//! Per-connection history of executed queries.

use crate::result::ExecutedQuery;

/// Append-only log of every statement a [`Database`](crate::Database) executed,
/// failures included.
#[derive(Debug, Clone, Default)]
pub struct QueryLog {
    queries: Vec<ExecutedQuery>,
}

impl QueryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a query; returns the new count.
    pub fn append(&mut self, query: ExecutedQuery) -> usize {
        self.queries.push(query);
        self.queries.len()
    }

    pub fn last(&self) -> Option<&ExecutedQuery> {
        self.queries.last()
    }

    pub fn count(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ExecutedQuery> {
        self.queries.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExecutedQuery> {
        self.queries.iter()
    }

    /// Forget every recorded query.
    pub fn flush(&mut self) {
        self.queries.clear();
    }
}

impl<'a> IntoIterator for &'a QueryLog {
    type Item = &'a ExecutedQuery;
    type IntoIter = std::slice::Iter<'a, ExecutedQuery>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
