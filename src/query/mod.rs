//! Query building.
//!
//! - [`QueryBuilder`] accumulates table, WHERE clause, projection, ordering and
//!   limits, then executes INSERT / UPDATE / DELETE / SELECT through the
//!   [`Database`](crate::Database) executor
//! - [`Paginated`] holds one page of a paginated SELECT and its page arithmetic

pub mod builder;
pub mod paginated;

pub use builder::{BuilderError, QueryBuilder};
pub use paginated::{CompactNav, Page, Paginated};
