//! The `Model` trait.

use super::{ModelQuery, Record};
use crate::executor::Database;

/// A typed wrapper around a [`Record`].
///
/// Implementors own a record and expose typed accessors over it. The hooks
/// default to no-ops and run at these points:
///
/// - `on_load` after a model was hydrated by a [`FindQuery`](super::FindQuery)
/// - `before_query` before a [`ModelQuery`] write is built
/// - `after_query` after a write succeeded
///
/// # Example
///
/// ```
/// use lifeline::orm::{Model, Record};
///
/// struct User(Record);
///
/// impl Model for User {
///     fn from_record(record: Record) -> Self {
///         User(record)
///     }
///     fn record(&self) -> &Record {
///         &self.0
///     }
///     fn record_mut(&mut self) -> &mut Record {
///         &mut self.0
///     }
///     fn model_name(&self) -> String {
///         "User".to_string()
///     }
/// }
/// ```
pub trait Model: Sized {
    fn from_record(record: Record) -> Self;

    fn record(&self) -> &Record;

    fn record_mut(&mut self) -> &mut Record;

    /// Name used in error messages. Defaults to the table name.
    fn model_name(&self) -> String {
        self.record().table().name().to_string()
    }

    fn on_load(&mut self) {}

    fn before_query(&mut self) {}

    fn after_query(&mut self) {}

    /// A single-use write query for this model on `db`.
    fn query<'m, 'db>(&'m mut self, db: &'db Database) -> ModelQuery<'m, 'db, Self> {
        ModelQuery::new(db, self)
    }
}

impl Model for Record {
    fn from_record(record: Record) -> Self {
        record
    }

    fn record(&self) -> &Record {
        self
    }

    fn record_mut(&mut self) -> &mut Record {
        self
    }
}
