//! Dirty-tracking ORM over the schema catalog.
//!
//! - [`Record`]: field values of one row plus the originals they are
//!   compared against to compute a minimal write set
//! - [`Model`]: typed wrapper around a record, with lifecycle hooks
//! - [`ModelQuery`]: single-use save / insert / update / delete of one model
//! - [`FindQuery`]: loads models by column match or raw condition
//!
//! ```no_run
//! use lifeline::orm::{Model, Record};
//! use lifeline::schema::{Column, Schema, Table};
//! use lifeline::Database;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::open_sqlite("app.db")?;
//! let mut schema = Schema::new();
//! schema.register(
//!     Table::new("users")
//!         .column(Column::integer("id").auto_increment())
//!         .column(Column::string("name"))
//!         .primary_key("id"),
//! )?;
//!
//! let users = schema.bind(&db, "users")?;
//! let mut bob: Record = users.find().col("id", 7).first()?;
//! bob.set("name", "Robert")?;
//! bob.query(&db).update()?;
//! # Ok(())
//! # }
//! ```

mod error;
mod find;
mod model;
mod query;
mod record;

pub use error::{Operation, OrmError};
pub use find::FindQuery;
pub use model::Model;
pub use query::ModelQuery;
pub use record::{Record, RecordSnapshot, SnapshotValue, SNAPSHOT_VERSION};
