//! Integration tests against an in-memory (or temporary file) SQLite database.

mod common;
mod find_query;
mod migration;
mod model_query;
mod persistence;
mod query_builder;
