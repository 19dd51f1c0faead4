//! sqltoelastic library
//!
//! Copies the result of an arbitrary SQL query into a date-partitioned
//! Elasticsearch/OpenSearch index over the bulk protocol.
//!
//! The pipeline has two steps:
//!
//! - [`source`] extracts rows from MySQL, PostgreSQL, or SQL Server and
//!   turns each one into a typed [`Document`], applying the configured
//!   field transformation rules along the way.
//! - [`elastic`] routes each document to `{indexname}-{YYYY.MM}` by its
//!   timestamp field and uploads the whole set in bulk batches, tallying
//!   the per-document outcomes the server reports.
//!
//! Configuration comes from a JSON file, with every key overridable
//! through `SQLTOELASTIC_*` environment variables (see [`config`]).

pub mod config;
pub mod copy;
pub mod elastic;
pub mod error;
pub mod mysql;
pub mod postgresql;
pub mod source;
pub mod sqlserver;
pub mod transform;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use transform::FieldRules;
pub use types::{Document, FieldValue};
