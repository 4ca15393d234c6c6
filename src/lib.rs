//! # avro-flatten
//!
//! Flattens nested Avro records into a flat CSV or JSON-lines table.
//!
//! The declared `.avsc` schema drives the conversion: nested records become
//! underscore-joined columns (`a.b` -> `a_b`) and arrays are exploded into
//! one row per element. polars does the reading, exploding and writing.
//!
//! ```no_run
//! use avro_flatten::config::{OutputFormat, RunConfig};
//! use avro_flatten::engine::FlattenSession;
//!
//! let config = RunConfig::new("events.avro", "events.avsc", "out")
//!     .with_output_format(OutputFormat::Csv);
//! let summary = FlattenSession::new(config).run()?;
//! println!("{} rows -> {}", summary.output_rows, summary.part_path.display());
//! # Ok::<(), avro_flatten::error::FlattenError>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod flatten;
pub mod schema;

pub use config::{ExplodeMode, OutputFormat, RunConfig};
pub use engine::{FlattenSession, RunSummary};
pub use error::{FlattenError, Result};
pub use flatten::{flatten_schema, output_schema, ColumnAccess, FlatColumn, SchemaFlattener};
pub use schema::{Field, FieldType, ScalarType, Schema};
