//! Engine - Scoped polars session driving one conversion
//!
//! A [`FlattenSession`] owns the run configuration and is passed through
//! every step: schema load, data load, flattening, materialization and
//! output. It is dropped at the end of the run whether the run succeeded
//! or not.

pub mod materialize;
pub mod reader;
pub mod writer;

use crate::config::RunConfig;
use crate::error::Result;
use crate::flatten::{FlatColumn, SchemaFlattener};
use crate::schema::{self, Schema};
use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

/// Rows shown in the debug preview of the loaded frame
const PREVIEW_ROWS: usize = 20;

/// Outcome of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub input_rows: usize,
    pub output_rows: usize,
    pub columns: Vec<String>,
    pub part_path: PathBuf,
    pub elapsed_ms: u64,
    pub finished_at: DateTime<Utc>,
}

pub struct FlattenSession {
    config: RunConfig,
    flattener: SchemaFlattener,
    started: Instant,
}

impl FlattenSession {
    pub fn new(config: RunConfig) -> Self {
        info!(
            "Opening session: {} -> {} ({})",
            config.input_path.display(),
            config.output_path.display(),
            config.output_format
        );
        Self {
            config,
            flattener: SchemaFlattener::new(),
            started: Instant::now(),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn load_schema(&self) -> Result<Schema> {
        schema::load_schema(&self.config.schema_path)
    }

    /// Read the input file and conform it to `schema`
    pub fn load(&self, schema: &Schema) -> Result<DataFrame> {
        reader::check_supported(schema)?;
        let df = reader::read_avro(&self.config.input_path)?;
        let df = reader::conform(df, schema)?;
        debug!("Loaded frame preview:\n{}", df.head(Some(PREVIEW_ROWS)));
        Ok(df)
    }

    pub fn flatten(&self, schema: &Schema) -> Result<Vec<FlatColumn>> {
        let columns = self.flattener.flatten(schema)?;
        debug!(
            "Flattened into {} columns ({} exploded)",
            columns.len(),
            columns.iter().filter(|c| c.is_exploded()).count()
        );
        Ok(columns)
    }

    pub fn materialize(&self, df: DataFrame, columns: &[FlatColumn]) -> Result<DataFrame> {
        materialize::materialize(df, columns, self.config.explode_mode)
    }

    pub fn write(&self, df: &mut DataFrame) -> Result<PathBuf> {
        writer::write_output(df, &self.config.output_path, self.config.output_format)
    }

    /// Load the schema, then the data, flatten, and write the output
    pub fn run(&self) -> Result<RunSummary> {
        let schema = self.load_schema()?;
        // flattening before the data is read surfaces name collisions early
        let columns = self.flatten(&schema)?;
        let df = self.load(&schema)?;
        let input_rows = df.height();

        let mut flat = self.materialize(df, &columns)?;
        let part_path = self.write(&mut flat)?;

        Ok(RunSummary {
            input_rows,
            output_rows: flat.height(),
            columns: columns.into_iter().map(|c| c.flat_name).collect(),
            part_path,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            finished_at: Utc::now(),
        })
    }
}

impl Drop for FlattenSession {
    fn drop(&mut self) {
        debug!("Session closed after {:?}", self.started.elapsed());
    }
}
