//! Run configuration
//!
//! Everything a single conversion needs, built once from the command line
//! and handed to the [`FlattenSession`](crate::engine::FlattenSession).

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Output encoding of the flattened table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Comma separated with a header row
    Csv,
}

impl OutputFormat {
    /// File extension used for the part file
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// How rows with a null or empty array are treated when that array is exploded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplodeMode {
    /// The row produces no output rows
    #[default]
    Inner,
    /// The row is kept once with a null in the exploded column
    Outer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub input_path: PathBuf,
    pub schema_path: PathBuf,
    pub output_path: PathBuf,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default)]
    pub explode_mode: ExplodeMode,
}

impl RunConfig {
    pub fn new(
        input_path: impl Into<PathBuf>,
        schema_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            schema_path: schema_path.into(),
            output_path: output_path.into(),
            output_format: OutputFormat::default(),
            explode_mode: ExplodeMode::default(),
        }
    }

    pub fn with_output_format(mut self, output_format: OutputFormat) -> Self {
        self.output_format = output_format;
        self
    }

    pub fn with_explode_mode(mut self, explode_mode: ExplodeMode) -> Self {
        self.explode_mode = explode_mode;
        self
    }
}
