//! Output writer - Single part file per run, overwriting the destination

use crate::config::OutputFormat;
use crate::error::{FlattenError, Result};
use polars::io::json::{JsonFormat, JsonWriter};
use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const SUCCESS_MARKER: &str = "_SUCCESS";

pub fn part_file_name(format: OutputFormat) -> String {
    format!("part-00000.{}", format.extension())
}

/// Write `df` as one part file under `output_path` and return the part path.
/// Whatever existed at `output_path` before is removed first.
pub fn write_output(df: &mut DataFrame, output_path: &Path, format: OutputFormat) -> Result<PathBuf> {
    prepare_output_dir(output_path)?;

    let part_path = output_path.join(part_file_name(format));
    let mut file = File::create(&part_path).map_err(|e| {
        FlattenError::OutputWrite(format!("Failed to create {}: {}", part_path.display(), e))
    })?;

    match format {
        OutputFormat::Csv => CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .finish(df),
        OutputFormat::Json => JsonWriter::new(&mut file)
            .with_json_format(JsonFormat::JsonLines)
            .finish(df),
    }
    .map_err(|e| FlattenError::OutputWrite(format!("Failed to write {} output: {}", format, e)))?;

    File::create(output_path.join(SUCCESS_MARKER))
        .map_err(|e| FlattenError::OutputWrite(format!("Failed to write success marker: {}", e)))?;

    info!("Wrote {} rows to {}", df.height(), part_path.display());
    Ok(part_path)
}

fn prepare_output_dir(output_path: &Path) -> Result<()> {
    let cleared = if output_path.is_dir() {
        fs::remove_dir_all(output_path)
    } else if output_path.exists() {
        fs::remove_file(output_path)
    } else {
        Ok(())
    };
    cleared.map_err(|e| {
        FlattenError::OutputWrite(format!("Failed to clear {}: {}", output_path.display(), e))
    })?;
    debug!("Overwriting output at {}", output_path.display());

    fs::create_dir_all(output_path).map_err(|e| {
        FlattenError::OutputWrite(format!("Failed to create {}: {}", output_path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{NamedFrom, Series};
    use tempfile::TempDir;

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Series::new("a_b", &[1i32, 1]),
            Series::new("a_c", &[Some(10i32), None]),
        ])
        .unwrap()
    }

    #[test]
    fn test_csv_has_header_and_empty_nulls() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");

        let part = write_output(&mut frame(), &out, OutputFormat::Csv).unwrap();
        assert_eq!(part, out.join("part-00000.csv"));
        assert!(out.join(SUCCESS_MARKER).exists());

        let content = fs::read_to_string(part).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["a_b,a_c", "1,10", "1,"]);
    }

    #[test]
    fn test_json_lines() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");

        let part = write_output(&mut frame(), &out, OutputFormat::Json).unwrap();
        let rows: Vec<serde_json::Value> = fs::read_to_string(part)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], serde_json::json!({"a_b": 1, "a_c": 10}));
        assert_eq!(rows[1]["a_c"], serde_json::Value::Null);
    }

    #[test]
    fn test_existing_output_is_replaced() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("stale.txt"), "old").unwrap();

        write_output(&mut frame(), &out, OutputFormat::Json).unwrap();
        assert!(!out.join("stale.txt").exists());

        // a plain file at the destination is replaced by the output directory
        let file_out = dir.path().join("file_out");
        fs::write(&file_out, "old").unwrap();
        write_output(&mut frame(), &file_out, OutputFormat::Csv).unwrap();
        assert!(file_out.join("part-00000.csv").exists());
    }
}
