use anyhow::{Context, Result};
use avro_flatten::config::{ExplodeMode, OutputFormat, RunConfig};
use avro_flatten::engine::FlattenSession;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "avro-flatten")]
#[command(about = "Flatten an Avro file into CSV or JSON using its schema")]
struct Args {
    /// Path to input AVRO file
    #[arg(long = "input_path")]
    input_path: PathBuf,

    /// Path to AVRO schema file (AVSC)
    #[arg(long = "schema_path")]
    schema_path: PathBuf,

    /// Path to output folder
    #[arg(long = "output_path")]
    output_path: PathBuf,

    /// Output format
    #[arg(long = "output_format", value_enum, ignore_case = true, default_value_t = OutputFormat::Json)]
    output_format: OutputFormat,

    /// Keep rows whose arrays are null or empty, with a null in the exploded column
    #[arg(long = "keep_empty_lists")]
    keep_empty_lists: bool,
}

impl From<Args> for RunConfig {
    fn from(args: Args) -> Self {
        let explode_mode = if args.keep_empty_lists {
            ExplodeMode::Outer
        } else {
            ExplodeMode::Inner
        };
        RunConfig::new(args.input_path, args.schema_path, args.output_path)
            .with_output_format(args.output_format)
            .with_explode_mode(explode_mode)
    }
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let session = FlattenSession::new(args.into());

    let summary = session
        .run()
        .with_context(|| format!("Failed to flatten {}", session.config().input_path.display()))?;

    info!(
        "Flattened {} input rows into {} rows x {} columns",
        summary.input_rows,
        summary.output_rows,
        summary.columns.len()
    );
    info!("Output written to {}", summary.part_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATHS: [&str; 7] = [
        "avro-flatten",
        "--input_path",
        "in.avro",
        "--schema_path",
        "in.avsc",
        "--output_path",
        "out",
    ];

    fn parse(extra: &[&str]) -> RunConfig {
        let argv: Vec<&str> = PATHS.iter().chain(extra).copied().collect();
        Args::try_parse_from(argv).unwrap().into()
    }

    #[test]
    fn test_defaults_to_json_and_inner_explode() {
        let config = parse(&[]);
        assert_eq!(config.output_format, OutputFormat::Json);
        assert_eq!(config.explode_mode, ExplodeMode::Inner);
        assert_eq!(config.output_path, PathBuf::from("out"));
    }

    #[test]
    fn test_output_format_ignores_case() {
        assert_eq!(parse(&["--output_format", "CSV"]).output_format, OutputFormat::Csv);
        assert_eq!(parse(&["--output_format", "Json"]).output_format, OutputFormat::Json);
        assert!(Args::try_parse_from(PATHS.iter().chain(&["--output_format", "parquet"]).copied()).is_err());
    }

    #[test]
    fn test_keep_empty_lists_selects_outer_explode() {
        assert_eq!(parse(&["--keep_empty_lists"]).explode_mode, ExplodeMode::Outer);
    }

    #[test]
    fn test_paths_are_required() {
        assert!(Args::try_parse_from(["avro-flatten", "--input_path", "in.avro"]).is_err());
    }
}
