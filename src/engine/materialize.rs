//! Materialization - Evaluates flat columns against the source frame and
//! expands list columns into rows

use crate::config::ExplodeMode;
use crate::error::{FlattenError, Result};
use crate::flatten::FlatColumn;
use crate::schema::{FieldType, ScalarType};
use polars::prelude::{col, lit, DataFrame, DataType, Expr, IntoLazy};
use tracing::debug;

/// Logical types written as their ISO text form
const TEMPORAL_LOGICAL_TYPES: &[&str] = &[
    "date",
    "time-millis",
    "time-micros",
    "timestamp-millis",
    "timestamp-micros",
];

/// Select every flat column, then explode list columns one after another.
///
/// Exploding sequentially means a row holding two independent lists of
/// lengths K and M yields K x M rows. Each leaf is finally resolved to its
/// declared type, so promoted primitives take the declared width, enums become
/// their symbol, and `bytes`/`fixed` are base64 text.
pub fn materialize(df: DataFrame, columns: &[FlatColumn], mode: ExplodeMode) -> Result<DataFrame> {
    if columns.is_empty() {
        return Err(FlattenError::Engine("Schema has no leaf columns to select".to_string()));
    }

    let exprs: Vec<Expr> = columns.iter().map(FlatColumn::expr).collect();
    let mut lf = df.lazy().select(exprs);

    for column in columns.iter().filter(|c| c.is_exploded()) {
        debug!("Exploding {} ({:?})", column.flat_name, mode);
        if mode == ExplodeMode::Inner {
            // null and empty lists produce no rows
            lf = lf.filter(col(&column.flat_name).list().len().gt(lit(0)));
        }
        lf = lf.explode([col(&column.flat_name)]);
    }

    let resolved: Vec<Expr> = columns.iter().map(resolve_leaf).collect();
    lf.select(resolved)
        .collect()
        .map_err(|e| FlattenError::Engine(format!("Failed to materialize flattened frame: {}", e)))
}

/// Cast the exploded leaf to the dtype its declared type resolves to
fn resolve_leaf(column: &FlatColumn) -> Expr {
    let value = col(&column.flat_name);
    let resolved = match column.output_field().field_type {
        FieldType::Scalar(scalar) => resolve_scalar(value, &scalar),
        _ => value,
    };
    resolved.alias(&column.flat_name)
}

fn resolve_scalar(value: Expr, scalar: &ScalarType) -> Expr {
    match scalar {
        ScalarType::Boolean => value.cast(DataType::Boolean),
        ScalarType::Int => value.cast(DataType::Int32),
        ScalarType::Long => value.cast(DataType::Int64),
        ScalarType::Float => value.cast(DataType::Float32),
        ScalarType::Double => value.cast(DataType::Float64),
        ScalarType::String | ScalarType::Enum { .. } => value.cast(DataType::String),
        ScalarType::Bytes | ScalarType::Fixed { .. } => value
            .cast(DataType::Binary)
            .binary()
            .base64_encode()
            .cast(DataType::String),
        ScalarType::Logical { logical_type, .. } if TEMPORAL_LOGICAL_TYPES.contains(&logical_type.as_str()) => {
            value.cast(DataType::String)
        }
        ScalarType::Logical { base, .. } => resolve_scalar(value, base),
        ScalarType::Null | ScalarType::Map(_) | ScalarType::Union(_) => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten_schema;
    use crate::schema::{Field, FieldType, ScalarType, Schema};
    use polars::prelude::{NamedFrom, Series, StructChunked, IntoSeries, DataType};

    fn int_list(name: &str, rows: &[&[i32]]) -> Series {
        let rows: Vec<Series> = rows
            .iter()
            .map(|r| if r.is_empty() { Series::new_empty("", &DataType::Int32) } else { Series::new("", *r) })
            .collect();
        Series::new(name, rows)
    }

    fn i32_values(df: &DataFrame, name: &str) -> Vec<Option<i32>> {
        df.column(name).unwrap().i32().unwrap().into_iter().collect()
    }

    fn scenario_schema() -> Schema {
        Schema::new(vec![Field::record(
            "a",
            Schema::new(vec![
                Field::scalar("b", ScalarType::Int),
                Field::list("c", FieldType::Scalar(ScalarType::Int)),
            ]),
        )])
    }

    fn scenario_frame(lists: &[&[i32]]) -> DataFrame {
        let b = Series::new("b", (1..=lists.len() as i32).collect::<Vec<_>>());
        let c = int_list("c", lists);
        let a = StructChunked::new("a", &[b, c]).unwrap().into_series();
        DataFrame::new(vec![a]).unwrap()
    }

    #[test]
    fn test_list_elements_become_rows() {
        let columns = flatten_schema(&scenario_schema()).unwrap();
        let df = materialize(scenario_frame(&[&[10, 20]]), &columns, ExplodeMode::Inner).unwrap();

        assert_eq!(df.get_column_names(), vec!["a_b", "a_c"]);
        assert_eq!(i32_values(&df, "a_b"), vec![Some(1), Some(1)]);
        assert_eq!(i32_values(&df, "a_c"), vec![Some(10), Some(20)]);
    }

    #[test]
    fn test_row_count_matches_list_length() {
        let columns = flatten_schema(&scenario_schema()).unwrap();
        let df = materialize(scenario_frame(&[&[1, 2, 3], &[4]]), &columns, ExplodeMode::Inner).unwrap();
        assert_eq!(df.height(), 4);
        assert_eq!(i32_values(&df, "a_b"), vec![Some(1), Some(1), Some(1), Some(2)]);
    }

    #[test]
    fn test_empty_list_drops_row_unless_outer() {
        let columns = flatten_schema(&scenario_schema()).unwrap();

        let inner = materialize(scenario_frame(&[&[10], &[]]), &columns, ExplodeMode::Inner).unwrap();
        assert_eq!(i32_values(&inner, "a_b"), vec![Some(1)]);

        let outer = materialize(scenario_frame(&[&[10], &[]]), &columns, ExplodeMode::Outer).unwrap();
        assert_eq!(i32_values(&outer, "a_b"), vec![Some(1), Some(2)]);
        assert_eq!(i32_values(&outer, "a_c"), vec![Some(10), None]);
    }

    #[test]
    fn test_independent_lists_cross_product() {
        let schema = Schema::new(vec![
            Field::scalar("id", ScalarType::Int),
            Field::list("x", FieldType::Scalar(ScalarType::Int)),
            Field::list("y", FieldType::Scalar(ScalarType::Int)),
        ]);
        let df = DataFrame::new(vec![
            Series::new("id", &[1i32]),
            int_list("x", &[&[1, 2]]),
            int_list("y", &[&[7, 8, 9]]),
        ])
        .unwrap();

        let columns = flatten_schema(&schema).unwrap();
        let out = materialize(df, &columns, ExplodeMode::Inner).unwrap();
        assert_eq!(out.height(), 6);
        assert_eq!(i32_values(&out, "x"), vec![Some(1), Some(1), Some(1), Some(2), Some(2), Some(2)]);
        assert_eq!(i32_values(&out, "y"), vec![Some(7), Some(8), Some(9), Some(7), Some(8), Some(9)]);
    }

    #[test]
    fn test_flat_frame_passes_through() {
        let schema = Schema::new(vec![Field::scalar("id", ScalarType::Int), Field::scalar("v", ScalarType::Int)]);
        let df = DataFrame::new(vec![Series::new("v", &[3i32, 4]), Series::new("id", &[1i32, 2])]).unwrap();
        let out = materialize(df, &flatten_schema(&schema).unwrap(), ExplodeMode::Inner).unwrap();
        assert_eq!(out.get_column_names(), vec!["id", "v"]);
        assert_eq!(i32_values(&out, "v"), vec![Some(3), Some(4)]);
    }

    #[test]
    fn test_leaves_take_declared_types() {
        let schema = Schema::new(vec![
            Field::scalar("x", ScalarType::Double),
            Field::scalar("payload", ScalarType::Bytes),
            Field::list("ids", FieldType::Scalar(ScalarType::Long)),
        ]);
        let payload: Vec<&[u8]> = vec![b"hi"];
        let df = DataFrame::new(vec![
            Series::new("x", &[5i32]),
            Series::new("payload", payload),
            Series::new("ids", &[Series::new("", &[1i32, 2])]),
        ])
        .unwrap();

        let out = materialize(df, &flatten_schema(&schema).unwrap(), ExplodeMode::Inner).unwrap();
        assert_eq!(out.column("x").unwrap().dtype(), &DataType::Float64);
        assert_eq!(out.column("x").unwrap().f64().unwrap().get(0), Some(5.0));
        assert_eq!(out.column("ids").unwrap().dtype(), &DataType::Int64);
        assert_eq!(out.column("payload").unwrap().str().unwrap().get(0), Some("aGk="));
    }

    #[test]
    fn test_no_columns_is_an_error() {
        let df = DataFrame::new(vec![Series::new("id", &[1i32])]).unwrap();
        assert!(materialize(df, &[], ExplodeMode::Inner).is_err());
    }
}
