//! Avro reader - Loads the input file and conforms it to the declared schema

use crate::error::{FlattenError, Result};
use crate::schema::{FieldType, ScalarType, Schema};
use polars::io::avro::AvroReader;
use polars::prelude::{col, DataFrame, DataType, Expr, IntoLazy, SerReader};
use std::fs::File;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::debug;

/// Logical types the Avro reader maps to dtypes polars cannot hold
const UNSUPPORTED_LOGICAL_TYPES: &[&str] = &["decimal", "duration"];

pub fn read_avro(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)?;
    // polars panics on Avro types it cannot map, including undeclared fields
    let read = panic::catch_unwind(AssertUnwindSafe(|| AvroReader::new(file).finish())).map_err(|_| {
        FlattenError::SchemaMismatch(format!(
            "Failed to read Avro data from {}: the file holds a type the reader does not support",
            path.display()
        ))
    })?;
    let df = read.map_err(|e| {
        FlattenError::SchemaMismatch(format!("Failed to read Avro data from {}: {}", path.display(), e))
    })?;
    debug!("Read {} rows x {} columns from {}", df.height(), df.width(), path.display());
    Ok(df)
}

/// Reject declared types the Avro reader cannot load, before any data is read
pub fn check_supported(schema: &Schema) -> Result<()> {
    for field in &schema.fields {
        check_supported_type(&field.name, &field.field_type)?;
    }
    Ok(())
}

fn check_supported_type(path: &str, field_type: &FieldType) -> Result<()> {
    match field_type {
        FieldType::Record(schema) => {
            for field in &schema.fields {
                check_supported_type(&format!("{}.{}", path, field.name), &field.field_type)?;
            }
            Ok(())
        }
        FieldType::List(element) => check_supported_type(&format!("{}[]", path), element),
        FieldType::Scalar(ScalarType::Map(_)) => Err(FlattenError::SchemaMismatch(format!(
            "Field '{}': map fields are not supported by the reader",
            path
        ))),
        FieldType::Scalar(ScalarType::Union(_)) => Err(FlattenError::SchemaMismatch(format!(
            "Field '{}': unions with more than one non-null branch are not supported by the reader",
            path
        ))),
        FieldType::Scalar(ScalarType::Logical { logical_type, .. })
            if UNSUPPORTED_LOGICAL_TYPES.contains(&logical_type.as_str()) =>
        {
            Err(FlattenError::SchemaMismatch(format!(
                "Field '{}': logical type '{}' is not supported by the reader",
                path, logical_type
            )))
        }
        FieldType::Scalar(_) => Ok(()),
    }
}

/// Check every declared top-level field against the frame and project the
/// frame onto the declared fields, in declaration order.
pub fn conform(df: DataFrame, schema: &Schema) -> Result<DataFrame> {
    for field in &schema.fields {
        let column = df.column(&field.name).map_err(|_| {
            FlattenError::SchemaMismatch(format!("Declared field '{}' not found in input data", field.name))
        })?;
        check_compatible(&field.name, &field.field_type, column.dtype())?;
    }

    let projection: Vec<Expr> = schema.fields.iter().map(|f| col(&f.name)).collect();
    df.lazy()
        .select(projection)
        .collect()
        .map_err(|e| FlattenError::Engine(format!("Failed to project declared fields: {}", e)))
}

fn check_compatible(path: &str, declared: &FieldType, actual: &DataType) -> Result<()> {
    match (declared, actual) {
        (FieldType::Record(schema), DataType::Struct(actual_fields)) => {
            for field in &schema.fields {
                let child_path = format!("{}.{}", path, field.name);
                let actual_field = actual_fields
                    .iter()
                    .find(|f| f.name().as_str() == field.name)
                    .ok_or_else(|| {
                        FlattenError::SchemaMismatch(format!("Declared field '{}' not found in input data", child_path))
                    })?;
                check_compatible(&child_path, &field.field_type, actual_field.data_type())?;
            }
            Ok(())
        }
        (FieldType::List(element), DataType::List(actual_element)) => {
            check_compatible(&format!("{}[]", path), element, actual_element)
        }
        (FieldType::Scalar(scalar), actual) if !is_nested(actual) => {
            if scalar_accepts(scalar, actual) {
                Ok(())
            } else {
                Err(mismatch(path, declared, actual))
            }
        }
        _ => Err(mismatch(path, declared, actual)),
    }
}

fn is_nested(dtype: &DataType) -> bool {
    matches!(dtype, DataType::List(_) | DataType::Struct(_))
}

/// Primitive types follow Avro's promotion rules. Other scalars are left to the reader.
fn scalar_accepts(scalar: &ScalarType, actual: &DataType) -> bool {
    match scalar {
        ScalarType::Boolean => matches!(actual, DataType::Boolean),
        ScalarType::Int => matches!(actual, DataType::Int32),
        ScalarType::Long => matches!(actual, DataType::Int32 | DataType::Int64),
        ScalarType::Float => matches!(actual, DataType::Int32 | DataType::Int64 | DataType::Float32),
        ScalarType::Double => matches!(
            actual,
            DataType::Int32 | DataType::Int64 | DataType::Float32 | DataType::Float64
        ),
        ScalarType::String | ScalarType::Bytes => matches!(actual, DataType::String | DataType::Binary),
        ScalarType::Null => matches!(actual, DataType::Null),
        _ => true,
    }
}

fn mismatch(path: &str, declared: &FieldType, actual: &DataType) -> FlattenError {
    let expected = match declared {
        FieldType::Scalar(scalar) => format!("{:?}", scalar).to_lowercase(),
        FieldType::Record(_) => "record".to_string(),
        FieldType::List(_) => "array".to_string(),
    };
    FlattenError::SchemaMismatch(format!(
        "Field '{}' is declared as {} but the data holds {}",
        path, expected, actual
    ))
}
