//! Schema Flattener - Turns a nested schema into flat, uniquely named columns
//!
//! The walk is depth-first and pre-order. Records contribute their leaves,
//! lists are terminal and marked for row-wise expansion, scalars are plain
//! value reads. `a.b.c` is emitted as column `a_b_c`.

use crate::error::{FlattenError, Result};
use crate::schema::{Field, FieldType, Schema};
use polars::prelude::{col, Expr};
use std::collections::HashMap;

const PATH_SEPARATOR: &str = ".";
const FLAT_SEPARATOR: &str = "_";

/// How a flat column is read from the source frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnAccess {
    /// Plain value read
    Value,
    /// One output row per list element
    Explode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatColumn {
    /// Dot-joined path from the root, e.g. `a.b`
    pub qualified_name: String,
    /// Output column name, e.g. `a_b`
    pub flat_name: String,
    pub path: Vec<String>,
    pub access: ColumnAccess,
    /// Declared type of the leaf (the list type itself for exploded columns)
    pub field_type: FieldType,
    /// The leaf or one of its enclosing records is nullable
    pub nullable: bool,
}

impl FlatColumn {
    fn new(path: Vec<String>, field: &Field, access: ColumnAccess, nullable: bool) -> Self {
        let qualified_name = path.join(PATH_SEPARATOR);
        let flat_name = path.join(FLAT_SEPARATOR);
        Self {
            qualified_name,
            flat_name,
            path,
            access,
            field_type: field.field_type.clone(),
            nullable,
        }
    }

    pub fn is_exploded(&self) -> bool {
        self.access == ColumnAccess::Explode
    }

    /// Expression reading this leaf from the source frame, aliased to the flat name.
    /// Exploding happens separately, after every column has been selected.
    pub fn expr(&self) -> Expr {
        let expr = match self.path.split_first() {
            Some((root, rest)) => rest
                .iter()
                .fold(col(root), |expr, segment| expr.struct_().field_by_name(segment)),
            None => col(&self.flat_name),
        };
        expr.alias(&self.flat_name)
    }

    /// The column as it appears in the output table. Exploded lists carry
    /// their element type.
    pub fn output_field(&self) -> Field {
        let field_type = match (&self.access, &self.field_type) {
            (ColumnAccess::Explode, FieldType::List(element)) => (**element).clone(),
            (_, field_type) => field_type.clone(),
        };
        Field {
            name: self.flat_name.clone(),
            field_type,
            nullable: self.nullable || self.is_exploded(),
            doc: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaFlattener;

impl SchemaFlattener {
    pub fn new() -> Self {
        Self
    }

    /// Flatten `schema` into its ordered leaf columns.
    ///
    /// Fails with [`FlattenError::DuplicateColumnName`] when two distinct
    /// paths map to the same flat name (`a.b` and `a_b`).
    pub fn flatten(&self, schema: &Schema) -> Result<Vec<FlatColumn>> {
        let mut columns = Vec::with_capacity(schema.leaf_count());
        self.collect(schema, &[], false, &mut columns);

        let mut seen: HashMap<&str, &str> = HashMap::with_capacity(columns.len());
        for column in &columns {
            if let Some(first) = seen.insert(&column.flat_name, &column.qualified_name) {
                return Err(FlattenError::DuplicateColumnName {
                    name: column.flat_name.clone(),
                    first: first.to_string(),
                    second: column.qualified_name.clone(),
                });
            }
        }

        Ok(columns)
    }

    fn collect(&self, schema: &Schema, prefix: &[String], parent_nullable: bool, out: &mut Vec<FlatColumn>) {
        for field in &schema.fields {
            let mut path = prefix.to_vec();
            path.push(field.name.clone());
            let nullable = parent_nullable || field.nullable;

            match &field.field_type {
                FieldType::Record(nested) => self.collect(nested, &path, nullable, out),
                FieldType::List(_) => out.push(FlatColumn::new(path, field, ColumnAccess::Explode, nullable)),
                FieldType::Scalar(_) => out.push(FlatColumn::new(path, field, ColumnAccess::Value, nullable)),
            }
        }
    }
}

pub fn flatten_schema(schema: &Schema) -> Result<Vec<FlatColumn>> {
    SchemaFlattener::new().flatten(schema)
}

/// Schema of the materialized output table
pub fn output_schema(columns: &[FlatColumn]) -> Schema {
    Schema::new(columns.iter().map(FlatColumn::output_field).collect())
}
