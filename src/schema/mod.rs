//! Schema Model - Nested record description driving the flattener
//!
//! A [`Schema`] is the ordered field list of one record. Every field is
//! either a scalar, a nested record, or a list of some element type.

pub mod loader;

pub use loader::{load_schema, parse_schema};

/// Ordered fields of one record
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    /// Record name when loaded from a named Avro record
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    /// True when the declared type was a union of `null` and one other branch
    pub nullable: bool,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Scalar(ScalarType),
    Record(Schema),
    /// Element type of the array
    List(Box<FieldType>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScalarType {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Enum { name: String, symbols: Vec<String> },
    Fixed { name: String, size: usize },
    /// Maps are terminal, the flattener never expands them
    Map(Box<FieldType>),
    /// A primitive annotated with a `logicalType`
    Logical { base: Box<ScalarType>, logical_type: String },
    /// A union with more than one non-null branch
    Union(Vec<FieldType>),
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            name: None,
            namespace: None,
            fields,
        }
    }

    pub fn named(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: Some(name.into()),
            namespace: None,
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Number of scalar and list leaves below this record
    pub fn leaf_count(&self) -> usize {
        self.fields
            .iter()
            .map(|f| match &f.field_type {
                FieldType::Record(nested) => nested.leaf_count(),
                _ => 1,
            })
            .sum()
    }

    /// Record nesting depth, 1 for a record without nested records
    pub fn depth(&self) -> usize {
        1 + self
            .fields
            .iter()
            .filter_map(|f| match &f.field_type {
                FieldType::Record(nested) => Some(nested.depth()),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// `namespace.name`, or just the name without a namespace
    pub fn fullname(&self) -> Option<String> {
        match (&self.namespace, &self.name) {
            (Some(ns), Some(name)) if !ns.is_empty() => Some(format!("{}.{}", ns, name)),
            (_, Some(name)) => Some(name.clone()),
            _ => None,
        }
    }
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
            doc: None,
        }
    }

    pub fn scalar(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self::new(name, FieldType::Scalar(scalar))
    }

    pub fn record(name: impl Into<String>, schema: Schema) -> Self {
        Self::new(name, FieldType::Record(schema))
    }

    pub fn list(name: impl Into<String>, element: FieldType) -> Self {
        Self::new(name, FieldType::List(Box::new(element)))
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

impl FieldType {
    pub fn is_record(&self) -> bool {
        matches!(self, FieldType::Record(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, FieldType::List(_))
    }
}
