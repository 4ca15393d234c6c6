//! Schema Loader - Reads an Avro `.avsc` document into a [`Schema`]
//!
//! Named types (`record`, `enum`, `fixed`) are registered under their
//! fullname as they are defined and may be referenced by name afterwards.

use crate::error::{FlattenError, Result};
use crate::schema::{Field, FieldType, ScalarType, Schema};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::debug;

/// Read and parse a schema file, failing before any data is touched
pub fn load_schema(path: impl AsRef<Path>) -> Result<Schema> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        FlattenError::SchemaLoad(format!("Failed to read schema file {}: {}", path.display(), e))
    })?;
    let schema = parse_schema(&content)?;
    debug!(
        "Loaded schema {} from {} ({} top-level fields, {} leaves)",
        schema.fullname().unwrap_or_default(),
        path.display(),
        schema.fields.len(),
        schema.leaf_count()
    );
    Ok(schema)
}

pub fn parse_schema(content: &str) -> Result<Schema> {
    let doc: Value = serde_json::from_str(content)
        .map_err(|e| FlattenError::SchemaLoad(format!("Invalid JSON in schema: {}", e)))?;
    Schema::from_avro(&doc)
}

impl Schema {
    /// Build a schema from a parsed Avro schema document. The root must be a record.
    pub fn from_avro(doc: &Value) -> Result<Schema> {
        let mut parser = AvroSchemaParser::default();
        let (root, _) = parser.parse_type(doc, None)?;
        match root {
            FieldType::Record(schema) => Ok(schema),
            other => Err(FlattenError::SchemaLoad(format!(
                "Top-level schema must be a record, found {}",
                describe(&other)
            ))),
        }
    }
}

#[derive(Default)]
struct AvroSchemaParser {
    named: HashMap<String, FieldType>,
    /// Records whose fields are still being parsed
    in_progress: HashSet<String>,
}

impl AvroSchemaParser {
    /// Returns the parsed type and whether it was a nullable union
    fn parse_type(&mut self, value: &Value, namespace: Option<&str>) -> Result<(FieldType, bool)> {
        match value {
            Value::String(name) => Ok((self.parse_named_or_primitive(name, namespace)?, false)),
            Value::Array(branches) => self.parse_union(branches, namespace),
            Value::Object(obj) => Ok((self.parse_complex(obj, namespace)?, false)),
            other => Err(FlattenError::SchemaLoad(format!("Invalid type definition: {}", other))),
        }
    }

    fn parse_named_or_primitive(&self, name: &str, namespace: Option<&str>) -> Result<FieldType> {
        if let Some(scalar) = primitive(name) {
            return Ok(FieldType::Scalar(scalar));
        }

        let candidates = match namespace {
            Some(ns) if !name.contains('.') && !ns.is_empty() => vec![format!("{}.{}", ns, name), name.to_string()],
            _ => vec![name.to_string()],
        };

        for candidate in &candidates {
            if self.in_progress.contains(candidate) {
                return Err(FlattenError::SchemaLoad(format!(
                    "Recursive type '{}' cannot be flattened",
                    candidate
                )));
            }
            if let Some(resolved) = self.named.get(candidate) {
                return Ok(resolved.clone());
            }
        }

        Err(FlattenError::SchemaLoad(format!("Unknown type reference '{}'", name)))
    }

    fn parse_union(&mut self, branches: &[Value], namespace: Option<&str>) -> Result<(FieldType, bool)> {
        let mut has_null = false;
        let mut non_null = Vec::new();

        for branch in branches {
            if matches!(branch, Value::Array(_)) {
                return Err(FlattenError::SchemaLoad("Unions may not immediately contain other unions".to_string()));
            }
            let (branch_type, _) = self.parse_type(branch, namespace)?;
            if branch_type == FieldType::Scalar(ScalarType::Null) {
                has_null = true;
            } else {
                non_null.push(branch_type);
            }
        }

        match non_null.len() {
            0 if has_null => Ok((FieldType::Scalar(ScalarType::Null), true)),
            0 => Err(FlattenError::SchemaLoad("Union must have at least one branch".to_string())),
            1 => Ok((non_null.remove(0), has_null)),
            _ => Ok((FieldType::Scalar(ScalarType::Union(non_null)), has_null)),
        }
    }

    fn parse_complex(&mut self, obj: &Map<String, Value>, namespace: Option<&str>) -> Result<FieldType> {
        let type_value = obj
            .get("type")
            .ok_or_else(|| FlattenError::SchemaLoad("Type definition is missing 'type'".to_string()))?;

        let type_name = match type_value {
            Value::String(s) => s.as_str(),
            // {"type": {"type": "array", ...}} and {"type": [..]} wrap another definition
            nested => return Ok(self.parse_type(nested, namespace)?.0),
        };

        match type_name {
            "record" | "error" => self.parse_record(obj, namespace),
            "enum" => {
                let (fullname, _) = self.qualify(obj, namespace)?;
                let symbols = obj
                    .get("symbols")
                    .and_then(Value::as_array)
                    .ok_or_else(|| FlattenError::SchemaLoad(format!("Enum '{}' is missing 'symbols'", fullname)))?
                    .iter()
                    .map(|s| {
                        s.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| FlattenError::SchemaLoad(format!("Enum '{}' has a non-string symbol", fullname)))
                    })
                    .collect::<Result<Vec<_>>>()?;
                let enum_type = FieldType::Scalar(ScalarType::Enum {
                    name: fullname.clone(),
                    symbols,
                });
                self.register(fullname, enum_type.clone())?;
                Ok(enum_type)
            }
            "fixed" => {
                let (fullname, _) = self.qualify(obj, namespace)?;
                let size = obj
                    .get("size")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| FlattenError::SchemaLoad(format!("Fixed '{}' is missing 'size'", fullname)))?;
                let fixed = with_logical_type(
                    obj,
                    ScalarType::Fixed {
                        name: fullname.clone(),
                        size: size as usize,
                    },
                );
                self.register(fullname, fixed.clone())?;
                Ok(fixed)
            }
            "array" => {
                let items = obj
                    .get("items")
                    .ok_or_else(|| FlattenError::SchemaLoad("Array is missing 'items'".to_string()))?;
                let (element, _) = self.parse_type(items, namespace)?;
                Ok(FieldType::List(Box::new(element)))
            }
            "map" => {
                let values = obj
                    .get("values")
                    .ok_or_else(|| FlattenError::SchemaLoad("Map is missing 'values'".to_string()))?;
                let (value_type, _) = self.parse_type(values, namespace)?;
                Ok(FieldType::Scalar(ScalarType::Map(Box::new(value_type))))
            }
            other => match primitive(other) {
                Some(scalar) => Ok(with_logical_type(obj, scalar)),
                None => Ok(self.parse_named_or_primitive(other, namespace)?),
            },
        }
    }

    fn parse_record(&mut self, obj: &Map<String, Value>, namespace: Option<&str>) -> Result<FieldType> {
        let (fullname, record_ns) = self.qualify(obj, namespace)?;
        if self.named.contains_key(&fullname) || self.in_progress.contains(&fullname) {
            return Err(FlattenError::SchemaLoad(format!("Type '{}' is defined more than once", fullname)));
        }

        let field_defs = obj
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| FlattenError::SchemaLoad(format!("Record '{}' is missing 'fields'", fullname)))?;

        self.in_progress.insert(fullname.clone());
        let mut fields: Vec<Field> = Vec::with_capacity(field_defs.len());
        for def in field_defs {
            let def = def
                .as_object()
                .ok_or_else(|| FlattenError::SchemaLoad(format!("Record '{}' has a non-object field", fullname)))?;
            let name = def
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| FlattenError::SchemaLoad(format!("Record '{}' has a field without a name", fullname)))?;
            if fields.iter().any(|f| f.name == name) {
                return Err(FlattenError::SchemaLoad(format!(
                    "Record '{}' declares field '{}' more than once",
                    fullname, name
                )));
            }
            let type_def = def.get("type").ok_or_else(|| {
                FlattenError::SchemaLoad(format!("Field '{}.{}' is missing 'type'", fullname, name))
            })?;
            let (field_type, nullable) = self.parse_type(type_def, record_ns.as_deref())?;
            fields.push(Field {
                name: name.to_string(),
                field_type,
                nullable,
                doc: def.get("doc").and_then(Value::as_str).map(str::to_string),
            });
        }
        self.in_progress.remove(&fullname);

        let short_name = fullname.rsplit('.').next().unwrap_or(&fullname).to_string();
        let record = FieldType::Record(Schema {
            name: Some(short_name),
            namespace: record_ns,
            fields,
        });
        self.register(fullname, record.clone())?;
        Ok(record)
    }

    /// Resolve the fullname and namespace of a named type
    fn qualify(&self, obj: &Map<String, Value>, namespace: Option<&str>) -> Result<(String, Option<String>)> {
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| FlattenError::SchemaLoad("Named type is missing 'name'".to_string()))?;

        if let Some((ns, _)) = name.rsplit_once('.') {
            return Ok((name.to_string(), Some(ns.to_string())));
        }

        let ns = obj
            .get("namespace")
            .and_then(Value::as_str)
            .or(namespace)
            .filter(|ns| !ns.is_empty());

        match ns {
            Some(ns) => Ok((format!("{}.{}", ns, name), Some(ns.to_string()))),
            None => Ok((name.to_string(), None)),
        }
    }

    fn register(&mut self, fullname: String, field_type: FieldType) -> Result<()> {
        if self.named.insert(fullname.clone(), field_type).is_some() {
            return Err(FlattenError::SchemaLoad(format!("Type '{}' is defined more than once", fullname)));
        }
        Ok(())
    }
}

fn primitive(name: &str) -> Option<ScalarType> {
    match name {
        "null" => Some(ScalarType::Null),
        "boolean" => Some(ScalarType::Boolean),
        "int" => Some(ScalarType::Int),
        "long" => Some(ScalarType::Long),
        "float" => Some(ScalarType::Float),
        "double" => Some(ScalarType::Double),
        "bytes" => Some(ScalarType::Bytes),
        "string" => Some(ScalarType::String),
        _ => None,
    }
}

fn with_logical_type(obj: &Map<String, Value>, base: ScalarType) -> FieldType {
    match obj.get("logicalType").and_then(Value::as_str) {
        Some(logical_type) => FieldType::Scalar(ScalarType::Logical {
            base: Box::new(base),
            logical_type: logical_type.to_string(),
        }),
        None => FieldType::Scalar(base),
    }
}

fn describe(field_type: &FieldType) -> String {
    match field_type {
        FieldType::Scalar(scalar) => format!("{:?}", scalar).to_lowercase(),
        FieldType::Record(_) => "record".to_string(),
        FieldType::List(_) => "array".to_string(),
    }
}
