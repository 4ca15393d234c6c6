use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlattenError {
    #[error("Schema load error: {0}")]
    SchemaLoad(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Duplicate column name '{name}': produced by both '{first}' and '{second}'")]
    DuplicateColumnName {
        name: String,
        first: String,
        second: String,
    },

    #[error("Output write error: {0}")]
    OutputWrite(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FlattenError>;
