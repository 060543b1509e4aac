use thiserror::Error;

/// Errors produced while loading a contract document.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document is not an OpenAPI 3.x contract.
    #[error("not a valid OpenAPI 3.x contract")]
    UnknownFormat,

    /// YAML/JSON syntax error.
    #[error("parse error: {0}")]
    ParseError(String),

    /// A local `$ref` points nowhere.
    #[error("unresolved $ref: {0}")]
    UnresolvedRef(String),

    /// Structurally invalid contract.
    #[error("schema error: {0}")]
    SchemaError(String),

    /// I/O error reading the contract file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
