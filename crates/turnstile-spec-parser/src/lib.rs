//! OpenAPI 3.x contract loader.
//!
//! Reads YAML/JSON contracts and extracts, per operation, everything needed
//! to check a request or a response against it: parameters, request body,
//! and declared responses. Local `$ref` pointers are inlined while parsing so
//! downstream consumers never see a reference.

pub mod error;
pub mod model;
pub mod parser;

pub use error::ParseError;
pub use model::{
    ApiSpec, ContentSchema, Operation, Parameter, RequestBody, ResponseHeader, ResponseSpec,
};
pub use parser::{parse_spec, parse_spec_file};
