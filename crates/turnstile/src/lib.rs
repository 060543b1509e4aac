//! Contract-enforcing HTTP interposer.
//!
//! Wraps an application [`Handler`] so that every request is checked against
//! an OpenAPI contract before the handler sees it and, optionally, every
//! response is checked before the client sees it. Requests that break the
//! contract get a canned error response. With response validation enabled,
//! the handler writes into a [`ResponseCapture`]. A conforming capture is
//! replayed onto the real sink. A non-conforming one is dropped and the
//! canned invalid-response response is sent instead.
//!
//! # Usage
//!
//! ```ignore
//! use turnstile::{handler_fn, server, Interposer, Options};
//!
//! let interposer = Interposer::new(
//!     include_bytes!("petstore.yaml"),
//!     Options::new().with_validate_response(true),
//! )?;
//!
//! let app = interposer.wrap(handler_fn(|req, sink| {
//!     sink.set_status(http::StatusCode::OK);
//!     let _ = sink.write_body(b"[]");
//! }));
//!
//! server::serve(tokio::net::TcpListener::bind("127.0.0.1:8080").await?, app).await;
//! ```

pub mod canned;
pub mod capture;
pub mod config;
pub mod error;
pub mod handler;
pub mod interposer;
pub mod logger;
pub mod server;
pub mod sink;

#[cfg(test)]
mod test_support;

pub use canned::CannedResponse;
pub use capture::ResponseCapture;
pub use config::{resolve, resolve_with, Defaults, EffectiveConfig, Options, ResponseOverride};
pub use error::{ConfigError, SinkError};
pub use handler::{handler_fn, Handler};
pub use interposer::{Interposer, Validated};
pub use logger::Logger;
pub use sink::ResponseSink;

pub use turnstile_validator::{Diagnostic, Specification, ValidationError};
