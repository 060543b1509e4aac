use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

use crate::{ResponseSink, SinkError};

/// A fixed response written in place of anything the handler produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CannedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CannedResponse {
    /// An empty response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// The standard answer to a request the contract rejects.
    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST)
    }

    /// The standard answer when the handler's own response breaks the contract.
    pub fn internal_server_error() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Write headers, then status, then body.
    pub fn write_to(&self, sink: &mut dyn ResponseSink) -> Result<(), SinkError> {
        for (name, value) in &self.headers {
            sink.append_header(name.clone(), value.clone());
        }
        sink.set_status(self.status);
        sink.write_body(&self.body)
    }
}
