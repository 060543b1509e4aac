//! In-memory stand-in for the client connection.

use bytes::BytesMut;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

use crate::{ResponseSink, SinkError};

/// Records what a handler writes without sending any of it.
///
/// One capture serves exactly one request. Nothing reaches a real sink until
/// [`replay`](Self::replay) is called.
#[derive(Debug, Default)]
pub struct ResponseCapture {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last status set, or `None` if the handler never set one.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Write the recorded response onto `sink`: headers (every value, in
    /// order), then status, then body. An unset status is sent as 200.
    ///
    /// Transport errors are returned as-is; nothing is retried.
    pub fn replay(self, sink: &mut dyn ResponseSink) -> Result<(), SinkError> {
        for (name, value) in &self.headers {
            sink.append_header(name.clone(), value.clone());
        }
        sink.set_status(self.status.unwrap_or(StatusCode::OK));
        sink.write_body(&self.body)
    }
}

impl ResponseSink for ResponseCapture {
    fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.append(name, value);
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    fn write_body(&mut self, chunk: &[u8]) -> Result<(), SinkError> {
        self.body.extend_from_slice(chunk);
        Ok(())
    }
}
