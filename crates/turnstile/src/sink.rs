//! The writable-response capability shared by real transports and captures.

use http::{HeaderName, HeaderValue, StatusCode};

use crate::SinkError;

/// Where a handler writes its response.
///
/// A handler cannot tell whether it is talking to the client connection or
/// to an in-memory [`ResponseCapture`](crate::ResponseCapture).
pub trait ResponseSink {
    /// Add a header value. Repeated names keep every value in call order.
    fn append_header(&mut self, name: HeaderName, value: HeaderValue);

    fn set_status(&mut self, status: StatusCode);

    /// Append a chunk to the body.
    fn write_body(&mut self, chunk: &[u8]) -> Result<(), SinkError>;
}
