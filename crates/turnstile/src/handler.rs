use bytes::Bytes;
use http::Request;

use crate::ResponseSink;

/// Application request-processing logic.
///
/// Handlers are synchronous: the caller waits for `serve` to return before
/// doing anything with what was written.
pub trait Handler: Send + Sync {
    fn serve(&self, request: &Request<Bytes>, sink: &mut dyn ResponseSink);
}

impl<F> Handler for F
where
    F: Fn(&Request<Bytes>, &mut dyn ResponseSink) + Send + Sync,
{
    fn serve(&self, request: &Request<Bytes>, sink: &mut dyn ResponseSink) {
        self(request, sink)
    }
}

/// Pin a closure to the handler signature so its argument types are inferred.
///
/// ```ignore
/// let hello = handler_fn(|_req, sink| {
///     let _ = sink.write_body(b"hello");
/// });
/// ```
pub fn handler_fn<F>(f: F) -> F
where
    F: Fn(&Request<Bytes>, &mut dyn ResponseSink) + Send + Sync,
{
    f
}
