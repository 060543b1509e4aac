//! Serving a [`Handler`] over HTTP/1 with hyper.
//!
//! Handlers are synchronous, so each request runs on tokio's blocking pool.
//! What the handler writes is streamed back as it is written: the response
//! head goes out on the first body write (or when the handler returns) and
//! every body chunk is forwarded immediately.

use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode};
use http_body_util::{combinators::UnsyncBoxBody, BodyExt, Full, StreamBody};
use hyper::body::{Body, Frame};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};

use turnstile_telemetry::{log_connection_error, log_handler_panicked, log_request_body_failed};

use crate::{Handler, ResponseSink, SinkError};

/// Response body produced by [`handle`].
pub type ResponseBody = UnsyncBoxBody<Bytes, Infallible>;

/// Body chunks buffered between the handler thread and the connection.
const BODY_CHANNEL_CAPACITY: usize = 16;

struct Head {
    status: StatusCode,
    headers: HeaderMap,
}

/// The real sink for one HTTP response.
///
/// Status and headers are buffered until the head is committed; after that
/// they are ignored, as on any HTTP response writer.
pub struct StreamingSink {
    status: StatusCode,
    headers: HeaderMap,
    head_tx: Option<oneshot::Sender<Head>>,
    body_tx: mpsc::Sender<Bytes>,
}

impl StreamingSink {
    fn new(head_tx: oneshot::Sender<Head>, body_tx: mpsc::Sender<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            head_tx: Some(head_tx),
            body_tx,
        }
    }

    /// Send the head if it has not gone out yet. `false` if the client is gone.
    fn commit(&mut self) -> bool {
        match self.head_tx.take() {
            Some(head_tx) => head_tx
                .send(Head {
                    status: self.status,
                    headers: std::mem::take(&mut self.headers),
                })
                .is_ok(),
            None => !self.body_tx.is_closed(),
        }
    }

    pub fn is_committed(&self) -> bool {
        self.head_tx.is_none()
    }
}

impl ResponseSink for StreamingSink {
    fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        if !self.is_committed() {
            self.headers.append(name, value);
        }
    }

    fn set_status(&mut self, status: StatusCode) {
        if !self.is_committed() {
            self.status = status;
        }
    }

    fn write_body(&mut self, chunk: &[u8]) -> Result<(), SinkError> {
        if !self.commit() {
            return Err(SinkError::Closed);
        }
        if chunk.is_empty() {
            return Ok(());
        }
        self.body_tx
            .blocking_send(Bytes::copy_from_slice(chunk))
            .map_err(|_| SinkError::Closed)
    }
}

impl Drop for StreamingSink {
    fn drop(&mut self) {
        // A panicking handler leaves the head uncommitted so the caller answers 500
        if !std::thread::panicking() {
            self.commit();
        }
    }
}

fn plain_response(status: StatusCode, message: &'static str) -> Response<ResponseBody> {
    let body = Full::new(Bytes::from_static(message.as_bytes())).boxed_unsync();
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
}

/// Run `handler` for one request and stream its output back.
pub async fn handle<H, B>(handler: Arc<H>, request: Request<B>) -> Response<ResponseBody>
where
    H: Handler + 'static,
    B: Body,
    B::Error: Display,
{
    let (parts, body) = request.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            log_request_body_failed!(error = %e);
            return plain_response(StatusCode::BAD_REQUEST, "failed to read request body");
        }
    };
    let request = Request::from_parts(parts, body);

    let (head_tx, head_rx) = oneshot::channel();
    let (body_tx, body_rx) = mpsc::channel(BODY_CHANNEL_CAPACITY);

    let method = request.method().clone();
    let uri = request.uri().clone();
    tokio::task::spawn_blocking(move || {
        let mut sink = StreamingSink::new(head_tx, body_tx);
        handler.serve(&request, &mut sink);
    });

    let Ok(head) = head_rx.await else {
        log_handler_panicked!(method = %method, url = %uri);
        return plain_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error");
    };

    let chunks = futures_util::stream::unfold(body_rx, |mut body_rx| async move {
        let chunk = body_rx.recv().await?;
        Some((Ok::<_, Infallible>(Frame::data(chunk)), body_rx))
    });

    let mut response = Response::new(StreamBody::new(chunks).boxed_unsync());
    *response.status_mut() = head.status;
    *response.headers_mut() = head.headers;
    response
}

/// Accept HTTP/1 connections forever, one task per connection.
pub async fn serve<H: Handler + 'static>(listener: TcpListener, handler: H) {
    serve_with_shutdown(listener, handler, std::future::pending()).await
}

/// Accept HTTP/1 connections until `shutdown` completes. Connections already
/// accepted run to completion on their own tasks.
pub async fn serve_with_shutdown<H, F>(listener: TcpListener, handler: H, shutdown: F)
where
    H: Handler + 'static,
    F: Future<Output = ()>,
{
    let handler = Arc::new(handler);
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    log_connection_error!(error = %e);
                    continue;
                }
            },
            () = &mut shutdown => return,
        };

        let handler = Arc::clone(&handler);
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let handler = Arc::clone(&handler);
                async move { Ok::<_, Infallible>(handle(handler, req).await) }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                log_connection_error!(peer = %peer, error = %e);
            }
        });
    }
}
