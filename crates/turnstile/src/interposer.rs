//! The validating pipeline around a downstream handler.

use std::sync::Arc;

use bytes::Bytes;
use http::Request;

use turnstile_telemetry::{
    log_contract_loaded, log_invalid_request, log_invalid_response, log_write_failed,
};
use turnstile_validator::Specification;

use crate::config::{resolve, EffectiveConfig, Options};
use crate::{CannedResponse, ConfigError, Handler, ResponseCapture, ResponseSink};

/// Builds validating wrappers around handlers for one contract.
///
/// The compiled contract and the effective configuration are shared
/// read-only by every wrapper this produces.
#[derive(Clone)]
pub struct Interposer {
    spec: Arc<Specification>,
    config: Arc<EffectiveConfig>,
}

impl Interposer {
    /// Parse and compile `contract`, then resolve `options` over the defaults.
    pub fn new(contract: &[u8], options: Options) -> Result<Self, ConfigError> {
        let config = resolve(options)?;
        let spec = Specification::from_contract(contract)?;

        config.logger.in_scope(|| {
            log_contract_loaded!(
                title = %spec.api().title,
                operations = spec.api().operations.len(),
                validate_response = config.validate_response
            )
        });

        Ok(Self::from_parts(Arc::new(spec), config))
    }

    /// Assemble from an already compiled contract.
    pub fn from_parts(spec: Arc<Specification>, config: EffectiveConfig) -> Self {
        Self {
            spec,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &EffectiveConfig {
        &self.config
    }

    pub fn specification(&self) -> &Specification {
        &self.spec
    }

    pub fn wrap<H: Handler>(&self, handler: H) -> Validated<H> {
        Validated {
            spec: Arc::clone(&self.spec),
            config: Arc::clone(&self.config),
            inner: handler,
        }
    }
}

/// A handler guarded by contract validation.
///
/// Per request, the sink receives exactly one of: the handler's own output,
/// the canned invalid-request response, or the canned invalid-response response.
pub struct Validated<H> {
    spec: Arc<Specification>,
    config: Arc<EffectiveConfig>,
    inner: H,
}

impl<H> Validated<H> {
    pub fn inner(&self) -> &H {
        &self.inner
    }

    fn write_canned(
        &self,
        canned: &CannedResponse,
        request: &Request<Bytes>,
        sink: &mut dyn ResponseSink,
    ) {
        if let Err(error) = canned.write_to(sink) {
            self.config.logger.in_scope(|| {
                log_write_failed!(method = %request.method(), url = %request.uri(), error = %error)
            });
        }
    }
}

impl<H: Handler> Handler for Validated<H> {
    fn serve(&self, request: &Request<Bytes>, sink: &mut dyn ResponseSink) {
        let resolved = self
            .spec
            .resolve(request.method(), request.uri().path())
            .and_then(|operation| {
                self.spec
                    .validate_request(&operation, request)
                    .map(|()| operation)
            });

        let operation = match resolved {
            Ok(operation) => operation,
            Err(diagnostic) => {
                self.config.logger.in_scope(|| {
                    log_invalid_request!(
                        method = %request.method(),
                        url = %request.uri(),
                        error = %diagnostic
                    )
                });
                self.write_canned(&self.config.invalid_request_response, request, sink);
                return;
            }
        };

        if !self.config.validate_response {
            self.inner.serve(request, sink);
            return;
        }

        let mut capture = ResponseCapture::new();
        self.inner.serve(request, &mut capture);

        if let Err(diagnostic) = self.spec.validate_response(
            &operation,
            capture.status(),
            capture.headers(),
            capture.body(),
        ) {
            self.config.logger.in_scope(|| {
                log_invalid_response!(
                    method = %request.method(),
                    url = %request.uri(),
                    error = %diagnostic
                )
            });
            self.write_canned(&self.config.invalid_response_response, request, sink);
            return;
        }

        if let Err(error) = capture.replay(sink) {
            self.config.logger.in_scope(|| {
                log_write_failed!(method = %request.method(), url = %request.uri(), error = %error)
            });
        }
    }
}
