//! Contract conformance checks for requests and responses.
//!
//! A [`Specification`] is built once from an OpenAPI contract. Every operation
//! gets its schemas compiled up front, so per-request work is routing plus
//! schema evaluation.
//!
//! ```ignore
//! let spec = Specification::from_contract(contract_bytes)?;
//! let operation = spec.resolve(request.method(), request.uri().path())?;
//! spec.validate_request(&operation, &request)?;
//! ```

mod coerce;
mod error;
mod operation;

use http::{HeaderMap, Method, Request, StatusCode};

use turnstile_router::{RouteMatch, Router};
use turnstile_spec_parser::{parse_spec, ApiSpec, Operation, ParseError};

pub use error::{Diagnostic, ValidationError};
pub use operation::OperationValidator;

/// A contract with every operation compiled and routable.
pub struct Specification {
    spec: ApiSpec,
    router: Router<usize>,
    validators: Vec<OperationValidator>,
}

/// The contract operation a request resolved to, with its captured path parameters.
pub struct ResolvedOperation<'a> {
    operation: &'a Operation,
    validator: &'a OperationValidator,
    path_params: Vec<(String, String)>,
}

impl<'a> ResolvedOperation<'a> {
    pub fn operation(&self) -> &'a Operation {
        self.operation
    }

    /// `(name, decoded value)` pairs in template order.
    pub fn path_params(&self) -> &[(String, String)] {
        &self.path_params
    }
}

impl std::fmt::Debug for ResolvedOperation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedOperation")
            .field("method", &self.operation.method)
            .field("path", &self.operation.path)
            .field("path_params", &self.path_params)
            .finish()
    }
}

impl Specification {
    /// Parse raw contract bytes (YAML or JSON) and compile it.
    pub fn from_contract(contract: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(contract)
            .map_err(|e| ParseError::ParseError(format!("contract is not UTF-8: {}", e)))?;
        Self::new(parse_spec(text)?)
    }

    /// Compile an already parsed contract.
    pub fn new(spec: ApiSpec) -> Result<Self, ParseError> {
        let mut router = Router::new();
        let mut validators = Vec::with_capacity(spec.operations.len());

        for (index, operation) in spec.operations.iter().enumerate() {
            validators.push(OperationValidator::new(operation)?);
            router.insert(&operation.path, &operation.method, index);
        }

        Ok(Self {
            spec,
            router,
            validators,
        })
    }

    pub fn api(&self) -> &ApiSpec {
        &self.spec
    }

    /// Match a method and request path to a contract operation.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<ResolvedOperation<'_>, Diagnostic> {
        match self.router.lookup(path, method.as_str()) {
            RouteMatch::Found { value, params } => Ok(ResolvedOperation {
                operation: &self.spec.operations[*value],
                validator: &self.validators[*value],
                path_params: params,
            }),
            RouteMatch::MethodNotAllowed { allowed } => {
                Err(Diagnostic::from(ValidationError::MethodNotAllowed {
                    method: method.to_string(),
                    path: path.to_string(),
                    allowed,
                }))
            }
            RouteMatch::NotFound => Err(Diagnostic::from(ValidationError::RouteNotFound {
                method: method.to_string(),
                path: path.to_string(),
            })),
        }
    }

    /// Check a buffered request against the operation it resolved to.
    pub fn validate_request<B: AsRef<[u8]>>(
        &self,
        operation: &ResolvedOperation<'_>,
        request: &Request<B>,
    ) -> Result<(), Diagnostic> {
        operation
            .validator
            .validate_request(
                &operation.path_params,
                request.uri().query(),
                request.headers(),
                request.body().as_ref(),
            )
            .map_err(Diagnostic::from_errors)
    }

    /// Check a response produced for `operation`. `status` is `None` when the
    /// handler never set one.
    pub fn validate_response(
        &self,
        operation: &ResolvedOperation<'_>,
        status: Option<StatusCode>,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<(), Diagnostic> {
        operation
            .validator
            .validate_response(status, headers, body)
            .map_err(Diagnostic::from_errors)
    }
}
