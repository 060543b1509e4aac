//! Pre-compiled conformance checks for a single contract operation.

use std::collections::{BTreeMap, HashMap};

use http::header::{CONTENT_TYPE, COOKIE};
use http::{HeaderMap, StatusCode};
use serde_json::Value;

use turnstile_router::percent_decode;
use turnstile_spec_parser::{ContentSchema, Operation, ParseError, ResponseSpec};

use crate::coerce::{coerce_values, normalize_nullable};
use crate::error::ValidationError;

/// Compile a JSON schema with format validation enabled.
fn compile_schema(schema: &Value) -> Result<jsonschema::Validator, String> {
    jsonschema::options()
        .should_validate_formats(true)
        .build(&normalize_nullable(schema))
        .map_err(|e| e.to_string())
}

/// All schema violations for `value`, joined; `None` when it conforms.
fn schema_violations(schema: &jsonschema::Validator, value: &Value) -> Option<String> {
    let reasons: Vec<String> = schema.iter_errors(value).map(|e| e.to_string()).collect();
    if reasons.is_empty() {
        None
    } else {
        Some(reasons.join("; "))
    }
}

fn collect<T>(errors: Vec<T>) -> Result<(), Vec<T>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// A parameter (or response header) with its schema in both raw and compiled form.
///
/// The raw document drives type coercion; the compiled one does the checking.
struct CompiledParam {
    name: String,
    required: bool,
    schema_doc: Option<Value>,
    schema: Option<jsonschema::Validator>,
}

impl CompiledParam {
    fn new(
        name: &str,
        required: bool,
        schema: Option<&Value>,
        context: &str,
    ) -> Result<Self, ParseError> {
        let compiled = schema
            .map(compile_schema)
            .transpose()
            .map_err(|e| {
                ParseError::SchemaError(format!("{}: invalid schema for '{}': {}", context, name, e))
            })?;
        Ok(Self {
            name: name.to_string(),
            required,
            schema_doc: schema.cloned(),
            schema: compiled,
        })
    }

    /// Coerce the raw occurrences and check them; `Err(reason)` on mismatch.
    fn check(&self, raw_values: &[&str]) -> Result<(), String> {
        let Some(schema) = &self.schema else {
            return Ok(());
        };
        let value = coerce_values(raw_values, self.schema_doc.as_ref());
        match schema_violations(schema, &value) {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }
}

/// Media type -> compiled schema, with wildcard fallback.
struct MediaTypes {
    entries: HashMap<String, Option<jsonschema::Validator>>,
}

impl MediaTypes {
    fn compile(
        content: &BTreeMap<String, ContentSchema>,
        context: &str,
    ) -> Result<Self, ParseError> {
        let mut entries = HashMap::with_capacity(content.len());
        for (media_type, content_schema) in content {
            let schema = content_schema
                .schema
                .as_ref()
                .map(compile_schema)
                .transpose()
                .map_err(|e| {
                    ParseError::SchemaError(format!(
                        "{}: invalid schema for {}: {}",
                        context, media_type, e
                    ))
                })?;
            entries.insert(media_type.to_ascii_lowercase(), schema);
        }
        Ok(Self { entries })
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact match, then `type/*`, then `*/*`.
    fn find(&self, media_type: &str) -> Option<&Option<jsonschema::Validator>> {
        if let Some(schema) = self.entries.get(media_type) {
            return Some(schema);
        }
        if let Some((major, _)) = media_type.split_once('/') {
            if let Some(schema) = self.entries.get(&format!("{}/*", major)) {
                return Some(schema);
            }
        }
        self.entries.get("*/*")
    }
}

/// Lowercased media type without parameters (`application/json; charset=utf-8` -> `application/json`).
fn base_media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase()
}

fn is_json(media_type: &str) -> bool {
    media_type.contains("json")
}

/// Outcome of checking a body against a set of media types.
enum BodyCheck {
    Conforms,
    UnsupportedContentType(String),
    Invalid(String),
}

fn check_body(media_types: &MediaTypes, content_type: Option<&str>, body: &[u8]) -> BodyCheck {
    let media_type = content_type.map(base_media_type).unwrap_or_default();
    let Some(schema) = media_types.find(&media_type) else {
        return BodyCheck::UnsupportedContentType(media_type);
    };

    let Some(schema) = schema else {
        return BodyCheck::Conforms;
    };
    if !is_json(&media_type) {
        return BodyCheck::Conforms;
    }

    let json_body: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => return BodyCheck::Invalid(format!("invalid JSON: {}", e)),
    };
    match schema_violations(schema, &json_body) {
        Some(reason) => BodyCheck::Invalid(reason),
        None => BodyCheck::Conforms,
    }
}

struct CompiledRequestBody {
    required: bool,
    content: MediaTypes,
}

struct CompiledResponse {
    headers: Vec<CompiledParam>,
    content: MediaTypes,
}

impl CompiledResponse {
    fn compile(spec: &ResponseSpec, context: &str) -> Result<Self, ParseError> {
        let headers = spec
            .headers
            .iter()
            .map(|(name, header)| {
                CompiledParam::new(name, header.required, header.schema.as_ref(), context)
            })
            .collect::<Result<_, _>>()?;
        Ok(Self {
            headers,
            content: MediaTypes::compile(&spec.content, context)?,
        })
    }
}

/// Compiled validator for an operation.
pub struct OperationValidator {
    path_params: Vec<CompiledParam>,
    query_params: Vec<CompiledParam>,
    header_params: Vec<CompiledParam>,
    cookie_params: Vec<CompiledParam>,
    request_body: Option<CompiledRequestBody>,
    /// Keyed by uppercased status key ("200", "2XX", "DEFAULT").
    responses: HashMap<String, CompiledResponse>,
}

impl OperationValidator {
    /// Compile every schema the operation declares.
    pub fn new(operation: &Operation) -> Result<Self, ParseError> {
        let context = format!("{} {}", operation.method, operation.path);

        let mut path_params = Vec::new();
        let mut query_params = Vec::new();
        let mut header_params = Vec::new();
        let mut cookie_params = Vec::new();

        for param in &operation.parameters {
            // Path params are always required
            let required = param.required || param.location == "path";
            let compiled =
                CompiledParam::new(&param.name, required, param.schema.as_ref(), &context)?;

            match param.location.as_str() {
                "path" => path_params.push(compiled),
                "query" => query_params.push(compiled),
                "header" => header_params.push(compiled),
                "cookie" => cookie_params.push(compiled),
                _ => {}
            }
        }

        let request_body = operation
            .request_body
            .as_ref()
            .map(|rb| -> Result<_, ParseError> {
                Ok(CompiledRequestBody {
                    required: rb.required,
                    content: MediaTypes::compile(&rb.content, &context)?,
                })
            })
            .transpose()?;

        let responses = operation
            .responses
            .iter()
            .map(|(key, spec)| -> Result<(String, CompiledResponse), ParseError> {
                let response_context = format!("{} response {}", context, key);
                Ok((key.to_uppercase(), CompiledResponse::compile(spec, &response_context)?))
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            path_params,
            query_params,
            header_params,
            cookie_params,
            request_body,
            responses,
        })
    }

    /// Validate path parameters extracted by the router.
    pub fn validate_path_params(
        &self,
        params: &[(String, String)],
    ) -> Result<(), Vec<ValidationError>> {
        let by_name: HashMap<&str, &str> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        check_params(&self.path_params, "path", |name| {
            by_name.get(name).map(|v| vec![*v])
        })
    }

    /// Validate query parameters.
    pub fn validate_query_params(
        &self,
        query_string: Option<&str>,
    ) -> Result<(), Vec<ValidationError>> {
        let mut by_name: HashMap<String, Vec<String>> = HashMap::new();
        for pair in query_string.unwrap_or("").split('&').filter(|s| !s.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            by_name
                .entry(decode_query_component(key))
                .or_default()
                .push(decode_query_component(value));
        }

        check_params(&self.query_params, "query", |name| {
            by_name
                .get(name)
                .map(|values| values.iter().map(String::as_str).collect())
        })
    }

    /// Validate header parameters. Header names compare case-insensitively.
    pub fn validate_headers(&self, headers: &HeaderMap) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        for param in &self.header_params {
            match header_values(headers, &param.name) {
                Ok(values) => {
                    if let Err(e) = check_one(param, "header", values) {
                        errors.push(e);
                    }
                }
                Err(reason) => errors.push(ValidationError::InvalidParameter {
                    name: param.name.clone(),
                    location: "header".into(),
                    reason,
                }),
            }
        }
        collect(errors)
    }

    /// Validate cookie parameters from every `Cookie` header.
    pub fn validate_cookies(&self, headers: &HeaderMap) -> Result<(), Vec<ValidationError>> {
        if self.cookie_params.is_empty() {
            return Ok(());
        }

        let mut by_name: HashMap<&str, Vec<&str>> = HashMap::new();
        for header in headers.get_all(COOKIE) {
            let Ok(header) = header.to_str() else {
                continue;
            };
            for pair in header.split(';') {
                if let Some((name, value)) = pair.trim().split_once('=') {
                    by_name.entry(name.trim()).or_default().push(value.trim());
                }
            }
        }

        check_params(&self.cookie_params, "cookie", |name| by_name.get(name).cloned())
    }

    /// Validate request body.
    pub fn validate_body(
        &self,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<(), Vec<ValidationError>> {
        let Some(body_spec) = &self.request_body else {
            // No body spec, nothing to validate
            return Ok(());
        };

        if body.is_empty() {
            return if body_spec.required {
                Err(vec![ValidationError::MissingRequiredBody])
            } else {
                Ok(())
            };
        }

        match check_body(&body_spec.content, content_type, body) {
            BodyCheck::Conforms => Ok(()),
            BodyCheck::UnsupportedContentType(ct) => {
                Err(vec![ValidationError::UnsupportedContentType(ct)])
            }
            BodyCheck::Invalid(reason) => Err(vec![ValidationError::InvalidBody(reason)]),
        }
    }

    /// Validate an entire request (fail-fast: stops at the first failing category).
    pub fn validate_request(
        &self,
        path_params: &[(String, String)],
        query_string: Option<&str>,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<(), Vec<ValidationError>> {
        // path -> query -> headers -> cookies -> body
        self.validate_path_params(path_params)?;
        self.validate_query_params(query_string)?;
        self.validate_headers(headers)?;
        self.validate_cookies(headers)?;
        let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
        self.validate_body(content_type, body)?;
        Ok(())
    }

    /// Pick the declared response for a status: exact code, then `NXX`, then `default`.
    ///
    /// A status the handler never set only matches `default`.
    fn find_response(&self, status: Option<StatusCode>) -> Option<&CompiledResponse> {
        if let Some(status) = status {
            if let Some(response) = self.responses.get(status.as_str()) {
                return Some(response);
            }
            let range = format!("{}XX", status.as_u16() / 100);
            if let Some(response) = self.responses.get(&range) {
                return Some(response);
            }
        }
        self.responses.get("DEFAULT")
    }

    /// Validate a response the operation produced.
    ///
    /// Statuses the contract does not describe pass unchecked, as does
    /// everything when the operation declares no responses. A status the
    /// handler never set is rejected unless `default` covers it.
    pub fn validate_response(
        &self,
        status: Option<StatusCode>,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<(), Vec<ValidationError>> {
        if self.responses.is_empty() {
            return Ok(());
        }
        let Some(response) = self.find_response(status) else {
            return match status {
                Some(_) => Ok(()),
                None => Err(vec![ValidationError::UnexpectedStatus("(unset)".into())]),
            };
        };

        let mut errors = Vec::new();
        for header in &response.headers {
            let outcome = header_values(headers, &header.name).and_then(|values| {
                if values.is_empty() {
                    return Ok(None);
                }
                header.check(&values).map(|_| Some(()))
            });
            match outcome {
                Ok(Some(())) => {}
                Ok(None) if header.required => {
                    errors.push(ValidationError::MissingResponseHeader(header.name.clone()))
                }
                Ok(None) => {}
                Err(reason) => errors.push(ValidationError::InvalidResponseHeader {
                    name: header.name.clone(),
                    reason,
                }),
            }
        }
        collect(errors)?;

        if response.content.is_empty() {
            return Ok(());
        }

        let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
        match check_body(&response.content, content_type, body) {
            BodyCheck::Conforms => Ok(()),
            BodyCheck::UnsupportedContentType(ct) => {
                Err(vec![ValidationError::UnsupportedContentType(ct)])
            }
            BodyCheck::Invalid(reason) => Err(vec![ValidationError::InvalidResponseBody(reason)]),
        }
    }
}

/// Check a group of parameters, collecting every violation.
fn check_params<'v>(
    params: &[CompiledParam],
    location: &str,
    lookup: impl Fn(&str) -> Option<Vec<&'v str>>,
) -> Result<(), Vec<ValidationError>> {
    let errors = params
        .iter()
        .filter_map(|param| {
            check_one(param, location, lookup(param.name.as_str()).unwrap_or_default()).err()
        })
        .collect();
    collect(errors)
}

fn check_one(
    param: &CompiledParam,
    location: &str,
    values: Vec<&str>,
) -> Result<(), ValidationError> {
    if values.is_empty() {
        return if param.required {
            Err(ValidationError::MissingRequiredParameter {
                name: param.name.clone(),
                location: location.into(),
            })
        } else {
            Ok(())
        };
    }
    param
        .check(&values)
        .map_err(|reason| ValidationError::InvalidParameter {
            name: param.name.clone(),
            location: location.into(),
            reason,
        })
}

/// Every value of a header, in the order received.
fn header_values<'h>(headers: &'h HeaderMap, name: &str) -> Result<Vec<&'h str>, String> {
    headers
        .get_all(name)
        .iter()
        .map(|v| v.to_str().map_err(|_| "value is not visible ASCII".to_string()))
        .collect::<Result<Vec<_>, _>>()
}

/// Query components use `+` for spaces on top of `%XX` escapes.
fn decode_query_component(raw: &str) -> String {
    percent_decode(&raw.replace('+', " "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use turnstile_spec_parser::{Parameter, RequestBody, ResponseHeader};

    fn make_param(name: &str, location: &str, required: bool, schema: Option<Value>) -> Parameter {
        Parameter {
            name: name.to_string(),
            location: location.to_string(),
            required,
            schema,
        }
    }

    fn operation(parameters: Vec<Parameter>) -> Operation {
        Operation {
            path: "/test".into(),
            method: "GET".into(),
            operation_id: None,
            parameters,
            request_body: None,
            responses: BTreeMap::new(),
        }
    }

    fn json_content(schema: Option<Value>) -> BTreeMap<String, ContentSchema> {
        let mut content = BTreeMap::new();
        content.insert("application/json".to_string(), ContentSchema { schema });
        content
    }

    fn with_body(required: bool, schema: Option<Value>) -> OperationValidator {
        let mut op = operation(Vec::new());
        op.request_body = Some(RequestBody {
            required,
            content: json_content(schema),
        });
        OperationValidator::new(&op).unwrap()
    }

    fn with_responses(responses: Vec<(&str, ResponseSpec)>) -> OperationValidator {
        let mut op = operation(Vec::new());
        op.responses = responses
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        OperationValidator::new(&op).unwrap()
    }

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "application/json".parse().unwrap());
        headers
    }

    #[test]
    fn validate_required_path_param() {
        let validator =
            OperationValidator::new(&operation(vec![make_param("id", "path", false, None)]))
                .unwrap();

        assert!(validator.validate_path_params(&[]).is_err());
        assert!(validator
            .validate_path_params(&[("id".into(), "123".into())])
            .is_ok());
    }

    #[test]
    fn validate_path_param_is_coerced() {
        let schema = json!({"type": "integer", "minimum": 1});
        let validator =
            OperationValidator::new(&operation(vec![make_param("id", "path", true, Some(schema))]))
                .unwrap();

        assert!(validator
            .validate_path_params(&[("id".into(), "7".into())])
            .is_ok());

        let errors = validator
            .validate_path_params(&[("id".into(), "abc".into())])
            .unwrap_err();
        assert!(matches!(
            &errors[0],
            ValidationError::InvalidParameter { name, location, .. } if name == "id" && location == "path"
        ));
    }

    #[test]
    fn validate_required_boolean_query_param() {
        let schema = json!({"type": "boolean"});
        let validator = OperationValidator::new(&operation(vec![make_param(
            "test",
            "query",
            true,
            Some(schema),
        )]))
        .unwrap();

        assert_eq!(
            validator.validate_query_params(None).unwrap_err(),
            vec![ValidationError::MissingRequiredParameter {
                name: "test".into(),
                location: "query".into(),
            }]
        );
        assert!(validator.validate_query_params(Some("test=true")).is_ok());
        assert!(validator.validate_query_params(Some("test=false")).is_ok());
        // Present without a value: the empty string is not a boolean
        assert!(validator.validate_query_params(Some("test")).is_err());
        assert!(validator.validate_query_params(Some("test=maybe")).is_err());
    }

    #[test]
    fn validate_optional_query_param() {
        let validator =
            OperationValidator::new(&operation(vec![make_param("limit", "query", false, None)]))
                .unwrap();
        assert!(validator.validate_query_params(Some("")).is_ok());
    }

    #[test]
    fn query_values_are_decoded() {
        let schema = json!({"type": "string", "const": "a b&c"});
        let validator = OperationValidator::new(&operation(vec![make_param(
            "q",
            "query",
            true,
            Some(schema),
        )]))
        .unwrap();
        assert!(validator.validate_query_params(Some("q=a+b%26c")).is_ok());
    }

    #[test]
    fn repeated_query_keys_fill_arrays() {
        let schema = json!({"type": "array", "items": {"type": "integer"}, "maxItems": 2});
        let validator = OperationValidator::new(&operation(vec![make_param(
            "id",
            "query",
            true,
            Some(schema),
        )]))
        .unwrap();

        assert!(validator.validate_query_params(Some("id=1&id=2")).is_ok());
        assert!(validator.validate_query_params(Some("id=1&id=2&id=3")).is_err());
        assert!(validator.validate_query_params(Some("id=1&id=x")).is_err());
    }

    #[test]
    fn validate_headers_case_insensitive() {
        let schema = json!({"type": "string", "minLength": 3});
        let validator = OperationValidator::new(&operation(vec![make_param(
            "X-Api-Key",
            "header",
            true,
            Some(schema),
        )]))
        .unwrap();

        let mut headers = HeaderMap::new();
        assert!(validator.validate_headers(&headers).is_err());

        headers.insert("x-api-key", "abcd".parse().unwrap());
        assert!(validator.validate_headers(&headers).is_ok());

        headers.insert("x-api-key", "ab".parse().unwrap());
        assert!(validator.validate_headers(&headers).is_err());
    }

    #[test]
    fn validate_cookie_params() {
        let schema = json!({"type": "integer"});
        let validator = OperationValidator::new(&operation(vec![make_param(
            "session",
            "cookie",
            true,
            Some(schema),
        )]))
        .unwrap();

        let mut headers = HeaderMap::new();
        assert!(validator.validate_cookies(&headers).is_err());

        headers.insert(COOKIE, "theme=dark; session=42".parse().unwrap());
        assert!(validator.validate_cookies(&headers).is_ok());

        headers.insert(COOKIE, "session=abc".parse().unwrap());
        assert!(validator.validate_cookies(&headers).is_err());
    }

    #[test]
    fn validate_required_body() {
        let validator = with_body(true, None);

        assert_eq!(
            validator
                .validate_body(Some("application/json"), &[])
                .unwrap_err(),
            vec![ValidationError::MissingRequiredBody]
        );
        assert!(validator
            .validate_body(Some("application/json"), b"{}")
            .is_ok());
    }

    #[test]
    fn validate_optional_empty_body() {
        let validator = with_body(false, Some(json!({"type": "object"})));
        assert!(validator.validate_body(None, &[]).is_ok());
    }

    #[test]
    fn validate_body_schema() {
        let validator = with_body(
            true,
            Some(json!({
                "type": "object",
                "required": ["name"],
                "properties": {
                    "name": { "type": "string" }
                }
            })),
        );

        assert!(validator
            .validate_body(Some("application/json; charset=utf-8"), br#"{"name":"test"}"#)
            .is_ok());
        assert!(matches!(
            validator.validate_body(Some("application/json"), b"{}").unwrap_err()[0],
            ValidationError::InvalidBody(_)
        ));
        assert!(matches!(
            validator.validate_body(Some("application/json"), b"{not json").unwrap_err()[0],
            ValidationError::InvalidBody(_)
        ));
    }

    #[test]
    fn validate_unsupported_content_type() {
        let validator = with_body(true, None);

        let errors = validator
            .validate_body(Some("text/plain"), b"hello")
            .unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::UnsupportedContentType("text/plain".into())]
        );
    }

    #[test]
    fn wildcard_media_types() {
        let mut content = BTreeMap::new();
        content.insert("text/*".to_string(), ContentSchema { schema: None });
        let mut op = operation(Vec::new());
        op.request_body = Some(RequestBody {
            required: true,
            content,
        });
        let validator = OperationValidator::new(&op).unwrap();

        assert!(validator.validate_body(Some("text/csv"), b"a,b").is_ok());
        assert!(validator
            .validate_body(Some("application/xml"), b"<a/>")
            .is_err());
    }

    #[test]
    fn request_validation_is_fail_fast() {
        let mut op = operation(vec![
            make_param("id", "path", true, Some(json!({"type": "integer"}))),
            make_param("q", "query", true, None),
        ]);
        op.request_body = Some(RequestBody {
            required: true,
            content: json_content(None),
        });
        let validator = OperationValidator::new(&op).unwrap();

        // Both path and query are wrong; only the path category is reported
        let errors = validator
            .validate_request(&[("id".into(), "x".into())], None, &HeaderMap::new(), &[])
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ValidationError::InvalidParameter { location, .. } if location == "path"
        ));

        assert!(validator
            .validate_request(&[("id".into(), "1".into())], Some("q=1"), &json_headers(), b"{}")
            .is_ok());
    }

    #[test]
    fn invalid_schema_is_rejected_at_build_time() {
        let op = operation(vec![make_param(
            "id",
            "query",
            true,
            Some(json!({"type": 12})),
        )]);
        assert!(matches!(
            OperationValidator::new(&op),
            Err(ParseError::SchemaError(_))
        ));
    }

    // ========================
    // Responses
    // ========================

    fn integer_response() -> ResponseSpec {
        ResponseSpec {
            headers: BTreeMap::new(),
            content: json_content(Some(json!({"type": "integer"}))),
        }
    }

    #[test]
    fn response_body_matches_schema() {
        let validator = with_responses(vec![("200", integer_response())]);

        assert!(validator
            .validate_response(Some(StatusCode::OK), &json_headers(), b"10")
            .is_ok());

        let errors = validator
            .validate_response(Some(StatusCode::OK), &json_headers(), b"\"not-a-number\"")
            .unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidResponseBody(_)));

        let errors = validator
            .validate_response(Some(StatusCode::OK), &json_headers(), b"not-a-number")
            .unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidResponseBody(_)));
    }

    #[test]
    fn response_without_content_type_is_rejected_when_content_declared() {
        let validator = with_responses(vec![("200", integer_response())]);

        let errors = validator
            .validate_response(Some(StatusCode::OK), &HeaderMap::new(), b"10")
            .unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::UnsupportedContentType(String::new())]
        );
    }

    #[test]
    fn response_without_declared_content_is_unconstrained() {
        let validator = with_responses(vec![("204", ResponseSpec::default())]);
        assert!(validator
            .validate_response(Some(StatusCode::NO_CONTENT), &HeaderMap::new(), b"anything")
            .is_ok());
    }

    #[test]
    fn response_status_lookup_order() {
        let validator = with_responses(vec![
            ("200", integer_response()),
            ("4XX", ResponseSpec::default()),
            ("DEFAULT", integer_response()),
        ]);

        // Exact
        assert!(validator
            .validate_response(Some(StatusCode::OK), &json_headers(), b"1")
            .is_ok());
        // Range
        assert!(validator
            .validate_response(Some(StatusCode::NOT_FOUND), &HeaderMap::new(), b"")
            .is_ok());
        // Default
        assert!(validator
            .validate_response(Some(StatusCode::BAD_GATEWAY), &json_headers(), b"2")
            .is_ok());
        assert!(validator
            .validate_response(Some(StatusCode::BAD_GATEWAY), &json_headers(), b"x")
            .is_err());
    }

    #[test]
    fn undeclared_status_passes_unchecked() {
        let validator = with_responses(vec![("200", integer_response())]);

        assert!(validator
            .validate_response(
                Some(StatusCode::NOT_FOUND),
                &json_headers(),
                br#"{"error":"not here"}"#
            )
            .is_ok());
        // The declared status is still checked
        assert!(validator
            .validate_response(Some(StatusCode::OK), &json_headers(), b"\"x\"")
            .is_err());
    }

    #[test]
    fn unset_status_without_default_is_rejected() {
        let validator = with_responses(vec![("200", integer_response())]);

        assert_eq!(
            validator
                .validate_response(None, &HeaderMap::new(), b"")
                .unwrap_err(),
            vec![ValidationError::UnexpectedStatus("(unset)".into())]
        );
    }

    #[test]
    fn operation_without_responses_accepts_anything() {
        let validator = with_responses(Vec::new());

        assert!(validator
            .validate_response(Some(StatusCode::NOT_FOUND), &json_headers(), b"nope")
            .is_ok());
        assert!(validator
            .validate_response(None, &HeaderMap::new(), b"")
            .is_ok());
    }

    #[test]
    fn unset_status_matches_default_only() {
        let validator = with_responses(vec![("DEFAULT", ResponseSpec::default())]);
        assert!(validator
            .validate_response(None, &HeaderMap::new(), b"")
            .is_ok());
    }

    #[test]
    fn response_headers_are_checked() {
        let mut headers_spec = BTreeMap::new();
        headers_spec.insert(
            "x-rate-limit".to_string(),
            ResponseHeader {
                required: true,
                schema: Some(json!({"type": "integer"})),
            },
        );
        let validator = with_responses(vec![(
            "200",
            ResponseSpec {
                headers: headers_spec,
                content: BTreeMap::new(),
            },
        )]);

        assert_eq!(
            validator
                .validate_response(Some(StatusCode::OK), &HeaderMap::new(), b"")
                .unwrap_err(),
            vec![ValidationError::MissingResponseHeader("x-rate-limit".into())]
        );

        let mut headers = HeaderMap::new();
        headers.insert("x-rate-limit", "many".parse().unwrap());
        assert!(matches!(
            validator
                .validate_response(Some(StatusCode::OK), &headers, b"")
                .unwrap_err()[0],
            ValidationError::InvalidResponseHeader { .. }
        ));

        headers.insert("x-rate-limit", "100".parse().unwrap());
        assert!(validator
            .validate_response(Some(StatusCode::OK), &headers, b"")
            .is_ok());
    }

    #[test]
    fn nullable_properties_accept_null() {
        let validator = with_responses(vec![(
            "200",
            ResponseSpec {
                headers: BTreeMap::new(),
                content: json_content(Some(json!({
                    "type": "object",
                    "properties": {"tag": {"type": "string", "nullable": true}}
                }))),
            },
        )]);

        assert!(validator
            .validate_response(Some(StatusCode::OK), &json_headers(), br#"{"tag":null}"#)
            .is_ok());
        assert!(validator
            .validate_response(Some(StatusCode::OK), &json_headers(), br#"{"tag":1}"#)
            .is_err());
    }

    // ========================
    // Formats
    // ========================

    #[test]
    fn format_validation_email() {
        let schema = json!({
            "type": "object",
            "properties": {
                "email": { "type": "string", "format": "email" }
            }
        });
        let validator = compile_schema(&schema).unwrap();

        assert!(validator.is_valid(&json!({"email": "user@example.com"})));
        assert!(!validator.is_valid(&json!({"email": "not-an-email"})));
    }

    #[test]
    fn format_validation_uuid() {
        let validator = compile_schema(&json!({"type": "string", "format": "uuid"})).unwrap();

        assert!(validator.is_valid(&json!("550e8400-e29b-41d4-a716-446655440000")));
        assert!(!validator.is_valid(&json!("not-a-uuid")));
    }

    #[test]
    fn format_validation_date_time() {
        let validator = compile_schema(&json!({"type": "string", "format": "date-time"})).unwrap();

        assert!(validator.is_valid(&json!("2024-01-29T12:30:00Z")));
        assert!(!validator.is_valid(&json!("not-a-date")));
    }
}
