//! Configuration resolution: user options merged over immutable defaults.

use std::collections::BTreeMap;
use std::path::Path;

use http::{HeaderName, HeaderValue, StatusCode};
use serde::Deserialize;

use crate::{CannedResponse, ConfigError, Logger};

/// User-supplied options. Every field is optional; `None` means "use the default".
///
/// An explicit `false` is kept as `Some(false)` and is never replaced by a default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    pub validate_response: Option<bool>,
    pub invalid_request_response: Option<ResponseOverride>,
    pub invalid_response_response: Option<ResponseOverride>,
    #[serde(skip)]
    pub logger: Option<Logger>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validate_response(mut self, enabled: bool) -> Self {
        self.validate_response = Some(enabled);
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_invalid_request_response(mut self, response: ResponseOverride) -> Self {
        self.invalid_request_response = Some(response);
        self
    }

    pub fn with_invalid_response_response(mut self, response: ResponseOverride) -> Self {
        self.invalid_response_response = Some(response);
        self
    }

    /// Parse options from a YAML document.
    ///
    /// ```yaml
    /// validate_response: true
    /// invalid_request_response:
    ///   status: 422
    ///   headers:
    ///     content-type: [application/json]
    ///   body: '{"error":"invalid request"}'
    /// ```
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }
}

/// Partial canned response. Unset fields keep the default's value; each
/// header named here replaces that header's default values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResponseOverride {
    pub status: Option<u16>,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: Option<String>,
}

impl ResponseOverride {
    fn apply(&self, base: &CannedResponse) -> Result<CannedResponse, ConfigError> {
        let mut merged = base.clone();

        if let Some(code) = self.status {
            merged.status = StatusCode::from_u16(code)
                .map_err(|_| ConfigError::Merge(format!("invalid status code {}", code)))?;
        }

        for (name, values) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ConfigError::Merge(format!("invalid header name {:?}", name)))?;
            merged.headers.remove(&name);
            for value in values {
                let value = HeaderValue::from_str(value).map_err(|_| {
                    ConfigError::Merge(format!("invalid value {:?} for header {}", value, name))
                })?;
                merged.headers.append(name.clone(), value);
            }
        }

        if let Some(body) = &self.body {
            merged.body = body.clone().into();
        }

        Ok(merged)
    }
}

/// The fallback values for every option. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct Defaults {
    pub logger: Logger,
    pub validate_response: bool,
    pub invalid_request_response: CannedResponse,
    pub invalid_response_response: CannedResponse,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            logger: Logger::none(),
            validate_response: false,
            invalid_request_response: CannedResponse::bad_request(),
            invalid_response_response: CannedResponse::internal_server_error(),
        }
    }
}

/// The configuration an interposer runs with.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub logger: Logger,
    pub validate_response: bool,
    pub invalid_request_response: CannedResponse,
    pub invalid_response_response: CannedResponse,
}

/// Merge `options` over the standard defaults.
pub fn resolve(options: Options) -> Result<EffectiveConfig, ConfigError> {
    resolve_with(options, &Defaults::default())
}

/// Merge `options` over `defaults`.
pub fn resolve_with(options: Options, defaults: &Defaults) -> Result<EffectiveConfig, ConfigError> {
    let merge = |user: &Option<ResponseOverride>, base: &CannedResponse| match user {
        Some(user) => user.apply(base),
        None => Ok(base.clone()),
    };

    Ok(EffectiveConfig {
        invalid_request_response: merge(
            &options.invalid_request_response,
            &defaults.invalid_request_response,
        )?,
        invalid_response_response: merge(
            &options.invalid_response_response,
            &defaults.invalid_response_response,
        )?,
        validate_response: options
            .validate_response
            .unwrap_or(defaults.validate_response),
        logger: options.logger.unwrap_or_else(|| defaults.logger.clone()),
    })
}
