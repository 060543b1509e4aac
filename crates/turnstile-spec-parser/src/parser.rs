use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::model::{
    ApiSpec, ContentSchema, Operation, Parameter, RequestBody, ResponseHeader, ResponseSpec,
};

/// HTTP methods recognized in OpenAPI path items.
const HTTP_METHODS: &[&str] = &[
    "get", "post", "put", "delete", "patch", "head", "options", "trace",
];

/// Upper bound on `$ref` -> `$ref` hops for non-schema objects.
const MAX_REF_HOPS: usize = 32;

/// Resolve a JSON Reference like `#/components/schemas/Pet` from the contract root.
///
/// Only local references (`#/...`) are supported. Returns `None` for external refs.
fn resolve_ref<'a>(root: &'a Value, ref_path: &str) -> Option<&'a Value> {
    let pointer = ref_path.strip_prefix("#/")?;
    let mut current = root;
    for segment in pointer.split('/') {
        let unescaped = segment.replace("~1", "/").replace("~0", "~");
        current = current.get(&unescaped)?;
    }
    Some(current)
}

/// Recursively inline all `$ref` pointers in a JSON Schema value.
///
/// `visited` tracks the current resolution chain to detect circular references.
fn resolve_schema_refs(
    value: &Value,
    root: &Value,
    visited: &mut HashSet<String>,
) -> Result<Value, ParseError> {
    match value {
        Value::Object(obj) => {
            if let Some(ref_str) = obj.get("$ref").and_then(|v| v.as_str()) {
                if !visited.insert(ref_str.to_string()) {
                    return Err(ParseError::SchemaError(format!(
                        "circular $ref detected: {}",
                        ref_str
                    )));
                }
                let target = resolve_ref(root, ref_str)
                    .ok_or_else(|| ParseError::UnresolvedRef(ref_str.to_string()))?;
                let resolved = resolve_schema_refs(target, root, visited)?;
                visited.remove(ref_str);
                Ok(resolved)
            } else {
                let mut new_obj = Map::with_capacity(obj.len());
                for (key, val) in obj {
                    new_obj.insert(key.clone(), resolve_schema_refs(val, root, visited)?);
                }
                Ok(Value::Object(new_obj))
            }
        }
        Value::Array(arr) => {
            let items: Result<Vec<_>, _> = arr
                .iter()
                .map(|v| resolve_schema_refs(v, root, visited))
                .collect();
            Ok(Value::Array(items?))
        }
        other => Ok(other.clone()),
    }
}

fn inline_schema(schema: Option<&Value>, root: &Value) -> Result<Option<Value>, ParseError> {
    schema
        .map(|s| resolve_schema_refs(s, root, &mut HashSet::new()))
        .transpose()
}

/// Follow `$ref` on a parameter/response/header/body object until a concrete
/// object is reached.
fn deref_object<'a>(
    value: &'a Value,
    root: &'a Value,
    what: &str,
) -> Result<&'a Map<String, Value>, ParseError> {
    let mut current = value;
    for _ in 0..MAX_REF_HOPS {
        let obj = current
            .as_object()
            .ok_or_else(|| ParseError::SchemaError(format!("{} must be an object", what)))?;
        match obj.get("$ref").and_then(|v| v.as_str()) {
            Some(ref_str) => {
                current = resolve_ref(root, ref_str)
                    .ok_or_else(|| ParseError::UnresolvedRef(ref_str.to_string()))?;
            }
            None => return Ok(obj),
        }
    }
    Err(ParseError::SchemaError(format!(
        "{} $ref chain is too deep or circular",
        what
    )))
}

/// Convert a YAML document into a JSON value.
///
/// Mapping keys are stringified, so unquoted status codes (`200:`) survive.
fn yaml_to_json(value: serde_yaml::Value) -> Result<Value, ParseError> {
    Ok(match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => Value::Array(
            seq.into_iter()
                .map(yaml_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        serde_yaml::Value::Mapping(mapping) => {
            let mut obj = Map::with_capacity(mapping.len());
            for (key, val) in mapping {
                let key = match key {
                    serde_yaml::Value::String(s) => s,
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    serde_yaml::Value::Null => "null".to_string(),
                    other => {
                        return Err(ParseError::ParseError(format!(
                            "unsupported mapping key: {:?}",
                            other
                        )))
                    }
                };
                obj.insert(key, yaml_to_json(val)?);
            }
            Value::Object(obj)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

/// Parse an OpenAPI contract from a YAML/JSON string.
pub fn parse_spec(input: &str) -> Result<ApiSpec, ParseError> {
    // JSON is valid YAML
    let document: serde_yaml::Value =
        serde_yaml::from_str(input).map_err(|e| ParseError::ParseError(e.to_string()))?;
    let root = yaml_to_json(document)?;

    let root_obj = root
        .as_object()
        .ok_or_else(|| ParseError::ParseError("contract root must be an object".into()))?;

    let version = detect_version(root_obj)?;

    let info = root_obj
        .get("info")
        .and_then(|v| v.as_object())
        .ok_or_else(|| ParseError::SchemaError("missing 'info' object".into()))?;

    let title = info
        .get("title")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ParseError::SchemaError("missing 'info.title'".into()))?
        .to_string();

    let api_version = info
        .get("version")
        .and_then(|v| v.as_str())
        .unwrap_or("0.0.0")
        .to_string();

    let operations = parse_paths(root_obj, &root)?;

    Ok(ApiSpec {
        filename: None,
        version,
        title,
        api_version,
        operations,
    })
}

/// Parse a contract from a file path.
pub fn parse_spec_file(path: &std::path::Path) -> Result<ApiSpec, ParseError> {
    let content = std::fs::read_to_string(path)?;
    let mut spec = parse_spec(&content)?;
    spec.filename = path
        .file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string());
    Ok(spec)
}

fn detect_version(root: &Map<String, Value>) -> Result<String, ParseError> {
    let Some(version) = root.get("openapi").and_then(|v| v.as_str()) else {
        return Err(ParseError::UnknownFormat);
    };
    if !version.starts_with("3.") {
        return Err(ParseError::SchemaError(format!(
            "unsupported OpenAPI version: {} (only 3.x supported)",
            version
        )));
    }
    Ok(version.to_string())
}

fn parse_paths(root_obj: &Map<String, Value>, root: &Value) -> Result<Vec<Operation>, ParseError> {
    let mut operations = Vec::new();

    let Some(paths) = root_obj.get("paths").and_then(|v| v.as_object()) else {
        // No paths is valid (empty API)
        return Ok(operations);
    };

    for (path, path_item) in paths {
        let path_obj = deref_object(path_item, root, &format!("path item '{}'", path))?;

        // Inherited by every operation under this path
        let path_params = parse_parameters(path_obj, root)?;

        for method in HTTP_METHODS {
            let Some(op_value) = path_obj.get(*method) else {
                continue;
            };
            let op_obj = op_value.as_object().ok_or_else(|| {
                ParseError::SchemaError(format!(
                    "operation {} {} must be an object",
                    method.to_uppercase(),
                    path
                ))
            })?;

            let parameters = merge_parameters(&path_params, parse_parameters(op_obj, root)?);

            let operation_id = op_obj
                .get("operationId")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());

            operations.push(Operation {
                path: path.clone(),
                method: method.to_uppercase(),
                operation_id,
                parameters,
                request_body: parse_request_body(op_obj, root)?,
                responses: parse_responses(op_obj, root)?,
            });
        }
    }

    Ok(operations)
}

/// Operation-level parameters override path-level ones with the same name and location.
fn merge_parameters(inherited: &[Parameter], own: Vec<Parameter>) -> Vec<Parameter> {
    let mut merged: Vec<Parameter> = inherited
        .iter()
        .filter(|p| {
            !own.iter()
                .any(|o| o.name == p.name && o.location == p.location)
        })
        .cloned()
        .collect();
    merged.extend(own);
    merged
}

fn parse_parameters(obj: &Map<String, Value>, root: &Value) -> Result<Vec<Parameter>, ParseError> {
    let Some(arr) = obj.get("parameters").and_then(|v| v.as_array()) else {
        return Ok(Vec::new());
    };

    let mut params = Vec::with_capacity(arr.len());
    for item in arr {
        let param_obj = deref_object(item, root, "parameter")?;
        let Some(location) = param_obj.get("in").and_then(|v| v.as_str()) else {
            continue;
        };
        let Some(name) = param_obj.get("name").and_then(|v| v.as_str()) else {
            continue;
        };

        // `content`-style parameters carry their schema under the media type
        let raw_schema = param_obj
            .get("schema")
            .or_else(|| first_content_schema(param_obj));

        params.push(Parameter {
            name: name.to_string(),
            location: location.to_string(),
            required: param_obj
                .get("required")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            schema: inline_schema(raw_schema, root)?,
        });
    }
    Ok(params)
}

fn first_content_schema(obj: &Map<String, Value>) -> Option<&Value> {
    let content = obj.get("content")?.as_object()?;
    let (_media_type, media_obj) = content.iter().next()?;
    media_obj.as_object()?.get("schema")
}

fn parse_content(
    obj: &Map<String, Value>,
    root: &Value,
) -> Result<BTreeMap<String, ContentSchema>, ParseError> {
    let mut content = BTreeMap::new();
    let Some(content_obj) = obj.get("content").and_then(|v| v.as_object()) else {
        return Ok(content);
    };
    for (media_type, media_obj) in content_obj {
        let raw_schema = media_obj.as_object().and_then(|o| o.get("schema"));
        content.insert(
            media_type.to_ascii_lowercase(),
            ContentSchema {
                schema: inline_schema(raw_schema, root)?,
            },
        );
    }
    Ok(content)
}

fn parse_request_body(
    obj: &Map<String, Value>,
    root: &Value,
) -> Result<Option<RequestBody>, ParseError> {
    let Some(body_value) = obj.get("requestBody") else {
        return Ok(None);
    };
    let body = deref_object(body_value, root, "requestBody")?;

    let required = body
        .get("required")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    if !body.contains_key("content") {
        return Ok(None);
    }

    Ok(Some(RequestBody {
        required,
        content: parse_content(body, root)?,
    }))
}

fn parse_responses(
    obj: &Map<String, Value>,
    root: &Value,
) -> Result<BTreeMap<String, ResponseSpec>, ParseError> {
    let mut responses = BTreeMap::new();
    let Some(responses_obj) = obj.get("responses").and_then(|v| v.as_object()) else {
        return Ok(responses);
    };

    for (status_key, response_value) in responses_obj {
        if status_key.starts_with("x-") {
            continue;
        }
        let response_obj = deref_object(response_value, root, &format!("response '{}'", status_key))?;

        let mut headers = BTreeMap::new();
        if let Some(headers_obj) = response_obj.get("headers").and_then(|v| v.as_object()) {
            for (name, header_value) in headers_obj {
                let header_obj = deref_object(header_value, root, &format!("header '{}'", name))?;
                let raw_schema = header_obj
                    .get("schema")
                    .or_else(|| first_content_schema(header_obj));
                headers.insert(
                    name.to_ascii_lowercase(),
                    ResponseHeader {
                        required: header_obj
                            .get("required")
                            .and_then(|v| v.as_bool())
                            .unwrap_or(false),
                        schema: inline_schema(raw_schema, root)?,
                    },
                );
            }
        }

        responses.insert(
            status_key.to_uppercase(),
            ResponseSpec {
                headers,
                content: parse_content(response_obj, root)?,
            },
        );
    }

    Ok(responses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_openapi() {
        let yaml = r#"
openapi: "3.0.0"
info:
  title: Test API
  version: "1.0.0"
paths:
  /health:
    get:
      operationId: getHealth
      responses:
        '200':
          description: ok
"#;
        let spec = parse_spec(yaml).unwrap();
        assert_eq!(spec.version, "3.0.0");
        assert_eq!(spec.title, "Test API");
        assert_eq!(spec.api_version, "1.0.0");
        assert_eq!(spec.operations.len(), 1);

        let op = &spec.operations[0];
        assert_eq!(op.path, "/health");
        assert_eq!(op.method, "GET");
        assert_eq!(op.operation_id, Some("getHealth".to_string()));
        assert!(op.responses.contains_key("200"));
    }

    #[test]
    fn parse_json_contract() {
        let json = r#"{
            "openapi": "3.1.0",
            "info": {"title": "Json", "version": "2"},
            "paths": {"/ping": {"post": {"responses": {"204": {"description": "ok"}}}}}
        }"#;
        let spec = parse_spec(json).unwrap();
        assert_eq!(spec.operations[0].method, "POST");
        assert!(spec.operations[0].responses.contains_key("204"));
    }

    #[test]
    fn unquoted_status_keys_are_strings() {
        let yaml = r#"
openapi: "3.0.0"
info:
  title: Test
  version: "1"
paths:
  /a:
    get:
      responses:
        200:
          description: ok
        4xx:
          description: client error
"#;
        let spec = parse_spec(yaml).unwrap();
        let responses = &spec.operations[0].responses;
        assert!(responses.contains_key("200"));
        assert!(responses.contains_key("4XX"));
    }

    #[test]
    fn parse_path_with_parameters() {
        let yaml = r#"
openapi: "3.0.0"
info:
  title: Test API
  version: "1.0.0"
paths:
  /users/{id}:
    get:
      parameters:
        - name: id
          in: path
          required: true
          schema:
            type: integer
      responses:
        '200':
          description: ok
"#;
        let spec = parse_spec(yaml).unwrap();
        let op = &spec.operations[0];
        assert_eq!(op.parameters.len(), 1);

        let param = &op.parameters[0];
        assert_eq!(param.name, "id");
        assert_eq!(param.location, "path");
        assert!(param.required);
        assert_eq!(param.schema, Some(serde_json::json!({"type": "integer"})));
    }

    #[test]
    fn operation_parameter_overrides_path_parameter() {
        let yaml = r#"
openapi: "3.0.0"
info:
  title: Test
  version: "1"
paths:
  /items:
    parameters:
      - name: limit
        in: query
        schema:
          type: integer
      - name: trace
        in: header
    get:
      parameters:
        - name: limit
          in: query
          required: true
          schema:
            type: string
      responses:
        '200':
          description: ok
"#;
        let spec = parse_spec(yaml).unwrap();
        let params = &spec.operations[0].parameters;
        assert_eq!(params.len(), 2);

        let limit = params.iter().find(|p| p.name == "limit").unwrap();
        assert!(limit.required);
        assert_eq!(limit.schema, Some(serde_json::json!({"type": "string"})));
        assert!(params.iter().any(|p| p.name == "trace"));
    }

    #[test]
    fn reject_openapi_2() {
        let yaml = r#"
openapi: "2.0"
info:
  title: Old
  version: "1"
"#;
        assert!(matches!(parse_spec(yaml), Err(ParseError::SchemaError(_))));
    }

    #[test]
    fn reject_unknown_format() {
        let yaml = r#"
swagger: "2.0"
info:
  title: Old
"#;
        assert!(matches!(parse_spec(yaml), Err(ParseError::UnknownFormat)));
    }

    #[test]
    fn reject_malformed_document() {
        assert!(matches!(
            parse_spec("openapi: [unterminated"),
            Err(ParseError::ParseError(_))
        ));
        assert!(matches!(
            parse_spec("- just\n- a list\n"),
            Err(ParseError::ParseError(_))
        ));
    }

    #[test]
    fn missing_info_title_is_an_error() {
        let yaml = r#"
openapi: "3.0.0"
info:
  version: "1"
"#;
        assert!(matches!(parse_spec(yaml), Err(ParseError::SchemaError(_))));
    }

    #[test]
    fn parse_multiple_methods() {
        let yaml = r#"
openapi: "3.0.0"
info:
  title: Test
  version: "1"
paths:
  /pets:
    get:
      responses:
        '200':
          description: ok
    post:
      responses:
        '201':
          description: created
"#;
        let spec = parse_spec(yaml).unwrap();
        let mut methods: Vec<_> = spec.operations.iter().map(|o| o.method.as_str()).collect();
        methods.sort();
        assert_eq!(methods, vec!["GET", "POST"]);
    }

    #[test]
    fn parse_request_body() {
        let yaml = r#"
openapi: "3.0.0"
info:
  title: Test
  version: "1"
paths:
  /pets:
    post:
      requestBody:
        required: true
        content:
          application/json:
            schema:
              type: object
              required: [name]
      responses:
        '201':
          description: created
"#;
        let spec = parse_spec(yaml).unwrap();
        let body = spec.operations[0]
            .request_body
            .as_ref()
            .expect("should have request body");
        assert!(body.required);
        let json_content = body
            .content
            .get("application/json")
            .expect("should have json content");
        let schema = json_content.schema.as_ref().expect("should have schema");
        assert_eq!(schema["required"], serde_json::json!(["name"]));
    }

    #[test]
    fn parse_response_headers_and_content() {
        let yaml = r#"
openapi: "3.0.0"
info:
  title: Test
  version: "1"
paths:
  /pets:
    get:
      responses:
        '200':
          description: ok
          headers:
            X-Next:
              required: true
              schema:
                type: string
          content:
            application/json:
              schema:
                type: array
        default:
          description: error
"#;
        let spec = parse_spec(yaml).unwrap();
        let responses = &spec.operations[0].responses;

        let ok = &responses["200"];
        let header = ok.headers.get("x-next").expect("header names are lowercased");
        assert!(header.required);
        assert_eq!(
            ok.content["application/json"].schema,
            Some(serde_json::json!({"type": "array"}))
        );

        let fallback = &responses["DEFAULT"];
        assert!(fallback.content.is_empty());
    }

    #[test]
    fn resolve_component_refs() {
        let yaml = r##"
openapi: "3.0.0"
info:
  title: Test
  version: "1"
paths:
  /pets/{id}:
    parameters:
      - $ref: "#/components/parameters/PetId"
    get:
      responses:
        '200':
          $ref: "#/components/responses/PetResponse"
components:
  parameters:
    PetId:
      name: id
      in: path
      required: true
      schema:
        $ref: "#/components/schemas/Id"
  responses:
    PetResponse:
      description: a pet
      content:
        application/json:
          schema:
            $ref: "#/components/schemas/Pet"
  schemas:
    Id:
      type: integer
    Pet:
      type: object
      properties:
        id:
          $ref: "#/components/schemas/Id"
"##;
        let spec = parse_spec(yaml).unwrap();
        let op = &spec.operations[0];
        assert_eq!(op.parameters[0].name, "id");
        assert_eq!(
            op.parameters[0].schema,
            Some(serde_json::json!({"type": "integer"}))
        );
        let schema = op.responses["200"].content["application/json"]
            .schema
            .as_ref()
            .unwrap();
        assert_eq!(schema["properties"]["id"], serde_json::json!({"type": "integer"}));
    }

    #[test]
    fn unresolved_ref_is_an_error() {
        let yaml = r##"
openapi: "3.0.0"
info:
  title: Test
  version: "1"
paths:
  /pets:
    get:
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Missing"
"##;
        assert!(matches!(parse_spec(yaml), Err(ParseError::UnresolvedRef(_))));
    }

    #[test]
    fn circular_ref_is_an_error() {
        let yaml = r##"
openapi: "3.0.0"
info:
  title: Test
  version: "1"
paths:
  /nodes:
    get:
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Node"
components:
  schemas:
    Node:
      type: object
      properties:
        next:
          $ref: "#/components/schemas/Node"
"##;
        assert!(matches!(parse_spec(yaml), Err(ParseError::SchemaError(_))));
    }

    #[test]
    fn parse_from_file_records_filename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.yaml");
        std::fs::write(
            &path,
            "openapi: \"3.0.0\"\ninfo:\n  title: File\n  version: \"1\"\npaths: {}\n",
        )
        .unwrap();

        let spec = parse_spec_file(&path).unwrap();
        assert_eq!(spec.filename.as_deref(), Some("api.yaml"));
        assert!(spec.operations.is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = parse_spec_file(std::path::Path::new("/nonexistent/api.yaml"));
        assert!(matches!(result, Err(ParseError::Io(_))));
    }
}
