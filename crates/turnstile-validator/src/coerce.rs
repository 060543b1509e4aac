//! Turning raw parameter text into typed JSON according to its schema.
//!
//! Query strings, path segments and headers only carry text. Before schema
//! validation each value is converted to the JSON type its schema declares,
//! so `?flag=true` satisfies `type: boolean` and `?flag=yes` does not.

use serde_json::{Map, Value};

/// The primary JSON type a schema declares, ignoring `"null"` in type arrays.
pub(crate) fn schema_type(schema: Option<&Value>) -> Option<&str> {
    match schema?.get("type")? {
        Value::String(t) => Some(t.as_str()),
        Value::Array(types) => types
            .iter()
            .filter_map(|t| t.as_str())
            .find(|t| *t != "null"),
        _ => None,
    }
}

/// Coerce one raw value. Text that does not parse as the declared type is
/// left as a JSON string and rejected by the schema later.
pub(crate) fn coerce_scalar(raw: &str, schema: Option<&Value>) -> Value {
    match schema_type(schema) {
        Some("boolean") => match raw {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
        Some("integer") => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        Some("number") => parse_number(raw).unwrap_or_else(|| Value::String(raw.to_string())),
        Some("array") => coerce_items(raw.split(','), schema),
        _ => Value::String(raw.to_string()),
    }
}

/// Coerce a parameter that appeared `values.len()` times.
///
/// Array schemas take every occurrence (a single comma-separated occurrence
/// is split); other schemas take the first.
pub(crate) fn coerce_values(values: &[&str], schema: Option<&Value>) -> Value {
    match (schema_type(schema), values) {
        (_, []) => Value::Null,
        (Some("array"), [single]) => coerce_items(single.split(','), schema),
        (Some("array"), many) => coerce_items(many.iter().copied(), schema),
        (_, [first, ..]) => coerce_scalar(first, schema),
    }
}

fn coerce_items<'a>(raw_items: impl Iterator<Item = &'a str>, schema: Option<&Value>) -> Value {
    let item_schema = schema.and_then(|s| s.get("items"));
    Value::Array(
        raw_items
            .map(|item| coerce_scalar(item, item_schema))
            .collect(),
    )
}

fn parse_number(raw: &str) -> Option<Value> {
    if let Ok(i) = raw.parse::<i64>() {
        return Some(Value::from(i));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

/// Rewrite OpenAPI 3.0 `nullable: true` into a JSON Schema type union so the
/// schema engine accepts `null` where the contract does.
pub(crate) fn normalize_nullable(schema: &Value) -> Value {
    match schema {
        Value::Object(obj) => {
            let mut out = Map::with_capacity(obj.len());
            for (key, value) in obj {
                out.insert(key.clone(), normalize_nullable(value));
            }
            if out.get("nullable").and_then(|v| v.as_bool()) == Some(true) {
                out.remove("nullable");
                let widened = match out.get("type") {
                    Some(Value::String(t)) => Some(Value::Array(vec![
                        Value::String(t.clone()),
                        Value::String("null".into()),
                    ])),
                    Some(Value::Array(types)) if !types.iter().any(|t| t.as_str() == Some("null")) => {
                        let mut types = types.clone();
                        types.push(Value::String("null".into()));
                        Some(Value::Array(types))
                    }
                    _ => None,
                };
                if let Some(types) = widened {
                    out.insert("type".into(), types);
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(normalize_nullable).collect()),
        other => other.clone(),
    }
}
