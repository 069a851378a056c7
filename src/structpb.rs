//! Conversion between `google.protobuf.Struct` and JSON
//!
//! Resources travel over the wire as protobuf `Struct`s but are much easier to
//! handle as `serde_json::Value`. Protobuf has a single `double` number type,
//! so whole numbers are turned back into JSON integers on the way out. Without
//! that, fields like `metadata.generation` would not deserialize into `i64`.

use std::collections::BTreeMap;

use prost_types::value::Kind;
use prost_types::{ListValue, Struct, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number};

use crate::{Error, Result};

/// Largest integer an f64 represents exactly (2^53).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Convert a protobuf `Struct` into a JSON object
pub fn struct_to_json(s: &Struct) -> serde_json::Value {
    serde_json::Value::Object(
        s.fields
            .iter()
            .map(|(k, v)| (k.clone(), value_to_json(v)))
            .collect::<Map<_, _>>(),
    )
}

fn value_to_json(v: &Value) -> serde_json::Value {
    match &v.kind {
        None | Some(Kind::NullValue(_)) => serde_json::Value::Null,
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(*b),
        Some(Kind::NumberValue(n)) => number_to_json(*n),
        Some(Kind::StringValue(s)) => serde_json::Value::String(s.clone()),
        Some(Kind::StructValue(s)) => struct_to_json(s),
        Some(Kind::ListValue(l)) => {
            serde_json::Value::Array(l.values.iter().map(value_to_json).collect())
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return serde_json::Value::Number(Number::from(n as i64));
    }
    // NaN and infinities have no JSON form
    Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Convert a JSON value into a protobuf `Struct`
///
/// Fails unless the value is a JSON object.
pub fn json_to_struct(value: &serde_json::Value) -> Result<Struct> {
    match value {
        serde_json::Value::Object(map) => Ok(map_to_struct(map)),
        other => Err(Error::serialization(format!(
            "expected a JSON object, got {}",
            json_type_name(other)
        ))),
    }
}

fn map_to_struct(map: &Map<String, serde_json::Value>) -> Struct {
    Struct {
        fields: map
            .iter()
            .map(|(k, v)| (k.clone(), json_to_value(v)))
            .collect::<BTreeMap<_, _>>(),
    }
}

fn json_to_value(v: &serde_json::Value) -> Value {
    let kind = match v {
        serde_json::Value::Null => Kind::NullValue(0),
        serde_json::Value::Bool(b) => Kind::BoolValue(*b),
        serde_json::Value::Number(n) => Kind::NumberValue(n.as_f64().unwrap_or_default()),
        serde_json::Value::String(s) => Kind::StringValue(s.clone()),
        serde_json::Value::Array(items) => Kind::ListValue(ListValue {
            values: items.iter().map(json_to_value).collect(),
        }),
        serde_json::Value::Object(map) => Kind::StructValue(map_to_struct(map)),
    };
    Value { kind: Some(kind) }
}

/// Serialize any value into a protobuf `Struct`
pub fn to_struct<T: Serialize>(value: &T) -> Result<Struct> {
    let json = serde_json::to_value(value)
        .map_err(|e| Error::serialization(format!("cannot encode value as JSON: {e}")))?;
    json_to_struct(&json)
}

/// Deserialize a protobuf `Struct` into a typed value
pub fn from_struct<T: DeserializeOwned>(s: &Struct) -> serde_json::Result<T> {
    serde_json::from_value(struct_to_json(s))
}

fn json_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
