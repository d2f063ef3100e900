//! Serialization hooks and their defaults
//!
//! The default codec writes JSON text. On the way back, text is parsed and
//! already-structured values (written by a custom serializer that skips
//! stringification) pass through unchanged.

use std::rc::Rc;

use serde_json::Value;

/// State value → stored value
pub type Serializer = Rc<dyn Fn(&Value) -> anyhow::Result<Value>>;
/// Stored value → state value
pub type Deserializer = Rc<dyn Fn(Value) -> anyhow::Result<Value>>;
/// Transform applied to a slice right before it is serialized, given its key
pub type BeforeSerialize = Rc<dyn Fn(Value, &str) -> anyhow::Result<Value>>;
/// Transform applied to a slice right after it is deserialized, given its key
pub type AfterDeserialize = Rc<dyn Fn(Value, &str) -> anyhow::Result<Value>>;

pub fn json_serialize(value: &Value) -> anyhow::Result<Value> {
    Ok(Value::String(serde_json::to_string(value)?))
}

pub fn json_deserialize(raw: Value) -> anyhow::Result<Value> {
    match raw {
        Value::String(text) => Ok(serde_json::from_str(&text)?),
        other => Ok(other),
    }
}

pub fn identity(value: Value, _key: &str) -> anyhow::Result<Value> {
    Ok(value)
}

/// Stored values that mean "nothing persisted": missing, `null`, or the
/// literal text `"undefined"` left behind by JS writers.
pub fn is_absent(raw: Option<&Value>) -> bool {
    match raw {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text == "undefined",
        Some(_) => false,
    }
}
