//! Field access over untagged upstream JSON.
//!
//! This is the only place where payload shape is inspected. Values of the
//! wrong type are treated as absent so that construction stays total.

use serde::Deserializer;
use serde::de::Error as _;
use serde_json::{Map, Value};

/// Scalar types a parameter field may hold.
pub trait FieldValue: Sized + Copy {
    fn from_json(value: &Value) -> Option<Self>;
}

impl FieldValue for f64 {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FieldValue for bool {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FieldValue for u32 {
    fn from_json(value: &Value) -> Option<Self> {
        if let Some(n) = value.as_u64() {
            return u32::try_from(n).ok();
        }
        let f = value.as_f64()?;
        if f.fract() == 0.0 && f >= 0.0 && f <= f64::from(u32::MAX) {
            Some(f as u32)
        } else {
            None
        }
    }
}

/// Read-only view over one JSON object.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    pub fn new(map: &'a Map<String, Value>) -> Self {
        Self { map }
    }

    pub fn of(value: &'a Value) -> Option<Self> {
        value.as_object().map(Self::new)
    }

    /// Present and not `null`.
    pub fn value(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    pub fn has(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    pub fn has_all(&self, keys: &[&str]) -> bool {
        keys.iter().all(|key| self.has(key))
    }

    pub fn get<T: FieldValue>(&self, key: &str) -> Option<T> {
        self.value(key).and_then(T::from_json)
    }

    pub fn text(&self, key: &str) -> Option<String> {
        self.value(key).and_then(Value::as_str).map(str::to_string)
    }

    pub fn list(&self, key: &str) -> Option<&'a Vec<Value>> {
        self.value(key).and_then(Value::as_array)
    }
}

/// Deserializes any self-describing input into a JSON object and hands it to
/// `build`. Non-object input is rejected with `what` in the message.
pub(crate) fn deserialize_object<'de, D, T>(
    deserializer: D,
    what: &'static str,
    build: impl FnOnce(Fields<'_>) -> T,
) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
{
    let value = <Value as serde::Deserialize>::deserialize(deserializer)?;
    match Fields::of(&value) {
        Some(fields) => Ok(build(fields)),
        None => Err(D::Error::custom(format!("{what} must be an object"))),
    }
}
