//! value representation
//!
//! The configuration tree contains the following data types
//! - null (an explicit `~`/`null` in a document)
//! - boolean (true/false)
//! - integer (signed, i64)
//! - decimal (f64)
//! - string (utf-8)
//! - array ("list" of values)
//! - object (order-preserving "map"/"dictionary", where the key is of type string)
//!
//! Documents may use non-string scalar keys (`8080: ...`); those are stringified when converted.
//! Integers outside of the i64 range are stored as decimals.
//!
use indexmap::IndexMap;
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serializer,
};

pub type Object = IndexMap<String, Value>;

/// All possible value types
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Array(Vec<Value>),
    Object(Object),
}

impl Value {
    /// Parses a single YAML document
    ///
    /// An empty document parses as [Value::Null].
    pub fn from_yaml_str(source: &str) -> Result<Self, serde_yaml::Error> {
        let parsed: serde_yaml::Value = serde_yaml::from_str(source)?;
        Ok(parsed.into())
    }

    pub fn empty_object() -> Self {
        Value::Object(Object::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Type name used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Object member lookup. Anything but an object has no members.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|object| object.get(key))
    }

    /// Walks nested objects. An empty path returns `self`.
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        path.iter()
            .try_fold(self, |current, key| current.get(key.as_ref()))
    }

    /// `Some` for anything but a missing key or an explicit null
    pub fn get_present(&self, key: &str) -> Option<&Value> {
        self.get(key).filter(|value| !value.is_null())
    }

    /// Merges `incoming` into `self`
    ///
    /// Objects are merged key by key (recursively). Every other incoming value, including arrays, replaces the
    /// existing value outright.
    pub fn deep_merge(&mut self, incoming: Value) {
        match (self, incoming) {
            (Value::Object(existing), Value::Object(incoming)) => {
                for (key, value) in incoming {
                    match existing.get_mut(&key) {
                        Some(current) => current.deep_merge(value),
                        None => {
                            existing.insert(key, value);
                        }
                    }
                }
            }
            (existing, incoming) => *existing = incoming,
        }
    }

    /// Renders a value for substitution into a string
    ///
    /// Strings are used verbatim, null renders as an empty string, everything else renders as compact JSON.
    pub fn to_template_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => serde_json::to_string(other).unwrap_or_default(),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<K: ToString, V: Into<Value>> From<IndexMap<K, V>> for Value {
    fn from(value: IndexMap<K, V>) -> Self {
        Value::Object(
            value
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into()))
                .collect(),
        )
    }
}

impl From<serde_yaml::Number> for Value {
    fn from(value: serde_yaml::Number) -> Self {
        if let Some(int) = value.as_i64() {
            return Value::Integer(int);
        }

        // u64 beyond i64::MAX, or an actual float
        Value::Decimal(value.as_f64().unwrap_or(f64::NAN))
    }
}

impl From<serde_yaml::Value> for Value {
    fn from(value: serde_yaml::Value) -> Value {
        use serde_yaml::Value as Yaml;

        match value {
            Yaml::Null => Value::Null,
            Yaml::Bool(b) => b.into(),
            Yaml::Number(n) => n.into(),
            Yaml::String(s) => s.into(),
            Yaml::Sequence(seq) => seq.into(),
            Yaml::Mapping(mapping) => Value::Object(
                mapping
                    .into_iter()
                    .map(|(k, v)| (yaml_key(k), v.into()))
                    .collect(),
            ),
            Yaml::Tagged(tagged) => tagged.value.into(),
        }
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => s,
        Yaml::Bool(b) => b.to_string(),
        Yaml::Number(n) => n.to_string(),
        Yaml::Null => "null".to_string(),
        Yaml::Tagged(tagged) => yaml_key(tagged.value),
        complex => serde_yaml::to_string(&complex)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Value {
        use serde_json::Value as Json;

        match value {
            Json::Null => Value::Null,
            Json::Bool(b) => b.into(),
            Json::Number(n) => match n.as_i64() {
                Some(int) => Value::Integer(int),
                None => Value::Decimal(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => s.into(),
            Json::Array(array) => array.into(),
            Json::Object(object) => Value::Object(
                object.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Decimal(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::Array(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Object(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn yaml(source: &str) -> Value {
        Value::from_yaml_str(source).expect("valid yaml")
    }

    #[test]
    fn arrays_are_replaced_on_merge() {
        let mut base = yaml("server: { ports: [3000], host: localhost }");
        base.deep_merge(yaml("server: { ports: [8080, 8081] }"));

        assert_eq!(
            base,
            yaml("server: { ports: [8080, 8081], host: localhost }")
        );
    }

    #[test]
    fn scalar_replaces_object_and_back() {
        let mut base = yaml("a: { b: 1 }");
        base.deep_merge(yaml("a: 2"));
        assert_eq!(base, yaml("a: 2"));

        base.deep_merge(yaml("a: { c: 3 }"));
        assert_eq!(base, yaml("a: { c: 3 }"));
    }

    #[test]
    fn explicit_null_replaces() {
        let mut base = yaml("a: 1");
        base.deep_merge(yaml("a: ~"));
        assert_eq!(base.get("a"), Some(&Value::Null));
        assert_eq!(base.get_present("a"), None);
    }

    #[test]
    fn yaml_conversion() {
        let value = yaml("{ 8080: http, true: yes_key, big: 18446744073709551615, tagged: !secret abc }");
        let object = value.as_object().unwrap();

        assert_eq!(object.get("8080"), Some(&Value::from("http")));
        assert_eq!(object.get("true"), Some(&Value::from("yes_key")));
        assert!(matches!(object.get("big"), Some(Value::Decimal(_))));
        assert_eq!(object.get("tagged"), Some(&Value::from("abc")));
    }

    #[test]
    fn empty_document_is_null() {
        assert_eq!(yaml(""), Value::Null);
    }

    #[test]
    fn path_lookup() {
        let value = yaml("a: { b: { c: 42 } }");
        assert_eq!(value.get_path(&["a", "b", "c"]), Some(&Value::Integer(42)));
        assert_eq!(value.get_path(&["a", "x", "c"]), None);
        assert_eq!(value.get_path::<&str>(&[]), Some(&value));
    }

    #[test]
    fn template_strings() {
        assert_eq!(Value::from("plain").to_template_string(), "plain");
        assert_eq!(Value::Null.to_template_string(), "");
        assert_eq!(Value::Boolean(true).to_template_string(), "true");
        assert_eq!(Value::Integer(7).to_template_string(), "7");
        assert_eq!(Value::Decimal(2.0).to_template_string(), "2.0");
        assert_eq!(yaml("[1, a]").to_template_string(), r#"[1,"a"]"#);
        assert_eq!(yaml("{k: v}").to_template_string(), r#"{"k":"v"}"#);
    }
}
