//! Typed extraction of fields from a parsed JSON document, keeping track of the dotted path of
//! every value so that schema errors can name the offending field.
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::params::join_path;

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn mismatch(path: &str, expected: &str, value: &Value) -> ConfigError {
    ConfigError::schema(
        path,
        format!("expected {}, found {}", expected, type_name(value)),
    )
}

/// Interpret a value as a float.
pub fn as_f64(path: &str, value: &Value) -> Result<f64, ConfigError> {
    value.as_f64().ok_or_else(|| mismatch(path, "a number", value))
}

/// Interpret a value as a non-negative integer. Floats such as `3.0` are rejected.
pub fn as_usize(path: &str, value: &Value) -> Result<usize, ConfigError> {
    match value {
        Value::Number(n) if n.is_u64() => n
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| ConfigError::range(path, "integer too large")),
        Value::Number(n) if n.is_i64() => Err(ConfigError::range(
            path,
            format!("must be non-negative, got {}", n),
        )),
        _ => Err(mismatch(path, "an integer", value)),
    }
}

/// Interpret a value as a string.
pub fn as_str<'a>(path: &str, value: &'a Value) -> Result<&'a str, ConfigError> {
    value.as_str().ok_or_else(|| mismatch(path, "a string", value))
}

/// Interpret a value as an array.
pub fn as_array<'a>(path: &str, value: &'a Value) -> Result<&'a Vec<Value>, ConfigError> {
    value.as_array().ok_or_else(|| mismatch(path, "an array", value))
}

/// The fields of a JSON object, consumed one by one.
///
/// Every accessor records the key it read; [`Fields::finish`] then rejects whatever was not read.
#[derive(Debug)]
pub struct Fields<'a> {
    path: String,
    map: &'a Map<String, Value>,
    seen: Vec<&'a str>,
}

impl<'a> Fields<'a> {
    pub fn new(path: &str, value: &'a Value) -> Result<Self, ConfigError> {
        let map = value
            .as_object()
            .ok_or_else(|| mismatch(if path.is_empty() { "$" } else { path }, "an object", value))?;
        Ok(Fields {
            path: path.to_string(),
            map,
            seen: Vec::with_capacity(map.len()),
        })
    }

    /// The dotted path of the object itself.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The dotted path of one of the object's fields.
    pub fn child(&self, key: &str) -> String {
        join_path(&self.path, key)
    }

    /// Returns true if the object has the given field.
    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// The field with the given key, if present.
    pub fn get(&mut self, key: &str) -> Option<&'a Value> {
        let (k, v) = self.map.get_key_value(key)?;
        self.seen.push(k.as_str());
        Some(v)
    }

    /// The field with the given key, or a schema error if missing.
    pub fn req(&mut self, key: &str) -> Result<&'a Value, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::schema(self.child(key), "missing required field"))
    }

    pub fn req_f64(&mut self, key: &str) -> Result<f64, ConfigError> {
        let value = self.req(key)?;
        as_f64(&self.child(key), value)
    }

    pub fn opt_f64(&mut self, key: &str) -> Result<Option<f64>, ConfigError> {
        self.get(key)
            .map(|value| as_f64(&self.child(key), value))
            .transpose()
    }

    pub fn req_usize(&mut self, key: &str) -> Result<usize, ConfigError> {
        let value = self.req(key)?;
        as_usize(&self.child(key), value)
    }

    pub fn opt_usize(&mut self, key: &str) -> Result<Option<usize>, ConfigError> {
        self.get(key)
            .map(|value| as_usize(&self.child(key), value))
            .transpose()
    }

    pub fn req_str(&mut self, key: &str) -> Result<&'a str, ConfigError> {
        let value = self.req(key)?;
        as_str(&self.child(key), value)
    }

    pub fn opt_str(&mut self, key: &str) -> Result<Option<&'a str>, ConfigError> {
        self.get(key)
            .map(|value| as_str(&self.child(key), value))
            .transpose()
    }

    /// A nested object.
    pub fn req_object(&mut self, key: &str) -> Result<Fields<'a>, ConfigError> {
        let value = self.req(key)?;
        Fields::new(&self.child(key), value)
    }

    pub fn opt_object(&mut self, key: &str) -> Result<Option<Fields<'a>>, ConfigError> {
        self.get(key)
            .map(|value| Fields::new(&self.child(key), value))
            .transpose()
    }

    /// A nested object mapping names to floats.
    pub fn req_f64_map(&mut self, key: &str) -> Result<BTreeMap<String, f64>, ConfigError> {
        self.req_object(key)?.into_f64_map()
    }

    pub fn opt_f64_map(&mut self, key: &str) -> Result<BTreeMap<String, f64>, ConfigError> {
        match self.opt_object(key)? {
            Some(fields) => fields.into_f64_map(),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Consume all fields as floats.
    pub fn into_f64_map(self) -> Result<BTreeMap<String, f64>, ConfigError> {
        self.map
            .iter()
            .map(|(k, v)| -> Result<(String, f64), ConfigError> {
                Ok((k.clone(), as_f64(&self.child(k), v)?))
            })
            .collect()
    }

    /// Iterate over all fields in document order, marking them as read.
    pub fn entries(&mut self) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        let map = self.map;
        self.seen.extend(map.keys().map(String::as_str));
        map.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Reject any field that was not read.
    pub fn finish(self) -> Result<(), ConfigError> {
        match self.map.keys().find(|k| !self.seen.contains(&k.as_str())) {
            Some(key) => Err(ConfigError::schema(self.child(key), "unknown field")),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_fields() {
        let value = json!({"w": 0.011, "neuron_type": "IF_cond_exp", "multiplicity": 2});
        let mut fields = Fields::new("topology", &value).unwrap();

        assert_eq!(fields.req_f64("w"), Ok(0.011));
        assert_eq!(fields.req_str("neuron_type"), Ok("IF_cond_exp"));
        assert_eq!(fields.req_usize("multiplicity"), Ok(2));
        assert_eq!(
            fields.req_f64("sigma_w"),
            Err(ConfigError::schema("topology.sigma_w", "missing required field"))
        );
        assert_eq!(fields.opt_f64("sigma_w"), Ok(None));
        assert_eq!(fields.finish(), Ok(()));
    }

    #[test]
    fn test_type_mismatch() {
        let value = json!({"burst_size": 2.5, "isi": "fast", "count": -3});
        let mut fields = Fields::new("input", &value).unwrap();

        assert_eq!(
            fields.req_usize("burst_size"),
            Err(ConfigError::schema(
                "input.burst_size",
                "expected an integer, found a number"
            ))
        );
        assert_eq!(
            fields.req_f64("isi"),
            Err(ConfigError::schema("input.isi", "expected a number, found a string"))
        );
        assert!(matches!(
            fields.req_usize("count"),
            Err(ConfigError::Range { .. })
        ));
    }

    #[test]
    fn test_unknown_field() {
        let value = json!({"burst_size": 1, "bust_size": 2});
        let mut fields = Fields::new("output", &value).unwrap();
        fields.req_usize("burst_size").unwrap();
        assert_eq!(
            fields.finish(),
            Err(ConfigError::schema("output.bust_size", "unknown field"))
        );
    }

    #[test]
    fn test_nested_objects() {
        let value = json!({"params": {"cm": 0.2, "v_rest": -50}, "bad": {"cm": "x"}});
        let mut fields = Fields::new("topology", &value).unwrap();

        let params = fields.req_f64_map("params").unwrap();
        assert_eq!(params.get("v_rest"), Some(&-50.0));
        assert_eq!(params.len(), 2);

        assert_eq!(
            fields.req_f64_map("bad").unwrap_err().path(),
            Some("topology.bad.cm")
        );
        assert_eq!(fields.opt_f64_map("param_noise"), Ok(BTreeMap::new()));

        assert!(matches!(
            Fields::new("data", &json!([1, 2])),
            Err(ConfigError::Schema { .. })
        ));
    }

    #[test]
    fn test_entries_in_document_order() {
        let value: Value =
            serde_json::from_str(r#"{"input.sigma_t": 1, "input.isi": 2, "data.n_bits_in": 3}"#)
                .unwrap();
        let mut fields = Fields::new("sweeps", &value).unwrap();
        let keys: Vec<&str> = fields.entries().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["input.sigma_t", "input.isi", "data.n_bits_in"]);
        assert_eq!(fields.finish(), Ok(()));
    }
}
