//! # Source Decoding
//!
//! Turns source text into a [`SchemaNode`] tree. The loader is generic over
//! the [`Decoder`] trait; [`YamlDecoder`] is the default because YAML is the
//! authoring format and every JSON document is also valid YAML.
//!
//! Decoding is deterministic: the same bytes always produce the same tree
//! shape, with mapping keys in document order.

use serde_json::Value;
use skema_core::{SchemaNode, SkemaError};

/// Decoder capability used by the loader.
pub trait Decoder: Send + Sync {
    /// Decode `source` into a fresh tree whose root is a mapping.
    ///
    /// # Errors
    ///
    /// Returns `MalformedInput` if the text does not decode or its root is
    /// not a mapping.
    fn decode(&self, source: &str) -> Result<SchemaNode, SkemaError>;
}

/// YAML decoder built on `serde_yaml`. Tags are stripped and scalar keys
/// are stringified.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlDecoder;

impl Decoder for YamlDecoder {
    fn decode(&self, source: &str) -> Result<SchemaNode, SkemaError> {
        SchemaNode::from_json(parse_yaml(source)?)
    }
}

/// Strict JSON decoder built on `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn decode(&self, source: &str) -> Result<SchemaNode, SkemaError> {
        let value: Value = serde_json::from_str(source)
            .map_err(|e| SkemaError::malformed("JSON source", e.to_string()))?;
        SchemaNode::from_json(value)
    }
}

/// Parse a YAML (or JSON) document into a JSON value.
///
/// # Errors
///
/// Returns `MalformedInput` for invalid YAML or values JSON cannot hold.
pub fn parse_yaml(source: &str) -> Result<Value, SkemaError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(source)
        .map_err(|e| SkemaError::malformed("YAML source", e.to_string()))?;
    yaml_to_json(&yaml).map_err(|reason| SkemaError::malformed("YAML source", reason))
}

/// Convert a `serde_yaml::Value` to a `serde_json::Value`.
fn yaml_to_json(yaml: &serde_yaml::Value) -> Result<Value, String> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(i.into()))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(u.into()))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("cannot represent float {f} in a schema"))
            } else {
                Err(format!("unsupported YAML number: {n:?}"))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => {
            let items: Result<Vec<Value>, String> = seq.iter().map(yaml_to_json).collect();
            Ok(Value::Array(items?))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut object = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    serde_yaml::Value::Null => "null".to_string(),
                    other => return Err(format!("unsupported YAML mapping key: {other:?}")),
                };
                object.insert(key, yaml_to_json(v)?);
            }
            Ok(Value::Object(object))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_yaml_decodes_in_document_order() {
        let source = "type: object\nproperties:\n  zeta: {type: string}\n  alpha: {type: integer}\n";
        let node = YamlDecoder.decode(source).unwrap();
        assert_eq!(node.keys(), vec!["type", "properties"]);
        assert_eq!(node.get_node("properties").unwrap().keys(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_yaml_accepts_json_text() {
        let node = YamlDecoder.decode(r#"{"type": "string", "minLength": 2}"#).unwrap();
        assert_eq!(node.to_json().unwrap(), json!({"type": "string", "minLength": 2}));
    }

    #[test]
    fn test_yaml_scalar_keys_are_stringified_and_tags_stripped() {
        let source = "enum: !custom [1, 2]\n200: ok\ntrue: yes\n";
        let node = YamlDecoder.decode(source).unwrap();
        assert_eq!(
            node.to_json().unwrap(),
            json!({"enum": [1, 2], "200": "ok", "true": "yes"})
        );
    }

    #[test]
    fn test_yaml_rejects_non_finite_float() {
        let err = YamlDecoder.decode("maximum: .inf\n").unwrap_err();
        assert!(matches!(err, SkemaError::MalformedInput { .. }));
    }

    #[test]
    fn test_yaml_rejects_invalid_text() {
        let err = YamlDecoder.decode("type: [unclosed\n").unwrap_err();
        assert!(matches!(err, SkemaError::MalformedInput { .. }));
    }

    #[test]
    fn test_root_must_be_mapping() {
        assert!(YamlDecoder.decode("- a\n- b\n").is_err());
        assert!(JsonDecoder.decode("[1]").is_err());
    }

    #[test]
    fn test_json_decoder() {
        let node = JsonDecoder.decode(r#"{"b": 1, "a": [true, null]}"#).unwrap();
        assert_eq!(node.keys(), vec!["b", "a"]);
        assert!(JsonDecoder.decode("b: 1").is_err());
    }

    #[test]
    fn test_decoding_is_deterministic() {
        let source = "properties:\n  a: {}\n  b: {items: [{}, {}]}\n";
        let first = YamlDecoder.decode(source).unwrap().to_json().unwrap();
        let second = YamlDecoder.decode(source).unwrap().to_json().unwrap();
        assert_eq!(first, second);
    }
}
