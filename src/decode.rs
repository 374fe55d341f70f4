//! Decoding rendered text into structured objects.

use serde::Deserialize;
use serde_json::Value;

use crate::core::{BoxError, Object};

/// Turns rendered text into an ordered sequence of objects.
pub trait Decoder: Send + Sync {
    /// Decode `text`, preserving document order.
    fn decode(&self, text: &str) -> Result<Vec<Object>, BoxError>;
}

/// Multi-document YAML decoder.
///
/// Documents are separated by `---`. Empty and null documents (including
/// comment-only ones) are skipped; any other non-mapping document is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlDecoder;

impl Decoder for YamlDecoder {
    fn decode(&self, text: &str) -> Result<Vec<Object>, BoxError> {
        let mut objects = Vec::new();

        for (index, document) in serde_yaml::Deserializer::from_str(text).enumerate() {
            let value = Value::deserialize(document)
                .map_err(|e| format!("document {}: {e}", index + 1))?;
            match value {
                Value::Null => {}
                Value::Object(map) => objects.push(Object::new(map)),
                other => {
                    return Err(format!(
                        "document {} is a {}, expected a mapping",
                        index + 1,
                        type_name(&other)
                    )
                    .into());
                }
            }
        }

        Ok(objects)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

/// Whether an output name should be decoded as YAML.
#[must_use]
pub fn is_yaml_output(name: &str) -> bool {
    name.ends_with(".yaml") || name.ends_with(".yml")
}
