//! Scalar helpers shared by the entity decoders.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// Extension keys that are not part of an entity's fixed schema.
///
/// Values are normalised to JSON so they can be handed to any JSON consumer
/// without further conversion.
pub type CustomProperties = BTreeMap<String, serde_json::Value>;

/// A value that may be written as a single string or as a list of strings.
///
/// Always exposes a list; an empty list encodes as `""`, a single value as a
/// plain string and anything longer as a sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringOrStringArray {
    pub values: Vec<String>,
}

impl StringOrStringArray {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for StringOrStringArray {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.values.as_slice() {
            [] => serializer.serialize_str(""),
            [single] => serializer.serialize_str(single),
            many => many.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for StringOrStringArray {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            One(String),
            Many(Vec<String>),
        }

        let values = match Option::<Repr>::deserialize(deserializer)? {
            None => vec![],
            Some(Repr::One(value)) if value.is_empty() => vec![],
            Some(Repr::One(value)) => vec![value],
            Some(Repr::Many(values)) => values,
        };
        Ok(Self { values })
    }
}

/// Splits a raw entity body into its reserved keys and everything else,
/// preserving declaration order on both sides.
pub(crate) fn split_reserved(mapping: Mapping, reserved: &[&str]) -> (Mapping, Mapping) {
    let mut known = Mapping::new();
    let mut rest = Mapping::new();
    for (key, value) in mapping {
        let is_reserved = key.as_str().is_some_and(|k| reserved.contains(&k));
        if is_reserved {
            known.insert(key, value);
        } else {
            rest.insert(key, value);
        }
    }
    (known, rest)
}

/// Decodes an entity body that may be absent (`stage:` with no value).
pub(crate) fn deserialize_body<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Mapping, D::Error> {
    Ok(Option::<Mapping>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decodes the reserved part of an entity body into its auxiliary struct.
pub(crate) fn decode_reserved<T: de::DeserializeOwned>(known: Mapping) -> serde_yaml::Result<T> {
    serde_yaml::from_value(Value::Mapping(known))
}

/// Normalises a custom-property remainder into string-keyed JSON values.
///
/// Top-level keys must be strings; nested mapping keys are stringified.
pub fn clean_custom_properties(mapping: Mapping) -> Result<CustomProperties, String> {
    let mut properties = CustomProperties::new();
    for (key, value) in mapping {
        let Value::String(key) = key else {
            return Err(format!(
                "custom property key {} is not a string",
                key_to_string(&key)
            ));
        };
        properties.insert(key, yaml_to_json(value));
    }
    Ok(properties)
}

/// Converts a decoded YAML value into a JSON value, stringifying map keys.
pub fn yaml_to_json(value: Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                serde_json::Value::from(i)
            } else if let Some(u) = n.as_u64() {
                serde_json::Value::from(u)
            } else {
                serde_json::Value::from(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => serde_json::Value::String(s),
        Value::Sequence(items) => {
            serde_json::Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        Value::Mapping(mapping) => serde_json::Value::Object(
            mapping
                .into_iter()
                .map(|(k, v)| (key_to_string(&k), yaml_to_json(v)))
                .collect(),
        ),
        Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn key_to_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Tagged(tagged) => key_to_string(&tagged.value),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_or_array_empty_document() {
        let value: StringOrStringArray = serde_yaml::from_str("").unwrap();
        assert!(value.values.is_empty());
    }

    #[test]
    fn test_string_or_array_single_value() {
        let value: StringOrStringArray = serde_yaml::from_str("singlevalue").unwrap();
        assert_eq!(value.values, vec!["singlevalue"]);
    }

    #[test]
    fn test_string_or_array_multiple_values() {
        let value: StringOrStringArray = serde_yaml::from_str("- value1\n- value2").unwrap();
        assert_eq!(value.values, vec!["value1", "value2"]);
    }

    #[test]
    fn test_string_or_array_yaml_encoding() {
        assert_eq!(
            serde_yaml::to_string(&StringOrStringArray::default()).unwrap(),
            "''\n"
        );
        assert_eq!(
            serde_yaml::to_string(&StringOrStringArray::new(["singlevalue"])).unwrap(),
            "singlevalue\n"
        );
        assert_eq!(
            serde_yaml::to_string(&StringOrStringArray::new(["value1", "value2"])).unwrap(),
            "- value1\n- value2\n"
        );
    }

    #[test]
    fn test_string_or_array_json_encoding() {
        assert_eq!(
            serde_json::to_string(&StringOrStringArray::default()).unwrap(),
            "\"\""
        );
        assert_eq!(
            serde_json::to_string(&StringOrStringArray::new(["value1", "value2"])).unwrap(),
            "[\"value1\",\"value2\"]"
        );

        let parsed: StringOrStringArray = serde_json::from_str("\"\"").unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_contains() {
        let values = StringOrStringArray::new(["value1", "value2"]);
        assert!(values.contains("value2"));
        assert!(!values.contains("value3"));
        assert!(!StringOrStringArray::default().contains("value3"));
    }

    #[test]
    fn test_clean_stringifies_nested_keys() {
        let mapping: Mapping = serde_yaml::from_str(
            r#"
volume:
  items:
  - mode: 600
    1: one
    true: yes-key
"#,
        )
        .unwrap();

        let cleaned = clean_custom_properties(mapping).unwrap();
        let item = &cleaned["volume"]["items"][0];
        assert_eq!(item["mode"], serde_json::json!(600));
        assert_eq!(item["1"], serde_json::json!("one"));
        assert_eq!(item["true"], serde_json::json!("yes-key"));
    }

    #[test]
    fn test_clean_rejects_non_string_top_level_key() {
        let mapping: Mapping = serde_yaml::from_str("1: one").unwrap();
        assert!(clean_custom_properties(mapping).is_err());
    }

    #[test]
    fn test_split_reserved_keeps_order() {
        let mapping: Mapping = serde_yaml::from_str("b: 1\nimage: x\na: 2").unwrap();
        let (known, rest) = split_reserved(mapping, &["image"]);
        assert_eq!(known.len(), 1);
        let rest_keys: Vec<_> = rest.keys().filter_map(|k| k.as_str()).collect();
        assert_eq!(rest_keys, vec!["b", "a"]);
    }
}
