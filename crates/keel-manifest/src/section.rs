//! Ordered sections: a mapping from entity name to entity body where
//! declaration order matters.
//!
//! Decoding is two-phase. The section is first read as an ordered list of
//! `(key, raw body)` pairs, then each body is decoded into its entity and the
//! key assigned as the entity name.

use serde::de::DeserializeOwned;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;

/// An entity that lives under a key in an ordered section.
pub trait Named {
    /// Whether a non-empty `name` declared in the entity body wins over the
    /// section key.
    const KEEPS_DECLARED_NAME: bool;

    fn name(&self) -> &str;

    fn set_name(&mut self, name: String);
}

/// Decodes an ordered section into a list of named entities.
///
/// Errors name the section and the key of the entity that failed.
pub(crate) fn decode_section<T>(section: &str, mapping: Mapping) -> Result<Vec<T>, String>
where
    T: Named + DeserializeOwned,
{
    let mut entities = Vec::with_capacity(mapping.len());
    for (key, body) in mapping {
        let Some(key) = key.as_str().map(str::to_string) else {
            return Err(format!("{section}: entity key {key:?} is not a string"));
        };

        let mut entity: T = serde_yaml::from_value(body_or_empty(body))
            .map_err(|e| format!("{section}.{key}: {e}"))?;

        if !T::KEEPS_DECLARED_NAME || entity.name().is_empty() {
            entity.set_name(key);
        }
        entities.push(entity);
    }
    Ok(entities)
}

fn body_or_empty(body: Value) -> Value {
    match body {
        Value::Null => Value::Mapping(Mapping::new()),
        other => other,
    }
}

/// Encodes a list of named entities back into an ordered section.
pub(crate) struct Section<'a, T>(pub &'a [T]);

impl<T: Named + Serialize> Serialize for Section<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entity in self.0 {
            map.serialize_entry(entity.name(), entity)?;
        }
        map.end()
    }
}

/// `serialize_with` adapter for section fields.
pub(crate) fn serialize_section<T, S>(entities: &[T], serializer: S) -> Result<S::Ok, S::Error>
where
    T: Named + Serialize,
    S: Serializer,
{
    Section(entities).serialize(serializer)
}

/// Fails on the first name declared twice within one section.
pub(crate) fn ensure_unique_names<T: Named>(section: &str, entities: &[T]) -> crate::Result<()> {
    let mut seen = HashSet::with_capacity(entities.len());
    for entity in entities {
        if !seen.insert(entity.name()) {
            return Err(crate::Error::Validation(format!(
                "{section} declares {} more than once",
                entity.name()
            )));
        }
    }
    Ok(())
}
