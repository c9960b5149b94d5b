//! JSON-schema validation of free-form manifest metadata.

use crate::ports::{SchemaValidation, SchemaValidator};
use crate::{Error, Result};
use serde_json::Value;

/// [`SchemaValidator`] backed by the `jsonschema` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaValidator;

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, schema: &str, document: &[u8]) -> Result<SchemaValidation> {
        let schema: Value = serde_json::from_str(schema)
            .map_err(|e| Error::Validation(format!("metadata schema is not valid JSON: {e}")))?;
        let document: Value = serde_json::from_slice(document)?;

        let validator = jsonschema::validator_for(&schema)
            .map_err(|e| Error::Validation(format!("metadata schema is invalid: {e}")))?;

        let errors: Vec<String> = validator
            .iter_errors(&document)
            .map(|e| e.to_string())
            .collect();

        Ok(SchemaValidation {
            valid: errors.is_empty(),
            errors,
        })
    }
}
