//! Port traits for the collaborators manifest validation depends on.

use crate::Result;

/// Outcome of checking a document against a JSON schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Validates a JSON document against a JSON schema.
pub trait SchemaValidator: Send + Sync {
    /// Check `document` (JSON bytes) against `schema` (JSON text).
    ///
    /// Returns an error only when the schema or document cannot be read; a
    /// non-conforming document is reported through [`SchemaValidation`].
    fn validate(&self, schema: &str, document: &[u8]) -> Result<SchemaValidation>;
}
