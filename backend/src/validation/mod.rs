//! JSON Schema validation for import results.
//!
//! The normalized record graph is checked against JSON Schema Draft 7 before
//! it is handed to persistence. The schema is embedded at compile time from
//! `schemas/cpdl-import.json`.
//!
//! # Example
//!
//! ```rust,ignore
//! use cpdl_ingest::validation::validate_import_result;
//!
//! if let Err(errors) = validate_import_result(&result) {
//!     eprintln!("{}", errors.join("\n"));
//! }
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::models::ImportResult;

static IMPORT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/cpdl-import.json"))
        .expect("Invalid embedded schema")
});

/// Validate a JSON value against a schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with one message per violation
///
/// # Example
/// ```ignore
/// use serde_json::json;
///
/// let schema = json!({ "type": "object", "required": ["title"] });
/// assert!(validate(&schema, &json!({ "title": "Ecco" })).is_ok());
/// assert!(validate(&schema, &json!({ "composer": "Gesualdo" })).is_err());
/// ```
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator =
        jsonschema::draft7::new(schema).map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick true/false check.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate a serialized import result.
pub fn validate_import_json(data: &Value) -> Result<(), Vec<String>> {
    validate(&IMPORT_SCHEMA, data)
}

pub fn is_valid_import_json(data: &Value) -> bool {
    is_valid(&IMPORT_SCHEMA, data)
}

/// Serialize and validate an import result.
pub fn validate_import_result(result: &ImportResult) -> Result<(), Vec<String>> {
    let value = serde_json::to_value(result).map_err(|e| vec![e.to_string()])?;
    validate_import_json(&value)
}
