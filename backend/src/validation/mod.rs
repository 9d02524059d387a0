//! JSON Schema validation of Normalize request bodies.
//!
//! Checking the raw JSON before deserializing gives the caller every problem
//! at once instead of serde's first-error-only message.
//!
//! The schema is embedded at compile time from
//! `schemas/test-submissions.json`.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use lomastery::validation::validate_test_submissions;
//!
//! let body = json!([{ "name": "Unit 1", "datFile": "ASMITH 1101 3", "loFile": "1122" }]);
//! assert!(validate_test_submissions(&body).is_ok());
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

static TEST_SUBMISSIONS_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/test-submissions.json"))
        .expect("Invalid embedded schema")
});

/// Validate a JSON value against a Draft 7 schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with one message per violation
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

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

/// Validate a Normalize request body (array of test submissions).
pub fn validate_test_submissions(data: &Value) -> Result<(), Vec<String>> {
    validate(&TEST_SUBMISSIONS_SCHEMA, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_submissions() {
        let body = json!([
            {
                "name": "Unit 1",
                "identifier": "u1",
                "datFile": "ASMITH 1101 3\n",
                "datFileName": "unit1.dat",
                "loFile": "1122",
                "loFileName": "unit1.lo"
            },
            { "Name": "Unit 2", "DatFile": "AJONES 11 2", "LOFile": "33" }
        ]);
        assert!(validate_test_submissions(&body).is_ok());
    }

    #[test]
    fn test_empty_list_is_valid() {
        assert!(validate_test_submissions(&json!([])).is_ok());
    }

    #[test]
    fn test_missing_result_text() {
        let body = json!([{ "name": "Unit 1", "loFile": "11" }]);
        assert!(validate_test_submissions(&body).is_err());
    }

    #[test]
    fn test_one_error_per_violation() {
        let body = json!([
            { "datFile": "ASMITH 11 2", "loFile": "11" },
            { "datFile": "ASMITH 11 2", "loFile": 11 }
        ]);
        let errors = validate_test_submissions(&body).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("string"));
    }

    #[test]
    fn test_every_key_spelling_is_type_checked() {
        let body = json!([
            { "DatFile": "ASMITH 11 2", "LoFile": 11 },
            { "DatFile": "ASMITH 11 2", "LoFileName": false }
        ]);
        let errors = validate_test_submissions(&body).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_object_body_rejected() {
        let body = json!({ "datFile": "ASMITH 11 2" });
        assert!(validate_test_submissions(&body).is_err());
    }
}
