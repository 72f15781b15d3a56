//! String-in, JSON-out API for bindings in other languages.
//!
//! Every outcome, failures included, comes back as a JSON envelope
//! `{"success": bool, "data"?: ..., "error"?: string}`.

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::Error;
use crate::validator::{ValidationRequest, Validator};

// ---------------------------------------------------------------------------
// Options types (deserialized from JSON input)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateJsonOptions {
    #[serde(default)]
    pub audit: bool,
    #[serde(default)]
    pub audit_tags: Vec<String>,
    #[serde(default)]
    pub ignore: Vec<String>,
}

// ---------------------------------------------------------------------------
// Result envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct FfiResult<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn success<T: Serialize>(data: T) -> String {
    let envelope = FfiResult {
        success: true,
        data: Some(data),
        error: None,
    };
    serde_json::to_string(&envelope)
        .unwrap_or_else(|e| failure(&format!("JSON serialization error: {e}")))
}

fn failure(message: &str) -> String {
    // Serializing a bool and a string cannot fail.
    serde_json::to_string(&FfiResult::<()> {
        success: false,
        data: None,
        error: Some(message.to_string()),
    })
    .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Public functions
// ---------------------------------------------------------------------------

/// Validate `html` against the bundled dataset.
///
/// `options_json` may be empty, which means default options; otherwise it is
/// an object with optional `audit`, `auditTags` and `ignore` fields.
pub fn validate_to_json(html: &str, options_json: &str) -> String {
    let options: ValidateJsonOptions = if options_json.trim().is_empty() {
        ValidateJsonOptions::default()
    } else {
        match serde_json::from_str(options_json) {
            Ok(o) => o,
            Err(e) => {
                let error = Error::InvalidOptions {
                    message: e.to_string(),
                };
                return failure(&error.to_string());
            }
        }
    };

    let dataset = match Dataset::bundled() {
        Ok(dataset) => dataset,
        Err(e) => return failure(&e.to_string()),
    };

    let result = std::panic::catch_unwind(|| {
        ValidationRequest::new()
            .html(html)
            .audit(options.audit)
            .audit_tags(options.audit_tags.iter().cloned())
            .ignore_tokens(options.ignore.iter().cloned())
            .run(&Validator::new(dataset))
    });

    match result {
        Ok(Ok(report)) => success(report),
        Ok(Err(e)) => failure(&e.to_string()),
        Err(_) => failure("Internal validator panic"),
    }
}

/// Dataset introspection counts as JSON.
pub fn dataset_info_to_json() -> String {
    match Dataset::bundled() {
        Ok(dataset) => success(dataset.info()),
        Err(e) => failure(&e.to_string()),
    }
}
