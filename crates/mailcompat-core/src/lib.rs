pub mod audit;
pub mod catalogs;
pub mod dataset;
pub mod error;
pub mod ffi;
pub mod naming;
pub mod scoring;
pub mod tokenizer;
pub mod types;
pub mod validator;

pub use audit::{AccessibilityAudit, AuditOutcome, AuditStatus, AuditSummary};
pub use catalogs::{BUNDLED_SOURCE, DEFAULT_IGNORED_TOKENS, REFERENCE_URL};
pub use dataset::{Dataset, DatasetInfo};
pub use error::{Error, Result};
pub use ffi::{dataset_info_to_json, validate_to_json};
pub use naming::derive_feature_names;
pub use scoring::score;
pub use tokenizer::tokenize;
pub use types::*;
pub use validator::{ignore_tokens, validate, ValidationRequest, Validator};
