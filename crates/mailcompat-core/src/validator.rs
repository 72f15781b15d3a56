use std::collections::HashSet;

use tracing::debug;

use crate::audit::{run_audit, AccessibilityAudit};
use crate::catalogs::DEFAULT_IGNORED_TOKENS;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::scoring::score;
use crate::tokenizer::tokenize;
use crate::types::*;

/// Scores HTML against one dataset, optionally with an accessibility auditor.
///
/// Holds only shared references, so a single validator can serve concurrent
/// calls; every call allocates its own tokens and report.
#[derive(Clone, Copy)]
pub struct Validator<'a> {
    dataset: &'a Dataset,
    auditor: Option<&'a dyn AccessibilityAudit>,
}

impl<'a> Validator<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self {
            dataset,
            auditor: None,
        }
    }

    pub fn with_auditor(mut self, auditor: &'a dyn AccessibilityAudit) -> Self {
        self.auditor = Some(auditor);
        self
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    /// Tokenize and score `html`. The audit, when requested, is recorded
    /// alongside and never changes the percentages.
    pub fn validate(&self, html: &str, options: &ValidateOptions) -> ValidationReport {
        let tokens = tokenize(html);
        let mut report = score(self.dataset, &tokens);
        if options.include_audit {
            report.audit = Some(run_audit(self.auditor, html, &options.audit_tags));
        }
        report
    }
}

/// Validate against the bundled dataset without an auditor.
pub fn validate(html: &str, include_audit: bool, audit_tags: &[String]) -> Result<ValidationReport> {
    let dataset = Dataset::bundled()?;
    let options = ValidateOptions {
        include_audit,
        audit_tags: audit_tags.to_vec(),
    };
    Ok(Validator::new(dataset).validate(html, &options))
}

/// Suppress `tokens` from the unknown list and the partial notes.
///
/// Matching is case-insensitive on trimmed values. When anything matched, the
/// report's ignored list is replaced by the suppressed entries (unknown ones
/// first). Percentages and client sets stay as scored.
pub fn ignore_tokens(mut report: ValidationReport, tokens: &[String]) -> ValidationReport {
    let normalized: HashSet<String> = normalize_list(tokens).into_iter().collect();
    if normalized.is_empty() {
        return report;
    }
    let matches = |token: &str| normalized.contains(&token.to_lowercase());

    let mut ignored = Vec::new();
    report.unknown_features.retain(|token| {
        if matches(token.as_str()) {
            ignored.push(token.clone());
            false
        } else {
            true
        }
    });
    ignored.extend(report.partial_notes.remove_where(matches));

    if !ignored.is_empty() {
        debug!(ignored = ignored.len(), "tokens suppressed from report");
        report.ignored_feature_count = ignored.len();
        report.ignored_features = ignored;
    }
    report
}

/// Trim, lowercase, drop blanks, keep the first of each duplicate.
fn normalize_list(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty())
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

/// Builder over [`Validator::validate`] plus [`ignore_tokens`].
///
/// ```
/// use mailcompat_core::{Dataset, ValidationRequest, Validator};
///
/// let dataset = Dataset::bundled().unwrap();
/// let report = ValidationRequest::new()
///     .html("<table><tr><td>hi</td></tr></table>")
///     .run(&Validator::new(dataset))
///     .unwrap();
/// assert!(report.unknown_features.iter().all(|t| t != "tag:html"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ValidationRequest {
    html: Option<String>,
    include_audit: bool,
    audit_tags: Vec<String>,
    ignore: Vec<String>,
}

impl ValidationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn audit(mut self, enable: bool) -> Self {
        self.include_audit = enable;
        self
    }

    pub fn audit_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        self.audit_tags = normalize_list(&tags);
        self
    }

    /// Tokens to suppress after scoring. An empty list keeps the default
    /// document-structure tags.
    pub fn ignore_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        self.ignore = normalize_list(&tokens);
        self
    }

    pub fn run(&self, validator: &Validator<'_>) -> Result<ValidationReport> {
        let html = self.html.as_deref().ok_or(Error::MissingHtml)?;
        let options = ValidateOptions {
            include_audit: self.include_audit,
            audit_tags: self.audit_tags.clone(),
        };
        let report = validator.validate(html, &options);
        Ok(ignore_tokens(report, &self.effective_ignore_list()))
    }

    fn effective_ignore_list(&self) -> Vec<String> {
        if self.ignore.is_empty() {
            DEFAULT_IGNORED_TOKENS.iter().map(|t| t.to_string()).collect()
        } else {
            self.ignore.clone()
        }
    }
}
