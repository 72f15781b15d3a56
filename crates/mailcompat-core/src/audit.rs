//! Seam for the accessibility audit.
//!
//! The audit itself runs in an external engine (a headless browser driving a
//! rule library). This crate only defines how an auditor is called and how its
//! outcome lands in the report; scoring never depends on it.

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Pass,
    Fail,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditOutcome {
    pub status: AuditStatus,
    pub issues: Vec<String>,
}

impl AuditOutcome {
    pub fn pass() -> Self {
        Self {
            status: AuditStatus::Pass,
            issues: Vec::new(),
        }
    }

    /// `fail` when any issue was found, `pass` otherwise.
    pub fn from_issues(issues: Vec<String>) -> Self {
        let status = if issues.is_empty() {
            AuditStatus::Pass
        } else {
            AuditStatus::Fail
        };
        Self { status, issues }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: AuditStatus::Error,
            issues: vec![message.into()],
        }
    }
}

/// An accessibility auditor for HTML documents.
pub trait AccessibilityAudit: Send + Sync {
    /// Audit `html`, restricting the rule set to `tags` when non-empty.
    fn audit(&self, html: &str, tags: &[String]) -> AuditOutcome;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub status: AuditStatus,
    pub issue_count: usize,
    pub issues: Vec<String>,
}

impl From<AuditOutcome> for AuditSummary {
    fn from(outcome: AuditOutcome) -> Self {
        Self {
            status: outcome.status,
            issue_count: outcome.issues.len(),
            issues: outcome.issues,
        }
    }
}

pub(crate) fn run_audit(
    auditor: Option<&dyn AccessibilityAudit>,
    html: &str,
    tags: &[String],
) -> AuditSummary {
    if html.trim().is_empty() {
        return AuditOutcome::pass().into();
    }
    let outcome = match auditor {
        Some(auditor) => auditor.audit(html, tags),
        None => AuditOutcome::error("No accessibility auditor is configured"),
    };
    debug!(status = ?outcome.status, issues = outcome.issues.len(), "accessibility audit finished");
    outcome.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedAudit(Vec<String>);

    impl AccessibilityAudit for FixedAudit {
        fn audit(&self, _html: &str, _tags: &[String]) -> AuditOutcome {
            AuditOutcome::from_issues(self.0.clone())
        }
    }

    #[test]
    fn blank_html_passes_without_auditor() {
        let summary = run_audit(None, "   ", &[]);
        assert_eq!(summary.status, AuditStatus::Pass);
        assert_eq!(summary.issue_count, 0);
    }

    #[test]
    fn missing_auditor_is_an_error() {
        let summary = run_audit(None, "<p>hi</p>", &[]);
        assert_eq!(summary.status, AuditStatus::Error);
        assert_eq!(summary.issue_count, 1);
    }

    #[test]
    fn auditor_issues_fail() {
        let audit = FixedAudit(vec!["image-alt: Images must have alternate text".into()]);
        let summary = run_audit(Some(&audit), "<img src=x>", &[]);
        assert_eq!(summary.status, AuditStatus::Fail);
        assert_eq!(summary.issue_count, 1);

        let clean = FixedAudit(vec![]);
        assert_eq!(
            run_audit(Some(&clean), "<p>ok</p>", &[]).status,
            AuditStatus::Pass
        );
    }
}
