use std::path::PathBuf;

use mailcompat_core::{
    AuditStatus, ValidationReport, ValidationRequest, Validator, DEFAULT_IGNORED_TOKENS,
};
use tracing::debug;

use super::{plural, to_pretty_json, OutputFormat};
use crate::reader::{load_dataset, load_documents, read_check_config, CheckConfig, HttpFetcher};

/// Command-line values for `check`; unset ones fall back to the config file.
#[derive(Debug, Default)]
pub struct CheckArgs {
    pub sources: Vec<String>,
    pub format: Option<OutputFormat>,
    pub ignore: Vec<String>,
    pub audit: bool,
    pub audit_tags: Vec<String>,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub dataset: Option<PathBuf>,
}

pub struct CheckOutcome {
    pub output: String,
    /// Some report's accessibility audit could not run.
    pub audit_error: bool,
}

struct Settings {
    format: OutputFormat,
    ignore: Vec<String>,
    audit: bool,
    audit_tags: Vec<String>,
    dataset: Option<PathBuf>,
}

impl Settings {
    fn merge(args: &CheckArgs, config: CheckConfig) -> Self {
        Settings {
            format: args.format.or(config.format).unwrap_or_default(),
            ignore: with_default_ignores(prefer_cli(&args.ignore, config.ignore)),
            audit: args.audit || config.audit.unwrap_or(false),
            audit_tags: prefer_cli(&args.audit_tags, config.audit_tags),
            dataset: args.dataset.clone().or(config.dataset),
        }
    }
}

fn prefer_cli(cli: &[String], file: Option<Vec<String>>) -> Vec<String> {
    if cli.is_empty() {
        file.unwrap_or_default()
    } else {
        cli.to_vec()
    }
}

/// Document-structure tags stay ignored; user tokens extend the list.
fn with_default_ignores(extra: Vec<String>) -> Vec<String> {
    DEFAULT_IGNORED_TOKENS
        .iter()
        .map(|token| token.to_string())
        .chain(extra)
        .collect()
}

pub fn run_check(args: &CheckArgs) -> Result<CheckOutcome, String> {
    let config = read_check_config(args.config.as_deref())?;
    let settings = Settings::merge(args, config);
    let dataset = load_dataset(settings.dataset.as_deref())?;
    let documents = load_documents(&args.sources, &HttpFetcher)?;
    let validator = Validator::new(&dataset);

    let mut reports: Vec<(String, ValidationReport)> = Vec::with_capacity(documents.len());
    for document in documents {
        let report = ValidationRequest::new()
            .html(document.html)
            .audit(settings.audit)
            .audit_tags(settings.audit_tags.iter().cloned())
            .ignore_tokens(settings.ignore.iter().cloned())
            .run(&validator)
            .map_err(|e| e.to_string())?;
        debug!(source = %document.label, features = report.total_features, "document scored");
        reports.push((document.label, report));
    }

    let audit_error = reports.iter().any(|(_, report)| {
        report
            .audit
            .as_ref()
            .is_some_and(|audit| audit.status == AuditStatus::Error)
    });

    let rendered = match settings.format {
        OutputFormat::Json => render_json(&reports)?,
        OutputFormat::Human => reports
            .iter()
            .map(|(label, report)| render_human(label, report))
            .collect::<Vec<_>>()
            .join("\n\n"),
    };

    let output = match &args.output {
        Some(out_path) => {
            std::fs::write(out_path, &rendered)
                .map_err(|e| format!("Failed to write {}: {e}", out_path.display()))?;
            format!("Written to {}", out_path.display())
        }
        None => rendered,
    };

    Ok(CheckOutcome {
        output,
        audit_error,
    })
}

/// A single report prints as-is; several print as `[{source, report}, ...]`.
fn render_json(reports: &[(String, ValidationReport)]) -> Result<String, String> {
    if let [(_, report)] = reports {
        return to_pretty_json(report);
    }
    let entries: Vec<serde_json::Value> = reports
        .iter()
        .map(|(label, report)| serde_json::json!({ "source": label, "report": report }))
        .collect();
    to_pretty_json(&entries)
}

fn render_human(label: &str, report: &ValidationReport) -> String {
    let mut lines: Vec<String> = vec![format!("Source: {label}")];

    lines.push(format!("Total features: {}", report.total_features));
    lines.push(format!("Accepted: {}%", report.accepted));
    lines.push(format!("Partial: {}%", report.partial));
    lines.push(format!("Rejected: {}%", report.rejected));

    push_list(&mut lines, "Unknown features", &report.unknown_features);
    push_list(&mut lines, "Ignored features", &report.ignored_features);

    if !report.partial_notes.is_empty() {
        lines.push(format!("Partial notes ({}):", report.partial_notes.len()));
        for (token, notes) in report.partial_notes.iter() {
            lines.push(format!("  {token}"));
            for note in notes {
                lines.push(format!("    - {note}"));
            }
        }
    }

    push_list(&mut lines, "Partial clients", &report.partial_clients);
    push_list(&mut lines, "Rejected clients", &report.rejected_clients);

    if let Some(audit) = &report.audit {
        let status = match audit.status {
            AuditStatus::Pass => "pass",
            AuditStatus::Fail => "fail",
            AuditStatus::Error => "error",
        };
        let issue_word = plural(audit.issue_count, "issue", "issues");
        lines.push(format!(
            "Accessibility audit: {status} ({} {issue_word})",
            audit.issue_count
        ));
        for issue in &audit.issues {
            lines.push(format!("  - {issue}"));
        }
    }

    lines.push(format!(
        "Dataset: {}, {} features, {} clients, {} operating systems ({})",
        report.dataset_source,
        report.feature_count,
        report.client_count,
        report.operating_system_count,
        report.reference_url
    ));

    lines.join("\n")
}

fn push_list(lines: &mut Vec<String>, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    lines.push(format!("{title} ({}): {}", items.len(), items.join(", ")));
}
