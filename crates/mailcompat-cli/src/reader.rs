use std::borrow::Cow;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use mailcompat_core::Dataset;
use reqwest::blocking::{Client, ClientBuilder};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::commands::OutputFormat;

/// Default project config looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "mailcompat.config.yaml";

const USER_AGENT: &str = concat!("mailcompat/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// One HTML document to score, with a label for report headers.
pub struct HtmlDocument {
    pub label: String,
    pub html: String,
}

/// Project configuration from mailcompat.config.yaml.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckConfig {
    pub ignore: Option<Vec<String>>,
    pub audit: Option<bool>,
    pub audit_tags: Option<Vec<String>>,
    pub format: Option<OutputFormat>,
    /// Snapshot to score against instead of the bundled sample.
    pub dataset: Option<PathBuf>,
}

/// Retrieves remote HTML for `http(s)://` sources.
pub trait HtmlFetcher {
    fn fetch(&self, url: &str) -> Result<String, String>;
}

/// Fetches over HTTP(S), following redirects.
pub struct HttpFetcher;

impl HtmlFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, String> {
        let client = http_client_builder()
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {e}"))?;
        fetch_with(&client, url)
    }
}

fn http_client_builder() -> ClientBuilder {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(10))
}

fn fetch_with(client: &Client, url: &str) -> Result<String, String> {
    let response = client
        .get(url)
        .send()
        .map_err(|e| format!("Unable to fetch HTML from {url}: {e}"))?;
    ensure_success(url, response.status())?;
    let html = response
        .text()
        .map_err(|e| format!("Unable to read HTML from {url}: {e}"))?;
    debug!(url, bytes = html.len(), "remote html fetched");
    Ok(html)
}

fn ensure_success(url: &str, status: StatusCode) -> Result<(), String> {
    if status.as_u16() >= 400 {
        return Err(format!("Failed to fetch HTML ({}) from {url}", status.as_u16()));
    }
    Ok(())
}

fn is_remote(source: &str) -> bool {
    let lower = source.to_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Resolve command-line sources into HTML documents.
///
/// Sources are joined with a single space first, so markup split by the shell
/// (`'<html' '><body>...'`) arrives as one document.
pub fn load_documents(
    sources: &[String],
    fetcher: &dyn HtmlFetcher,
) -> Result<Vec<HtmlDocument>, String> {
    let joined = sources.join(" ");
    let source = joined.trim();

    if source.is_empty() || source == "-" {
        let mut html = String::new();
        io::stdin()
            .read_to_string(&mut html)
            .map_err(|e| format!("Failed to read stdin: {e}"))?;
        return Ok(vec![HtmlDocument {
            label: "<stdin>".into(),
            html,
        }]);
    }

    if source.starts_with('<') {
        return Ok(vec![HtmlDocument {
            label: "<inline>".into(),
            html: joined,
        }]);
    }

    let path = Path::new(source);
    if path.is_file() {
        return Ok(vec![read_document(path)?]);
    }
    if path.is_dir() {
        return scan_directory(path);
    }

    if is_remote(source) {
        return Ok(vec![HtmlDocument {
            label: source.to_string(),
            html: fetcher.fetch(source)?,
        }]);
    }

    Err(format!("Unable to resolve HTML source: {source}"))
}

fn read_document(path: &Path) -> Result<HtmlDocument, String> {
    let html = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    Ok(HtmlDocument {
        label: path.to_string_lossy().to_string(),
        html,
    })
}

fn scan_directory(dir_path: &Path) -> Result<Vec<HtmlDocument>, String> {
    let mut paths: Vec<PathBuf> = Vec::new();

    for extension in ["html", "htm"] {
        let pattern = dir_path.join(format!("**/*.{extension}"));
        let pattern_str = pattern.to_string_lossy().replace('\\', "/");
        let entries =
            glob::glob(&pattern_str).map_err(|e| format!("Invalid glob pattern: {}", e))?;

        for entry in entries {
            match entry {
                Ok(path) => {
                    if path.is_file() && !paths.contains(&path) {
                        paths.push(path);
                    }
                }
                Err(e) => {
                    return Err(format!("Glob error: {}", e));
                }
            }
        }
    }

    if paths.is_empty() {
        return Err(format!(
            "No HTML files (.html, .htm) found in: {}",
            dir_path.display()
        ));
    }

    paths.sort();
    debug!(directory = %dir_path.display(), files = paths.len(), "html files discovered");
    paths.iter().map(|path| read_document(path)).collect()
}

/// The snapshot at `path`, or the bundled sample when none is given.
pub fn load_dataset(path: Option<&Path>) -> Result<Cow<'static, Dataset>, String> {
    let Some(path) = path else {
        return Dataset::bundled().map(Cow::Borrowed).map_err(|e| e.to_string());
    };
    let json = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read dataset {}: {e}", path.display()))?;
    let dataset = Dataset::from_json(&json)
        .map_err(|e| format!("{e} ({})", path.display()))?
        .with_source(path.display().to_string());
    debug!(path = %path.display(), features = dataset.feature_count(), "dataset loaded");
    Ok(Cow::Owned(dataset))
}

/// Read the project config: `explicit` when given (it must exist), otherwise
/// mailcompat.config.yaml in the working directory when present.
pub fn read_check_config(explicit: Option<&Path>) -> Result<CheckConfig, String> {
    let config_path = match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(format!("Config file does not exist: {}", path.display()));
            }
            path.to_path_buf()
        }
        None => {
            let default = PathBuf::from(CONFIG_FILE_NAME);
            if !default.is_file() {
                return Ok(CheckConfig::default());
            }
            default
        }
    };

    let yaml_content = fs::read_to_string(&config_path)
        .map_err(|e| format!("Failed to read config: {}", e))?;
    if yaml_content.trim().is_empty() {
        return Ok(CheckConfig::default());
    }
    let config: CheckConfig =
        serde_yaml::from_str(&yaml_content).map_err(|e| format!("Invalid YAML config: {}", e))?;
    debug!(path = %config_path.display(), "project config loaded");
    Ok(config)
}
