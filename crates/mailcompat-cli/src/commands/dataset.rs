use std::path::Path;

use mailcompat_core::DatasetInfo;

use super::{to_pretty_json, OutputFormat};
use crate::reader::load_dataset;

pub fn run_dataset(format: OutputFormat, path: Option<&Path>) -> Result<String, String> {
    let info = load_dataset(path)?.info();

    match format {
        OutputFormat::Json => to_pretty_json(&info),
        OutputFormat::Human => Ok(render_human(&info)),
    }
}

fn render_human(info: &DatasetInfo) -> String {
    let mut lines = vec![
        format!("Source: {}", info.source),
        format!("Features: {}", info.feature_count),
        format!("Clients: {}", info.client_count),
        format!("Operating systems: {}", info.operating_system_count),
    ];
    for os in &info.operating_systems {
        lines.push(format!("  - {os}"));
    }
    lines.join("\n")
}
