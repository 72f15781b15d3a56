use std::collections::HashMap;
use std::sync::LazyLock;

use serde_json::json;

use crate::types::FeatureRecord;

/// Sample snapshot in the Can I Email record format, versioned with the crate.
///
/// It covers common email features with illustrative support codes. Load a
/// real `api/data.json` export through [`Dataset::from_json`] for measured
/// results.
///
/// [`Dataset::from_json`]: crate::Dataset::from_json
pub const BUNDLED_SNAPSHOT: &str = include_str!("../data/sample-features.json");

/// Source label of [`BUNDLED_SNAPSHOT`] in reports and dataset info.
pub const BUNDLED_SOURCE: &str = "bundled sample";

/// Source label of datasets parsed without an explicit one.
pub const CUSTOM_SOURCE: &str = "custom";

/// Project that defines the record format and support codes.
pub const REFERENCE_URL: &str = "https://www.caniemail.com";

/// Document-structure tags dropped from reports unless the caller says otherwise.
pub const DEFAULT_IGNORED_TOKENS: &[&str] = &["tag:html", "tag:head", "tag:body"];

/// Plain HTML constructs the dataset has no row for but every client renders.
pub static FALLBACK_RECORDS: LazyLock<HashMap<&'static str, FeatureRecord>> = LazyLock::new(|| {
    let mut m = HashMap::new();
    m.insert(
        "attribute:style",
        synthetic_record("html-inline-style", "Inline style attribute"),
    );
    m.insert(
        "attribute:class",
        synthetic_record("html-class-attribute", "Class attribute"),
    );
    m.insert("css:color", synthetic_record("css-color", "color"));
    m
});

/// Synthetic fallback record for `token`, if there is one.
pub fn fallback_record(token: &str) -> Option<&'static FeatureRecord> {
    FALLBACK_RECORDS.get(token)
}

fn synthetic_record(slug: &str, title: &str) -> FeatureRecord {
    FeatureRecord::from_value(
        slug,
        &json!({
            "slug": slug,
            "title": title,
            "stats": { "synthetic": { "global": { "2024-01": "y" } } }
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SupportLevel;

    #[test]
    fn fallbacks_are_fully_accepted() {
        for token in ["attribute:style", "attribute:class", "css:color"] {
            let record = fallback_record(token).unwrap();
            assert_eq!(record.stats.tally().classify(), SupportLevel::Accepted);
        }
        assert!(fallback_record("css:gap").is_none());
    }
}
