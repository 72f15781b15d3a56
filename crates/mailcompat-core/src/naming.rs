//! Derives lookup keys (`tag:`, `attribute:`, `css:`, `feature:`) for dataset
//! records.
//!
//! Dataset titles are free text: tag names show up as `<table>`, attribute
//! names as `` `srcset` ``, and some slugs encode heading ranges such as
//! `html-h1-h6`. Every naming convention is folded into one key space here.

use crate::types::FeatureRecord;

pub const TAG_PREFIX: &str = "tag:";
pub const ATTRIBUTE_PREFIX: &str = "attribute:";
pub const CSS_PREFIX: &str = "css:";
pub const FEATURE_PREFIX: &str = "feature:";

/// All lookup keys for one record. Names are lowercased; empty names are dropped.
pub fn derive_feature_names(slug: &str, record: &FeatureRecord) -> Vec<String> {
    let title = record.title.as_deref().unwrap_or(slug);

    let (prefix, names) = if record.category.eq_ignore_ascii_case("css") {
        (CSS_PREFIX, vec![clean_prefix(slug, "css-")])
    } else if record.category.eq_ignore_ascii_case("html") {
        if looks_like_attribute(title, slug) {
            (ATTRIBUTE_PREFIX, attribute_names(slug, title))
        } else {
            (TAG_PREFIX, tag_names(slug, title))
        }
    } else {
        (FEATURE_PREFIX, vec![slug.to_lowercase()])
    };

    names
        .into_iter()
        .filter(|name| !name.is_empty())
        .map(|name| format!("{prefix}{name}"))
        .collect()
}

/// An html record describes an attribute when its title or slug says so, or
/// when the slug names an `aria-*` / `data-*` attribute.
pub fn looks_like_attribute(title: &str, slug: &str) -> bool {
    let title = title.to_lowercase();
    let slug = slug.to_lowercase();
    title.contains("attribute")
        || slug.contains("attribute")
        || slug.contains("aria-")
        || slug.contains("data-")
}

fn attribute_names(slug: &str, title: &str) -> Vec<String> {
    let names = extract_backtick_names(title);
    if !names.is_empty() {
        return names;
    }
    vec![clean_attribute_name(slug)]
}

/// A heading-range slug (`html-h1-h6`) names every level in between, even when
/// the title only spells out the end points.
fn tag_names(slug: &str, title: &str) -> Vec<String> {
    let cleaned = clean_prefix(slug, "html-");
    let headings = expand_heading_range(&cleaned);
    if !headings.is_empty() {
        return headings;
    }
    let names = extract_tag_names(title);
    if !names.is_empty() {
        return names;
    }
    vec![cleaned]
}

/// Tag names written as `<name ...>` or `</name>` inside a title, deduplicated
/// in order of appearance.
pub fn extract_tag_names(title: &str) -> Vec<String> {
    let chars: Vec<char> = title.chars().collect();
    let mut names: Vec<String> = Vec::new();
    let mut index = 0;

    while index < chars.len() {
        if chars[index] != '<' {
            index += 1;
            continue;
        }
        let mut cursor = index + 1;
        if chars.get(cursor) == Some(&'/') {
            cursor += 1;
        }
        let start = cursor;
        while cursor < chars.len()
            && (chars[cursor].is_alphanumeric() || chars[cursor] == '-' || chars[cursor] == ':')
        {
            cursor += 1;
        }
        if cursor > start {
            let tag: String = chars[start..cursor].iter().collect::<String>().to_lowercase();
            if !names.contains(&tag) {
                names.push(tag);
            }
        }
        index = cursor;
    }

    names
}

/// Non-blank names enclosed in backticks. An unterminated backtick ends the scan.
pub fn extract_backtick_names(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find('`') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('`') else {
            break;
        };
        let name = after[..close].to_lowercase();
        if !name.trim().is_empty() && !names.contains(&name) {
            names.push(name);
        }
        rest = &after[close + 1..];
    }

    names
}

/// `h1-h6` -> `["h1", ..., "h6"]`. Anything else, including descending
/// ranges, yields nothing.
pub fn expand_heading_range(value: &str) -> Vec<String> {
    let Some((first, second)) = value.split_once('-') else {
        return Vec::new();
    };
    if first.is_empty() || second.is_empty() {
        return Vec::new();
    }
    let (Some(start), Some(end)) = (first.strip_prefix('h'), second.strip_prefix('h')) else {
        return Vec::new();
    };
    match (start.parse::<i32>(), end.parse::<i32>()) {
        (Ok(start), Ok(end)) if start <= end => (start..=end).map(|level| format!("h{level}")).collect(),
        _ => Vec::new(),
    }
}

/// Slug without the `html-` prefix and any `-element` / `-attribute` suffix.
pub fn clean_attribute_name(slug: &str) -> String {
    let cleaned = clean_prefix(slug, "html-");
    match cleaned.strip_suffix("-attribute") {
        Some(stripped) => stripped.to_string(),
        None => cleaned,
    }
}

/// Strip `prefix` and a trailing `-element`, then lowercase.
pub fn clean_prefix(slug: &str, prefix: &str) -> String {
    let value = slug.strip_prefix(prefix).unwrap_or(slug);
    let value = value.strip_suffix("-element").unwrap_or(value);
    value.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(slug: &str, title: &str, category: &str) -> FeatureRecord {
        FeatureRecord::from_value(slug, &json!({ "title": title, "category": category }))
    }

    fn names(slug: &str, title: &str, category: &str) -> Vec<String> {
        derive_feature_names(slug, &record(slug, title, category))
    }

    #[test]
    fn css_records_strip_prefix() {
        assert_eq!(names("css-border-radius", "border-radius", "css"), vec!["css:border-radius"]);
        assert_eq!(names("css-at-media", "@media", "CSS"), vec!["css:at-media"]);
    }

    #[test]
    fn html_tags_from_title() {
        assert_eq!(names("html-table", "<table> element", "html"), vec!["tag:table"]);
        assert_eq!(
            names("html-meta-color-scheme", "<meta name=\"color-scheme\">", "html"),
            vec!["tag:meta"]
        );
        assert_eq!(
            names("html-lists", "<ul>, <ol> and </dl> lists", "html"),
            vec!["tag:ul", "tag:ol", "tag:dl"]
        );
    }

    #[test]
    fn heading_range_from_slug() {
        let keys = names("html-h1-h6-element", "Heading elements h1 to h6", "html");
        assert_eq!(
            keys,
            vec!["tag:h1", "tag:h2", "tag:h3", "tag:h4", "tag:h5", "tag:h6"]
        );
        let titled = names("html-h1-h6-element", "<h1> to <h6> elements", "html");
        assert_eq!(titled, keys);
        assert!(expand_heading_range("h4-h2").is_empty());
        assert!(expand_heading_range("h1-hx").is_empty());
        assert!(expand_heading_range("h1").is_empty());
        assert_eq!(expand_heading_range("h3-h3"), vec!["h3"]);
    }

    #[test]
    fn tag_falls_back_to_slug() {
        assert_eq!(names("html-marquee-element", "Marquee", "html"), vec!["tag:marquee"]);
    }

    #[test]
    fn attributes_from_backticks() {
        assert_eq!(
            names("html-srcset", "`srcset` and `sizes` attributes", "html"),
            vec!["attribute:srcset", "attribute:sizes"]
        );
        assert_eq!(names("html-lang", "`LANG` attribute", "html"), vec!["attribute:lang"]);
    }

    #[test]
    fn attributes_from_slug() {
        assert_eq!(names("html-aria-label", "aria-label", "html"), vec!["attribute:aria-label"]);
        assert_eq!(
            names("html-bgcolor-attribute", "Background color attribute", "html"),
            vec!["attribute:bgcolor"]
        );
        assert_eq!(
            names("html-data-attributes", "data-* attributes", "html"),
            vec!["attribute:data-attributes"]
        );
    }

    #[test]
    fn other_categories_keep_slug() {
        assert_eq!(names("image-webp", "WebP", "image"), vec!["feature:image-webp"]);
        assert_eq!(names("Others-Doctype", "Doctype", ""), vec!["feature:others-doctype"]);
    }

    #[test]
    fn missing_title_uses_slug() {
        let record = FeatureRecord::from_value("html-hr", &json!({ "category": "html" }));
        assert_eq!(derive_feature_names("html-hr", &record), vec!["tag:hr"]);
    }

    #[test]
    fn backtick_scan_edge_cases() {
        assert!(extract_backtick_names("no names").is_empty());
        assert!(extract_backtick_names("`  ` blank").is_empty());
        assert_eq!(extract_backtick_names("`a` then `unterminated"), vec!["a"]);
    }

    #[test]
    fn empty_names_are_dropped() {
        assert!(names("html-", "", "html").is_empty());
    }
}
