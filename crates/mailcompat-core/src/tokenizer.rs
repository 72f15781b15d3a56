//! HTML -> feature tokens.
//!
//! Tokens look like `tag:table`, `attribute:style`, `css:display` and the
//! synthetic at-rule markers `css:at-media` / `css:at-media-device-pixel-ratio`.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::trace;

use crate::naming::{ATTRIBUTE_PREFIX, CSS_PREFIX, TAG_PREFIX};

pub const AT_MEDIA_TOKEN: &str = "css:at-media";
pub const AT_MEDIA_DEVICE_PIXEL_RATIO_TOKEN: &str = "css:at-media-device-pixel-ratio";

/// Tag names as written in the source, opening or closing.
static RE_DECLARED_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\s*/?\s*([a-zA-Z0-9:-]+)").unwrap());

static RE_DECLARATION_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r";+").unwrap());

static RE_MEDIA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)@media\b").unwrap());

static RE_MEDIA_DEVICE_PIXEL_RATIO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)@media[^{]*-webkit-device-pixel-ratio").unwrap());

/// Feature tokens present in `html`: trimmed, non-empty, deduplicated in
/// first-seen order. Malformed markup never fails; blank input gives nothing.
pub fn tokenize(html: &str) -> Vec<String> {
    dedupe_tokens(list_elements(html))
}

/// Raw token stream in document order, duplicates included.
pub fn list_elements(html: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let declared = declared_tags(html);
    if declared.is_empty() {
        return tokens;
    }

    let document = Html::parse_document(html);
    // The document node itself is not an element and is skipped by `wrap`.
    for node in document.tree.root().descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        let tag_name = element.value().name().to_lowercase();
        // Parser-invented wrappers (html/head/body around a fragment) were
        // never written by the author.
        if !declared.contains(&tag_name) {
            continue;
        }

        tokens.push(format!("{TAG_PREFIX}{tag_name}"));
        for (name, value) in element.value().attrs() {
            let key = name.to_lowercase();
            tokens.push(format!("{ATTRIBUTE_PREFIX}{key}"));
            if key == "style" {
                tokens.extend(parse_css(value));
                collect_at_rules(value, &mut tokens);
            }
        }

        if tag_name == "style" {
            let css: String = element.text().collect();
            tokens.extend(parse_css(&css));
            collect_at_rules(&css, &mut tokens);
        }
    }

    trace!(raw_tokens = tokens.len(), declared_tags = declared.len(), "html tokenized");
    tokens
}

/// Lowercased tag names literally present in the raw text.
pub fn declared_tags(html: &str) -> HashSet<String> {
    if html.trim().is_empty() {
        return HashSet::new();
    }
    RE_DECLARED_TAG
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// `css:<property>` tokens for each `property: value` declaration.
///
/// The text is split on runs of `;` and each chunk yields whatever precedes
/// its first `:`. Style sheets go through the same scan, so a chunk that opens
/// with a selector or an `@media` prelude keeps it as part of the name.
pub fn parse_css(css: &str) -> Vec<String> {
    if css.trim().is_empty() {
        return Vec::new();
    }
    RE_DECLARATION_SPLIT
        .split(css)
        .map(str::trim)
        .filter_map(|declaration| declaration.split_once(':'))
        .map(|(property, _)| property.trim().to_lowercase())
        .filter(|property| !property.is_empty())
        .map(|property| format!("{CSS_PREFIX}{property}"))
        .collect()
}

/// Push the synthetic media-query markers found in `css`.
pub fn collect_at_rules(css: &str, tokens: &mut Vec<String>) {
    if css.trim().is_empty() {
        return;
    }
    if RE_MEDIA.is_match(css) {
        tokens.push(AT_MEDIA_TOKEN.to_string());
    }
    if RE_MEDIA_DEVICE_PIXEL_RATIO.is_match(css) {
        tokens.push(AT_MEDIA_DEVICE_PIXEL_RATIO_TOKEN.to_string());
    }
}

/// Trim, drop empties, keep the first occurrence of each token.
pub fn dedupe_tokens<I: IntoIterator<Item = String>>(tokens: I) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens
        .into_iter()
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .filter(|token| seen.insert(token.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sorted(mut tokens: Vec<String>) -> Vec<String> {
        tokens.sort();
        tokens
    }

    #[test]
    fn full_document_tokens() {
        let tokens = tokenize("<html><body><table style='color:#fff'></table></body></html>");
        assert_eq!(
            sorted(tokens),
            vec![
                "attribute:style",
                "css:color",
                "tag:body",
                "tag:html",
                "tag:table"
            ]
        );
    }

    #[test]
    fn fragment_skips_injected_wrappers() {
        let tokens = tokenize(r#"<div style="color:#000"></div>"#);
        assert_eq!(tokens, vec!["tag:div", "attribute:style", "css:color"]);
    }

    #[test]
    fn broken_markup_keeps_literal_attribute() {
        let html = "<div><span class='item' style='display:flex; color:#000' {{broken}}></span>";
        let tokens = tokenize(html);
        assert_eq!(tokens.len(), 7);
        assert_eq!(&tokens[..2], ["tag:div", "tag:span"]);
        for expected in [
            "attribute:class",
            "attribute:style",
            "attribute:{{broken}}",
            "css:display",
            "css:color",
        ] {
            assert!(tokens.iter().any(|t| t == expected), "missing {expected}");
        }
    }

    #[test]
    fn template_tags_and_namespaced_attributes() {
        let html = r#"<mjml>
  <mj-body>
    <mj-text th:text="${message}">Hello {{name}}</mj-text>
  </mj-body>
</mjml>"#;
        assert_eq!(
            tokenize(html),
            vec!["tag:mjml", "tag:mj-body", "tag:mj-text", "attribute:th:text"]
        );
    }

    #[test]
    fn style_block_media_queries() {
        let html = "<style>@media screen { .content { color: red; } }\n\
                    @media (-webkit-device-pixel-ratio: 2) { .content { font-size: 18px; } }</style>";
        let tokens = tokenize(html);
        assert_eq!(
            tokens,
            vec![
                "tag:style",
                "css:@media screen { .content { color",
                "css:} }\n@media (-webkit-device-pixel-ratio",
                "css:at-media",
                "css:at-media-device-pixel-ratio"
            ]
        );
    }

    #[test]
    fn bare_declarations_in_style_block() {
        assert_eq!(
            tokenize("<style>display: block; float: left</style>"),
            vec!["tag:style", "css:display", "css:float"]
        );
    }

    #[test]
    fn media_without_pixel_ratio() {
        let mut tokens = Vec::new();
        collect_at_rules("@MEDIA print { p { color: black } }", &mut tokens);
        assert_eq!(tokens, vec!["css:at-media"]);

        let mut tokens = Vec::new();
        collect_at_rules(".a { -webkit-device-pixel-ratio: 2 }", &mut tokens);
        assert!(tokens.is_empty());
    }

    #[test]
    fn inline_css_declarations() {
        assert_eq!(
            parse_css("Display: Flex;; color:#000 ; broken ; :nothing; margin : 0"),
            vec!["css:display", "css:color", "css:margin"]
        );
        assert_eq!(parse_css("/* x */color:red"), vec!["css:/* x */color"]);
        assert_eq!(parse_css("a:hover { color: red }"), vec!["css:a"]);
        assert!(parse_css("   ").is_empty());
    }

    #[test]
    fn blank_input_yields_nothing() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \n\t").is_empty());
        assert!(tokenize("just some text").is_empty());
    }

    #[test]
    fn declared_tags_cover_closing_tags() {
        let tags = declared_tags("<P>text</ P><br/>< img src=x>");
        assert!(tags.contains("p"));
        assert!(tags.contains("br"));
        assert!(tags.contains("img"));
        assert!(!tags.contains("html"));
    }

    #[test]
    fn dedupe_preserves_first_occurrence() {
        let tokens = dedupe_tokens(
            ["tag:p", " tag:a ", "", "tag:p", "tag:a", "  "]
                .into_iter()
                .map(String::from),
        );
        assert_eq!(tokens, vec!["tag:p", "tag:a"]);
    }
}
