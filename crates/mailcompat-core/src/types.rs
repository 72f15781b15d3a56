use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::ser::{Error as _, SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::audit::AuditSummary;

// ---------------------------------------------------------------------------
// Support levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportLevel {
    Accepted,
    Partial,
    Rejected,
}

impl SupportLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupportLevel::Accepted => "accepted",
            SupportLevel::Partial => "partial",
            SupportLevel::Rejected => "rejected",
        }
    }

    /// Classify a single support code (`y`, `n`, `a #1`, `u`, ...).
    ///
    /// Only the first character matters, case-insensitively. Anything that is
    /// neither `y` nor `n`, including the empty string, counts as partial.
    pub fn from_code(code: &str) -> Self {
        match code.trim().chars().next().map(|c| c.to_ascii_lowercase()) {
            Some('y') => SupportLevel::Accepted,
            Some('n') => SupportLevel::Rejected,
            _ => SupportLevel::Partial,
        }
    }
}

impl fmt::Display for SupportLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running counts of support codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupportTally {
    pub accepted: u64,
    pub partial: u64,
    pub rejected: u64,
}

impl SupportTally {
    pub fn record(&mut self, level: SupportLevel) {
        match level {
            SupportLevel::Accepted => self.accepted += 1,
            SupportLevel::Partial => self.partial += 1,
            SupportLevel::Rejected => self.rejected += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.accepted + self.partial + self.rejected
    }

    /// Accepted only when nothing but `y` was seen, rejected when `n` was seen
    /// without any `y`. Everything else, an empty tally included, is partial.
    pub fn classify(&self) -> SupportLevel {
        if self.accepted > 0 && self.partial == 0 && self.rejected == 0 {
            SupportLevel::Accepted
        } else if self.rejected > 0 && self.accepted == 0 {
            SupportLevel::Rejected
        } else {
            SupportLevel::Partial
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset records
// ---------------------------------------------------------------------------

/// One node of a record's `stats` tree.
///
/// The dataset nests `client -> platform -> version -> code`, but nothing
/// guarantees that depth, so the tree is kept generic and walked recursively.
#[derive(Debug, Clone, PartialEq)]
pub enum StatsNode {
    Code(String),
    Map(Vec<(String, StatsNode)>),
    List(Vec<StatsNode>),
    Missing,
}

impl StatsNode {
    /// Entries of a map node; any other shape has no entries.
    pub fn entries(&self) -> &[(String, StatsNode)] {
        match self {
            StatsNode::Map(entries) => entries,
            _ => &[],
        }
    }

    pub fn is_map(&self) -> bool {
        matches!(self, StatsNode::Map(_))
    }

    /// Visit every leaf code below this node, depth first.
    pub fn for_each_code<F: FnMut(&str)>(&self, visit: &mut F) {
        match self {
            StatsNode::Code(code) => visit(code),
            StatsNode::Map(entries) => {
                for (_, child) in entries {
                    child.for_each_code(visit);
                }
            }
            StatsNode::List(items) => {
                for child in items {
                    child.for_each_code(visit);
                }
            }
            StatsNode::Missing => {}
        }
    }

    /// Count every support code below this node.
    pub fn tally(&self) -> SupportTally {
        let mut tally = SupportTally::default();
        self.for_each_code(&mut |code| tally.record(SupportLevel::from_code(code)));
        tally
    }
}

impl From<&Value> for StatsNode {
    fn from(value: &Value) -> Self {
        match value {
            Value::Object(map) => StatsNode::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), StatsNode::from(v)))
                    .collect(),
            ),
            Value::Array(items) => StatsNode::List(items.iter().map(StatsNode::from).collect()),
            Value::String(code) => StatsNode::Code(code.clone()),
            // Numbers and booleans are not valid codes; their text classifies as partial.
            Value::Number(n) => StatsNode::Code(n.to_string()),
            Value::Bool(b) => StatsNode::Code(b.to_string()),
            Value::Null => StatsNode::Missing,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub slug: String,
    pub title: Option<String>,
    pub category: String,
    pub stats: StatsNode,
    /// Numbered notes referenced by support codes such as `a #2`.
    pub notes_by_num: BTreeMap<String, String>,
}

impl FeatureRecord {
    /// Build a record from one dataset entry. The entry's own `slug` wins over
    /// the dataset key. Unknown or malformed fields degrade to empty values
    /// instead of failing.
    pub fn from_value(slug: &str, value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return FeatureRecord::empty(slug);
        };

        let notes_by_num = obj
            .get("notes_by_num")
            .and_then(Value::as_object)
            .map(|notes| {
                notes
                    .iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| {
                        let text = match v {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (k.clone(), text)
                    })
                    .collect()
            })
            .unwrap_or_default();

        FeatureRecord {
            slug: obj
                .get("slug")
                .and_then(Value::as_str)
                .unwrap_or(slug)
                .to_string(),
            title: obj.get("title").and_then(Value::as_str).map(str::to_string),
            category: obj
                .get("category")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            stats: obj.get("stats").map(StatsNode::from).unwrap_or(StatsNode::Missing),
            notes_by_num,
        }
    }

    pub fn empty(slug: &str) -> Self {
        FeatureRecord {
            slug: slug.to_string(),
            title: None,
            category: String::new(),
            stats: StatsNode::Missing,
            notes_by_num: BTreeMap::new(),
        }
    }

    /// Title, or the slug when the record has none.
    pub fn title_or_slug(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.slug)
    }

    /// Notes ordered by their (string) key.
    pub fn ordered_notes(&self) -> Vec<String> {
        self.notes_by_num.values().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// Percentages
// ---------------------------------------------------------------------------

/// Fixed-point percentage with two fraction digits, stored in hundredths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Percentage(u32);

impl Percentage {
    pub const ZERO: Percentage = Percentage(0);

    pub const fn from_hundredths(hundredths: u32) -> Self {
        Percentage(hundredths)
    }

    pub fn hundredths(self) -> u32 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Serializes as a JSON number that keeps both fraction digits (`6.50`).
impl Serialize for Percentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let number = serde_json::Number::from_str(&self.to_string()).map_err(S::Error::custom)?;
        number.serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Token -> notes for partially supported features, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialNotes(Vec<(String, Vec<String>)>);

impl PartialNotes {
    pub fn insert(&mut self, token: String, notes: Vec<String>) {
        match self.0.iter_mut().find(|(t, _)| *t == token) {
            Some((_, existing)) => *existing = notes,
            None => self.0.push((token, notes)),
        }
    }

    pub fn get(&self, token: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, notes)| notes.as_slice())
    }

    pub fn contains_key(&self, token: &str) -> bool {
        self.get(token).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(t, _)| t.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(t, n)| (t.as_str(), n.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Remove every entry whose token matches, returning the removed tokens.
    pub fn remove_where<F: Fn(&str) -> bool>(&mut self, matches: F) -> Vec<String> {
        let mut removed = Vec::new();
        self.0.retain(|(token, _)| {
            if matches(token) {
                removed.push(token.clone());
                false
            } else {
                true
            }
        });
        removed
    }
}

impl Serialize for PartialNotes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (token, notes) in &self.0 {
            map.serialize_entry(token, notes)?;
        }
        map.end()
    }
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub total_features: usize,
    pub accepted: Percentage,
    pub partial: Percentage,
    pub rejected: Percentage,
    pub partial_notes: PartialNotes,
    pub unknown_features: Vec<String>,
    pub partial_clients: Vec<String>,
    pub rejected_clients: Vec<String>,
    pub reference_url: String,
    /// Where the dataset came from: the bundled sample or a loaded snapshot.
    pub dataset_source: String,
    pub feature_count: usize,
    pub client_count: usize,
    pub operating_system_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit: Option<AuditSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored_features: Vec<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub ignored_feature_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    /// Run the accessibility audit alongside scoring.
    pub include_audit: bool,
    /// Rule tags handed to the auditor unchanged.
    pub audit_tags: Vec<String>,
}
