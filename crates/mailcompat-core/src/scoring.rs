//! Weighted compliance scoring.
//!
//! Each token is resolved against the dataset, classified, and folded into
//! three weighted percentages. Weighting is a mean of per-feature ratios: a
//! feature tested against 200 clients counts exactly as much as one tested
//! against 5.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use crate::catalogs::{fallback_record, REFERENCE_URL};
use crate::dataset::Dataset;
use crate::types::*;

static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Fixed-point scale for intermediate ratios (8 fraction digits).
const RATIO_SCALE: u64 = 100_000_000;
/// Ratio units per hundredth of a percent.
const HUNDREDTH_PERCENT: u64 = RATIO_SCALE / 10_000;

/// Result of classifying one dataset record as a whole.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureEvaluation {
    pub level: SupportLevel,
    pub notes: Vec<String>,
}

/// Score a token sequence against `dataset`.
///
/// `tokens` are expected to be deduplicated already; `total_features` is
/// their count, unknown tokens included.
pub fn score(dataset: &Dataset, tokens: &[String]) -> ValidationReport {
    let mut partial_notes = PartialNotes::default();
    let mut unknown: Vec<String> = Vec::new();
    let mut weighting = Weighting::default();
    let mut partial_clients: BTreeSet<String> = BTreeSet::new();
    let mut rejected_clients: BTreeSet<String> = BTreeSet::new();

    for token in tokens {
        let Some(record) = dataset.get(token).or_else(|| fallback_record(token)) else {
            trace!(token = %token, "no dataset entry");
            unknown.push(token.clone());
            continue;
        };

        let evaluation = evaluate_feature(record);
        trace!(token = %token, slug = %record.slug, level = %evaluation.level, "feature classified");
        if evaluation.level == SupportLevel::Partial && !evaluation.notes.is_empty() {
            partial_notes.insert(token.clone(), evaluation.notes);
        }

        let clients = client_statuses(&record.stats);
        if clients.is_empty() {
            continue;
        }
        let mut per_client = SupportTally::default();
        for (client, level) in &clients {
            per_client.record(*level);
            match level {
                SupportLevel::Partial => {
                    partial_clients.insert(client.clone());
                }
                SupportLevel::Rejected => {
                    rejected_clients.insert(client.clone());
                }
                SupportLevel::Accepted => {}
            }
        }
        weighting.add(&per_client);
    }

    let [accepted, partial, rejected] = weighting.percentages();
    debug!(
        tokens = tokens.len(),
        weighted = weighting.features,
        unknown = unknown.len(),
        %accepted,
        %partial,
        %rejected,
        "tokens scored"
    );

    ValidationReport {
        total_features: tokens.len(),
        accepted,
        partial,
        rejected,
        partial_notes,
        unknown_features: unknown,
        partial_clients: partial_clients.into_iter().collect(),
        rejected_clients: rejected_clients.into_iter().collect(),
        reference_url: REFERENCE_URL.to_string(),
        dataset_source: dataset.source().to_string(),
        feature_count: dataset.feature_count(),
        client_count: dataset.client_count(),
        operating_system_count: dataset.operating_system_count(),
        audit: None,
        ignored_features: Vec::new(),
        ignored_feature_count: 0,
    }
}

/// Classify a record over every support code in its `stats` tree.
pub fn evaluate_feature(record: &FeatureRecord) -> FeatureEvaluation {
    let mut tally = SupportTally::default();
    for (_, payload) in record.stats.entries() {
        payload.for_each_code(&mut |code| tally.record(SupportLevel::from_code(code)));
    }
    FeatureEvaluation {
        level: tally.classify(),
        notes: record.ordered_notes(),
    }
}

/// Flatten `stats` into `platform:client -> level`.
///
/// Clients without a platform level are keyed `generic:<client>`. Names that
/// collapse to the same key keep the last classification.
pub fn client_statuses(stats: &StatsNode) -> BTreeMap<String, SupportLevel> {
    let mut statuses = BTreeMap::new();
    for (client, payload) in stats.entries() {
        if payload.is_map() {
            for (platform, data) in payload.entries() {
                statuses.insert(format_client(platform, client), data.tally().classify());
            }
        } else {
            statuses.insert(format_client("generic", client), payload.tally().classify());
        }
    }
    statuses
}

/// `<platform>:<client>`, lowercased, whitespace runs collapsed to `-`.
pub fn format_client(platform: &str, client: &str) -> String {
    format!("{}:{}", sanitize(platform), sanitize(client))
}

fn sanitize(value: &str) -> String {
    RE_WHITESPACE.replace_all(&value.to_lowercase(), "-").into_owned()
}

/// Sum of per-feature accepted/partial/rejected ratios.
#[derive(Debug, Default)]
struct Weighting {
    totals: [u64; 3],
    features: u64,
}

impl Weighting {
    fn add(&mut self, tally: &SupportTally) {
        let total = tally.total();
        if total == 0 {
            return;
        }
        self.features += 1;
        for (slot, count) in self
            .totals
            .iter_mut()
            .zip([tally.accepted, tally.partial, tally.rejected])
        {
            *slot += div_half_up(count * RATIO_SCALE, total);
        }
    }

    /// Mean ratio per level as a percentage; all zero when nothing was weighted.
    fn percentages(&self) -> [Percentage; 3] {
        if self.features == 0 {
            return [Percentage::ZERO; 3];
        }
        self.totals.map(|sum| {
            let mean = div_half_up(sum, self.features);
            let hundredths = div_half_up(mean, HUNDREDTH_PERCENT);
            Percentage::from_hundredths(u32::try_from(hundredths).unwrap_or(u32::MAX))
        })
    }
}

/// `numerator / denominator`, rounding halves up.
fn div_half_up(numerator: u64, denominator: u64) -> u64 {
    (2 * numerator + denominator) / (2 * denominator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(stats: serde_json::Value) -> FeatureRecord {
        FeatureRecord::from_value("x", &json!({ "stats": stats, "notes_by_num": { "1": "note" } }))
    }

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(div_half_up(1, 2), 1);
        assert_eq!(div_half_up(1, 3), 0);
        assert_eq!(div_half_up(2, 3), 1);
        assert_eq!(div_half_up(5, 10), 1);
        assert_eq!(div_half_up(4, 10), 0);
    }

    #[test]
    fn weighting_is_mean_of_ratios() {
        let mut weighting = Weighting::default();
        // 1 of 3 accepted, 2 of 3 rejected.
        weighting.add(&SupportTally { accepted: 1, partial: 0, rejected: 2 });
        // 200 clients, all accepted; still one vote.
        weighting.add(&SupportTally { accepted: 200, partial: 0, rejected: 0 });
        let [a, p, r] = weighting.percentages();
        // (0.33333333 + 1) / 2 = 0.66666667 -> 66.67
        assert_eq!(a.to_string(), "66.67");
        assert_eq!(p.to_string(), "0.00");
        // 0.66666667 / 2 = 0.33333334 -> 33.33
        assert_eq!(r.to_string(), "33.33");
    }

    #[test]
    fn empty_weighting_is_zero() {
        let mut weighting = Weighting::default();
        weighting.add(&SupportTally::default());
        assert_eq!(weighting.features, 0);
        assert_eq!(weighting.percentages(), [Percentage::ZERO; 3]);
    }

    #[test]
    fn client_statuses_per_platform() {
        let stats = StatsNode::from(&json!({
            "Apple Mail": { "macOS": { "12": "y", "16": "y" }, "iOS": { "15": "a #1", "17": "y" } },
            "Outlook": { "Windows": { "2019": "n", "2021": "n" } },
            "hey": "y",
            "aol": { "android": {} }
        }));
        let statuses = client_statuses(&stats);
        assert_eq!(statuses["macos:apple-mail"], SupportLevel::Accepted);
        assert_eq!(statuses["ios:apple-mail"], SupportLevel::Partial);
        assert_eq!(statuses["windows:outlook"], SupportLevel::Rejected);
        assert_eq!(statuses["generic:hey"], SupportLevel::Accepted);
        // No codes at all classifies as partial.
        assert_eq!(statuses["android:aol"], SupportLevel::Partial);
        assert_eq!(statuses.len(), 5);
    }

    #[test]
    fn sanitized_names_collide_last_wins() {
        let stats = StatsNode::from(&json!({
            "Gmail": { "ios": { "1": "y" } },
            "gmail": { "ios": { "1": "n" } }
        }));
        let statuses = client_statuses(&stats);
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses["ios:gmail"], SupportLevel::Rejected);
    }

    #[test]
    fn evaluate_feature_levels() {
        assert_eq!(
            evaluate_feature(&record(json!({ "c": { "p": { "v": "y" } } }))).level,
            SupportLevel::Accepted
        );
        assert_eq!(
            evaluate_feature(&record(json!({ "c": { "p": { "v": "n", "w": "u" } } }))).level,
            SupportLevel::Rejected
        );
        let partial = evaluate_feature(&record(json!({ "c": { "p": { "v": "y", "w": "n" } } })));
        assert_eq!(partial.level, SupportLevel::Partial);
        assert_eq!(partial.notes, vec!["note"]);
        // Missing stats: nothing counted, which is partial.
        assert_eq!(
            evaluate_feature(&FeatureRecord::empty("x")).level,
            SupportLevel::Partial
        );
    }

    #[test]
    fn format_client_collapses_whitespace() {
        assert_eq!(format_client("Desktop  Webmail", "Yahoo!\tMail"), "desktop-webmail:yahoo!-mail");
    }
}
