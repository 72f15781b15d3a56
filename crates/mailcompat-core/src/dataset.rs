//! The compatibility dataset and its key index.
//!
//! A [`Dataset`] is built once from a JSON snapshot and is read-only
//! afterwards, so one instance can be shared by any number of concurrent
//! validations. Snapshots are either `slug -> record` maps or Can I Email
//! `api/data.json` exports (`{"data": [record, ...]}`).

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::catalogs::{BUNDLED_SNAPSHOT, BUNDLED_SOURCE, CUSTOM_SOURCE};
use crate::error::{Error, Result};
use crate::naming::derive_feature_names;
use crate::types::FeatureRecord;

static BUNDLED: LazyLock<Result<Dataset>> =
    LazyLock::new(|| Dataset::from_json(BUNDLED_SNAPSHOT).map(|d| d.with_source(BUNDLED_SOURCE)));

#[derive(Debug, Clone)]
pub struct Dataset {
    /// Records in snapshot order.
    records: Vec<FeatureRecord>,
    /// Lookup key -> index into `records`.
    index: HashMap<String, usize>,
    clients: Vec<String>,
    operating_systems: Vec<String>,
    source: String,
}

/// Dataset counts, as reported by introspection commands.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetInfo {
    pub source: String,
    pub feature_count: usize,
    pub client_count: usize,
    pub operating_system_count: usize,
    pub operating_systems: Vec<String>,
}

impl Dataset {
    /// The snapshot shipped with the crate, parsed on first use.
    pub fn bundled() -> Result<&'static Dataset> {
        BUNDLED.as_ref().map_err(Clone::clone)
    }

    /// Parse a snapshot. Accepts `{ "<slug>": { ...record... }, ... }` and the
    /// Can I Email export `{ "data": [ { "slug": ..., ... }, ... ] }`.
    pub fn from_json(json: &str) -> Result<Dataset> {
        let raw: Value = serde_json::from_str(json).map_err(|e| Error::Dataset {
            message: e.to_string(),
        })?;
        let Value::Object(top) = raw else {
            return Err(Error::Dataset {
                message: "top-level value must be an object of feature records".into(),
            });
        };

        let entries: Vec<(String, &Value)> = match top.get("data") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item.get("slug").and_then(Value::as_str) {
                    Some(slug) => Some((slug.to_string(), item)),
                    None => {
                        warn!("exported dataset record has no slug; skipping it");
                        None
                    }
                })
                .collect(),
            _ => top.iter().map(|(slug, value)| (slug.clone(), value)).collect(),
        };

        let mut records = Vec::with_capacity(entries.len());
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut clients = OrderedSet::default();
        let mut operating_systems = OrderedSet::default();
        let mut collisions = 0usize;

        for (slug, value) in entries {
            let slug = slug.as_str();
            if !value.is_object() {
                warn!(slug = %slug, "dataset record is not an object; indexing it without stats");
            }
            let record = FeatureRecord::from_value(slug, value);

            for (client, payload) in record.stats.entries() {
                clients.insert(client.to_lowercase());
                for (platform, _) in payload.entries() {
                    operating_systems.insert(platform.to_lowercase());
                }
            }

            let position = records.len();
            // Later records win on key collisions.
            for key in derive_feature_names(slug, &record) {
                if index.insert(key, position).is_some() {
                    collisions += 1;
                }
            }
            records.push(record);
        }

        debug!(
            features = records.len(),
            keys = index.len(),
            collisions,
            clients = clients.len(),
            operating_systems = operating_systems.len(),
            "compatibility dataset indexed"
        );

        Ok(Dataset {
            records,
            index,
            clients: clients.into_vec(),
            operating_systems: operating_systems.into_vec(),
            source: CUSTOM_SOURCE.to_string(),
        })
    }

    /// Label the dataset's origin, e.g. the file it was read from.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Record indexed under a canonical key such as `tag:table`.
    pub fn get(&self, key: &str) -> Option<&FeatureRecord> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    /// Record by dataset slug.
    pub fn record(&self, slug: &str) -> Option<&FeatureRecord> {
        self.records.iter().find(|r| r.slug == slug)
    }

    /// Every (key, record) pair of the index, in no particular order.
    pub fn lookup(&self) -> impl Iterator<Item = (&str, &FeatureRecord)> {
        self.index
            .iter()
            .map(|(key, &i)| (key.as_str(), &self.records[i]))
    }

    pub fn key_count(&self) -> usize {
        self.index.len()
    }

    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    pub fn feature_count(&self) -> usize {
        self.records.len()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn operating_system_count(&self) -> usize {
        self.operating_systems.len()
    }

    /// Lowercased client names in first-seen order.
    pub fn clients(&self) -> &[String] {
        &self.clients
    }

    /// Lowercased platform names in first-seen order.
    pub fn operating_systems(&self) -> &[String] {
        &self.operating_systems
    }

    pub fn info(&self) -> DatasetInfo {
        DatasetInfo {
            source: self.source.clone(),
            feature_count: self.feature_count(),
            client_count: self.client_count(),
            operating_system_count: self.operating_system_count(),
            operating_systems: self.operating_systems.clone(),
        }
    }
}

#[derive(Default)]
struct OrderedSet {
    seen: HashSet<String>,
    items: Vec<String>,
}

impl OrderedSet {
    fn insert(&mut self, value: String) {
        if self.seen.insert(value.clone()) {
            self.items.push(value);
        }
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn into_vec(self) -> Vec<String> {
        self.items
    }
}
