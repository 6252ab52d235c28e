use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::hasher::RouteHasher;

/// A shard's identity, stored as the JSON encoded shard file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeName {
    pub low: u64,
    pub high: u64,
    #[serde(default)]
    pub term: u64,
}

impl RangeName {
    /// Field names match in any casing, so `{"Low":..}` and `{"LOW":..}`
    /// both parse.
    pub fn parse(name: &str) -> Result<Self> {
        let fields: Map<String, Value> =
            serde_json::from_str(name).with_context(|| format!("invalid range name `{name}`"))?;
        let fields: Map<String, Value> = fields
            .into_iter()
            .map(|(key, value)| (key.to_ascii_lowercase(), value))
            .collect();
        serde_json::from_value(Value::Object(fields))
            .with_context(|| format!("invalid range name `{name}`"))
    }

    /// Both ends are inclusive.
    pub fn contains(&self, hash: u64) -> bool {
        self.low <= hash && hash <= self.high
    }
}

/// Prunes shard files whose hash range cannot hold a routing key.
#[derive(Clone)]
pub struct RouteFilter {
    hasher: Arc<dyn RouteHasher>,
}

impl RouteFilter {
    pub fn new(hasher: Arc<dyn RouteHasher>) -> Self {
        Self { hasher }
    }

    /// Keeps the files whose range contains `hash(route)`. Names that are
    /// not range names are logged and dropped.
    pub fn filter<V>(&self, route: &str, files: &mut HashMap<String, V>) {
        let hash = self.hasher.hash_string(route);
        files.retain(|file, _| match RangeName::parse(file) {
            Ok(range) => range.contains(hash),
            Err(err) => {
                warn!(file = %file, "dropping shard: {err:#}");
                false
            }
        });
    }
}
