use std::collections::HashMap;
use serde::{Deserialize, Serialize};

/// Per-tenant read limits consulted by tag and tag-value searches.
///
/// A value of 0 means unlimited.
pub trait Limits: Send + Sync {
    fn max_bytes_per_tag_values_query(&self, tenant: &str) -> usize;
    fn max_blocks_per_tag_values_query(&self, tenant: &str) -> usize;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadLimits {
    pub max_bytes_per_tag_values_query: usize,
    pub max_blocks_per_tag_values_query: usize,
}

/// Limits from a default set plus optional per-tenant overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticLimits {
    pub defaults: ReadLimits,
    pub overrides: HashMap<String, ReadLimits>,
}

impl StaticLimits {
    pub fn new(defaults: ReadLimits) -> Self {
        StaticLimits {
            defaults,
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, tenant: &str, limits: ReadLimits) -> Self {
        self.overrides.insert(tenant.to_string(), limits);
        self
    }

    fn for_tenant(&self, tenant: &str) -> &ReadLimits {
        self.overrides.get(tenant).unwrap_or(&self.defaults)
    }
}

impl Limits for StaticLimits {
    fn max_bytes_per_tag_values_query(&self, tenant: &str) -> usize {
        self.for_tenant(tenant).max_bytes_per_tag_values_query
    }

    fn max_blocks_per_tag_values_query(&self, tenant: &str) -> usize {
        self.for_tenant(tenant).max_blocks_per_tag_values_query
    }
}
