// Parameter Discoverer
//
// Given a target, return an ordered, duplicate-free set of parameter names.
//
// A crawling implementation would walk the target's forms, links and query
// strings and return the union of names it saw. StaticParameterDiscoverer
// ignores the target and returns a fixed candidate list.

use crate::config::{DiscoveryConfig, DEFAULT_PARAMETERS};
use crate::models::{ParameterSet, Target};
use async_trait::async_trait;

#[async_trait]
pub trait ParameterDiscoverer: Send + Sync {
    async fn discover(&self, target: &Target) -> ParameterSet;
}

/// Returns the same candidate names for every target
#[derive(Debug, Clone)]
pub struct StaticParameterDiscoverer {
    candidates: ParameterSet,
}

impl StaticParameterDiscoverer {
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            candidates: candidates.into_iter().collect(),
        }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(config.parameters.iter().cloned())
    }
}

impl Default for StaticParameterDiscoverer {
    fn default() -> Self {
        Self::new(DEFAULT_PARAMETERS.iter().copied())
    }
}

#[async_trait]
impl ParameterDiscoverer for StaticParameterDiscoverer {
    async fn discover(&self, target: &Target) -> ParameterSet {
        tracing::debug!(%target, count = self.candidates.len(), "Using static parameter candidates");
        self.candidates.clone()
    }
}
