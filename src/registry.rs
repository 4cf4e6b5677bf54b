// Plugin registries for scanforge
//
// Registry<T>: name -> handle map that keeps first-insertion order and lets
// the last registration under a name win. Nothing is ever removed.
//
// Plugin: a handle of unknown capability, as handed over by a loader. The
// orchestrator checks it carries the contract a registry needs before
// accepting it.

use crate::detectors::Detector;
use crate::providers::ModelProvider;
use crate::training::TrainingSource;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Registry<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. Returns true when an existing entry was replaced;
    /// a replaced entry keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, value: T) -> bool {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => {
                slot.1 = value;
                true
            }
            None => {
                self.entries.push((name, value));
                false
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }
}

/// A plugin handle whose capability is only known at runtime
#[derive(Clone)]
pub enum Plugin {
    Detector(Arc<dyn Detector>),
    ModelProvider(Arc<dyn ModelProvider>),
    TrainingSource(Arc<dyn TrainingSource>),
}

impl Plugin {
    pub fn detector(detector: impl Detector + 'static) -> Self {
        Plugin::Detector(Arc::new(detector))
    }

    pub fn model(model: impl ModelProvider + 'static) -> Self {
        Plugin::ModelProvider(Arc::new(model))
    }

    pub fn training_source(source: impl TrainingSource + 'static) -> Self {
        Plugin::TrainingSource(Arc::new(source))
    }

    /// Name of the contract this handle satisfies
    pub fn contract(&self) -> &'static str {
        match self {
            Plugin::Detector(_) => "Detector",
            Plugin::ModelProvider(_) => "ModelProvider",
            Plugin::TrainingSource(_) => "TrainingSource",
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Plugin({})", self.contract())
    }
}

impl From<Arc<dyn Detector>> for Plugin {
    fn from(detector: Arc<dyn Detector>) -> Self {
        Plugin::Detector(detector)
    }
}

impl From<Arc<dyn ModelProvider>> for Plugin {
    fn from(model: Arc<dyn ModelProvider>) -> Self {
        Plugin::ModelProvider(model)
    }
}

impl From<Arc<dyn TrainingSource>> for Plugin {
    fn from(source: Arc<dyn TrainingSource>) -> Self {
        Plugin::TrainingSource(source)
    }
}
