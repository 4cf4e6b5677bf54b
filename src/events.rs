// Diagnostic events for scanforge
// Components report contract-level failures here instead of logging directly,
// so tests can assert on exactly what was reported.

use parking_lot::Mutex;
use std::fmt;
use tracing::{error, info, warn};

/// Registry a plugin was offered to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryKind {
    Detector,
    ModelProvider,
    TrainingSource,
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryKind::Detector => write!(f, "detector"),
            RegistryKind::ModelProvider => write!(f, "model provider"),
            RegistryKind::TrainingSource => write!(f, "training source"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Registered {
        registry: RegistryKind,
        name: String,
        replaced: bool,
    },
    RegistrationRejected {
        registry: RegistryKind,
        name: String,
        reason: String,
    },
    ScanStarted {
        target: String,
        parameters: usize,
    },
    DetectorFailed {
        kind: String,
        reason: String,
    },
    TransportFailed {
        url: String,
        reason: String,
    },
    ModelTrained {
        name: String,
    },
    TrainingFailed {
        name: String,
        reason: String,
    },
    DataSourceFailed {
        source: String,
        reason: String,
    },
}

impl Event {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::RegistrationRejected { .. }
                | Event::DetectorFailed { .. }
                | Event::TransportFailed { .. }
                | Event::TrainingFailed { .. }
                | Event::DataSourceFailed { .. }
        )
    }
}

/// Receives diagnostics from the orchestrator and its plugins
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Forwards every event to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: Event) {
        match event {
            Event::Registered { registry, name, replaced } => {
                info!(%registry, %name, replaced, "{} '{}' registered successfully", registry, name)
            }
            Event::RegistrationRejected { registry, name, reason } => {
                error!(%registry, %name, "{} '{}' rejected: {}", registry, name, reason)
            }
            Event::ScanStarted { target, parameters } => {
                info!(%target, parameters, "Starting scan for {}", target)
            }
            Event::DetectorFailed { kind, reason } => {
                error!(%kind, "Detector '{}' failed: {}", kind, reason)
            }
            Event::TransportFailed { url, reason } => {
                warn!(%url, "Request failed: {}", reason)
            }
            Event::ModelTrained { name } => info!(%name, "Model '{}' training completed", name),
            Event::TrainingFailed { name, reason } => {
                error!(%name, "Error training model '{}': {}", name, reason)
            }
            Event::DataSourceFailed { source, reason } => {
                error!(%source, "Training data source '{}' failed: {}", source, reason)
            }
        }
    }
}

/// Keeps events in memory, in emission order
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn failures(&self) -> Vec<Event> {
        self.events.lock().iter().filter(|e| e.is_failure()).cloned().collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: Event) {
        self.events.lock().push(event);
    }
}
