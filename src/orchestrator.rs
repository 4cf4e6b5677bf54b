// Scan orchestrator
// Owns the detector, model provider and training source registries plus the
// transport, evasion chain and parameter discoverer.
//
// Registries sit behind their own RwLock: registration takes the write lock,
// dispatch clones the Arc handles under the read lock and releases it before
// awaiting anything. Each model provider carries an async mutex so two
// training runs never overlap on the same instance.

use crate::config::{Config, TransportConfig};
use crate::detectors::{Detector, ProbeDetector, RceDetector, SqlInjectionDetector};
use crate::engine::{HttpTransport, Transport};
use crate::error::{RegistrationError, TransportError};
use crate::events::{Event, EventSink, RegistryKind};
use crate::models::{DetectorOutcome, Finding, ParameterSet, ScanReport, Target};
use crate::mutator::{builtin_technique, EvasionChain};
use crate::parameters::{ParameterDiscoverer, StaticParameterDiscoverer};
use crate::providers::ModelProvider;
use crate::registry::{Plugin, Registry};
use crate::training::TrainingSource;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

/// A registered model provider plus its training lock
struct ProviderSlot {
    provider: Arc<dyn ModelProvider>,
    train_lock: AsyncMutex<()>,
}

/// How training went for one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainingOutcome {
    /// Trained from explicit data, or by `sources` sources. `errors` lists
    /// the sources that failed while others still trained the provider.
    Trained { sources: usize, errors: Vec<String> },
    /// No data was available; the provider was not touched
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct TrainingReport {
    pub outcomes: Vec<(String, TrainingOutcome)>,
}

impl TrainingReport {
    pub fn outcome(&self, provider: &str) -> Option<&TrainingOutcome> {
        self.outcomes.iter().find(|(n, _)| n == provider).map(|(_, o)| o)
    }
}

pub struct Orchestrator {
    detectors: RwLock<Registry<Arc<dyn Detector>>>,
    providers: RwLock<Registry<Arc<ProviderSlot>>>,
    sources: RwLock<Registry<Arc<dyn TrainingSource>>>,
    transport: Arc<dyn Transport>,
    evasion: Arc<EvasionChain>,
    discoverer: Arc<dyn ParameterDiscoverer>,
    events: Arc<dyn EventSink>,
    transport_config: TransportConfig,
}

impl Orchestrator {
    /// Empty registries around the given collaborators
    pub fn new(
        transport: Arc<dyn Transport>,
        evasion: Arc<EvasionChain>,
        discoverer: Arc<dyn ParameterDiscoverer>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            detectors: RwLock::new(Registry::new()),
            providers: RwLock::new(Registry::new()),
            sources: RwLock::new(Registry::new()),
            transport,
            evasion,
            discoverer,
            events,
            transport_config: TransportConfig::default(),
        }
    }

    /// Build everything from configuration and register the baseline
    /// `sql` and `rce` detectors
    pub fn from_config(config: &Config, events: Arc<dyn EventSink>) -> Result<Self, TransportError> {
        let transport = HttpTransport::with_events(&config.transport, events.clone())?;

        let evasion = EvasionChain::new();
        for name in &config.evasion.extra {
            // Names were checked by Config::validate
            if let Some(technique) = builtin_technique(name) {
                evasion.add_technique(technique);
            }
        }

        let mut orchestrator = Self::new(
            Arc::new(transport),
            Arc::new(evasion),
            Arc::new(StaticParameterDiscoverer::from_config(&config.discovery)),
            events,
        );
        orchestrator.transport_config = config.transport.clone();
        orchestrator.register_default_detectors();
        Ok(orchestrator)
    }

    pub fn register_default_detectors(&self) {
        // Both are valid detectors under non-empty names
        let _ = self.register_detector("sql", Plugin::detector(SqlInjectionDetector));
        let _ = self.register_detector("rce", Plugin::detector(RceDetector));
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    pub fn evasion(&self) -> Arc<EvasionChain> {
        self.evasion.clone()
    }

    pub fn events(&self) -> Arc<dyn EventSink> {
        self.events.clone()
    }

    /// A probe detector for `kind` wired to the shared transport and evasion
    /// chain, using the configured probe method. Not registered.
    pub fn probe_detector(&self, kind: &str) -> ProbeDetector {
        ProbeDetector::new(kind, self.transport.clone(), self.evasion.clone())
            .with_transport_config(&self.transport_config)
    }

    fn check_name(&self, registry: RegistryKind, name: &str) -> Result<(), RegistrationError> {
        if name.trim().is_empty() {
            self.events.emit(Event::RegistrationRejected {
                registry,
                name: name.to_string(),
                reason: RegistrationError::EmptyName.to_string(),
            });
            return Err(RegistrationError::EmptyName);
        }
        Ok(())
    }

    fn reject(&self, registry: RegistryKind, name: &str, expected: &'static str, plugin: &Plugin) -> RegistrationError {
        let err = RegistrationError::ContractMismatch {
            name: name.to_string(),
            expected,
            actual: plugin.contract(),
        };
        self.events.emit(Event::RegistrationRejected {
            registry,
            name: name.to_string(),
            reason: err.to_string(),
        });
        err
    }

    /// Register a detector under `name`.
    ///
    /// Anything that is not a detector is refused and reported; the registry
    /// is left unchanged. Refusal is not fatal.
    pub fn register_detector(&self, name: &str, plugin: impl Into<Plugin>) -> Result<(), RegistrationError> {
        let plugin = plugin.into();
        self.check_name(RegistryKind::Detector, name)?;
        match plugin {
            Plugin::Detector(detector) => {
                let replaced = self.detectors.write().insert(name, detector);
                self.events.emit(Event::Registered {
                    registry: RegistryKind::Detector,
                    name: name.to_string(),
                    replaced,
                });
                Ok(())
            }
            other => Err(self.reject(RegistryKind::Detector, name, "Detector", &other)),
        }
    }

    /// Register a model provider under `name`; same acceptance rules as detectors
    pub fn register_model_provider(&self, name: &str, plugin: impl Into<Plugin>) -> Result<(), RegistrationError> {
        let plugin = plugin.into();
        self.check_name(RegistryKind::ModelProvider, name)?;
        match plugin {
            Plugin::ModelProvider(provider) => {
                let slot = Arc::new(ProviderSlot {
                    provider,
                    train_lock: AsyncMutex::new(()),
                });
                let replaced = self.providers.write().insert(name, slot);
                self.events.emit(Event::Registered {
                    registry: RegistryKind::ModelProvider,
                    name: name.to_string(),
                    replaced,
                });
                Ok(())
            }
            other => Err(self.reject(RegistryKind::ModelProvider, name, "ModelProvider", &other)),
        }
    }

    /// Training sources are always accepted
    pub fn register_training_source(&self, name: &str, source: Arc<dyn TrainingSource>) {
        let replaced = self.sources.write().insert(name, source);
        self.events.emit(Event::Registered {
            registry: RegistryKind::TrainingSource,
            name: name.to_string(),
            replaced,
        });
    }

    pub fn detector_names(&self) -> Vec<String> {
        self.detectors.read().names()
    }

    pub fn model_provider_names(&self) -> Vec<String> {
        self.providers.read().names()
    }

    pub fn training_source_names(&self) -> Vec<String> {
        self.sources.read().names()
    }

    pub fn detector(&self, name: &str) -> Option<Arc<dyn Detector>> {
        self.detectors.read().get(name).cloned()
    }

    pub fn model_provider(&self, name: &str) -> Option<Arc<dyn ModelProvider>> {
        self.providers.read().get(name).map(|slot| slot.provider.clone())
    }

    /// Scan `target` with the detectors for `kinds` (all registered when `None`).
    ///
    /// Parameters are discovered once and shared. Kinds without a registered
    /// detector are skipped. Detectors run concurrently; a failing or
    /// panicking detector is recorded as `Failed` for its kind only. Findings
    /// come back in the order of `kinds`.
    pub async fn scan(&self, target: &Target, kinds: Option<&[&str]>) -> ScanReport {
        let requested: Vec<String> = match kinds {
            Some(kinds) => kinds.iter().map(|k| k.to_string()).collect(),
            None => self.detector_names(),
        };

        let parameters = Arc::new(self.discoverer.discover(target).await);
        self.events.emit(Event::ScanStarted {
            target: target.to_string(),
            parameters: parameters.len(),
        });

        let dispatch: Vec<(String, Arc<dyn Detector>)> = {
            let detectors = self.detectors.read();
            requested
                .into_iter()
                .filter_map(|kind| match detectors.get(&kind) {
                    Some(detector) => Some((kind, detector.clone())),
                    None => {
                        debug!(%kind, "No detector registered, skipping");
                        None
                    }
                })
                .collect()
        };

        let handles: Vec<_> = dispatch
            .into_iter()
            .map(|(kind, detector)| {
                let target = target.clone();
                let parameters = parameters.clone();
                let handle = tokio::spawn(async move { detector.scan(&target, &parameters).await });
                (kind, handle)
            })
            .collect();

        let mut findings = Vec::new();
        let mut outcomes = Vec::with_capacity(handles.len());
        for (kind, handle) in handles {
            let outcome = match handle.await {
                Ok(Ok(verdict)) => match Finding::from_verdict(&kind, target, verdict) {
                    Some(finding) => {
                        findings.push(finding);
                        DetectorOutcome::Vulnerable
                    }
                    None => DetectorOutcome::Clean,
                },
                Ok(Err(err)) => self.detector_failed(&kind, err.to_string()),
                Err(join_err) => self.detector_failed(&kind, format!("detector task aborted: {}", join_err)),
            };
            outcomes.push((kind, outcome));
        }

        ScanReport {
            target: target.clone(),
            parameters: ParameterSet::clone(&parameters),
            outcomes,
            findings,
        }
    }

    fn detector_failed(&self, kind: &str, reason: String) -> DetectorOutcome {
        self.events.emit(Event::DetectorFailed {
            kind: kind.to_string(),
            reason: reason.clone(),
        });
        DetectorOutcome::Failed(reason)
    }

    /// Train every registered model provider.
    ///
    /// With non-empty `training_data` each provider is trained on it
    /// directly. Otherwise every training source pushes its corpus into every
    /// provider. A failure is recorded for that provider and training moves
    /// on to the next one.
    pub async fn train_models(&self, training_data: Option<&[String]>) -> TrainingReport {
        let providers: Vec<(String, Arc<ProviderSlot>)> = self
            .providers
            .read()
            .iter()
            .map(|(n, s)| (n.to_string(), s.clone()))
            .collect();
        let sources: Vec<Arc<dyn TrainingSource>> =
            self.sources.read().iter().map(|(_, s)| s.clone()).collect();

        tracing::info!(providers = providers.len(), "Training all registered models");

        let mut report = TrainingReport::default();
        for (name, slot) in providers {
            let _guard = slot.train_lock.lock().await;
            let outcome = match training_data {
                Some(data) if !data.is_empty() => match slot.provider.train(data).await {
                    Ok(()) => TrainingOutcome::Trained {
                        sources: 0,
                        errors: Vec::new(),
                    },
                    Err(e) => TrainingOutcome::Failed(e.to_string()),
                },
                _ => self.train_from_sources(&*slot.provider, &sources).await,
            };

            match &outcome {
                TrainingOutcome::Trained { errors, .. } => {
                    for reason in errors {
                        tracing::warn!(%name, "Training source failed: {}", reason);
                    }
                    self.events.emit(Event::ModelTrained { name: name.clone() })
                }
                TrainingOutcome::Failed(reason) => self.events.emit(Event::TrainingFailed {
                    name: name.clone(),
                    reason: reason.clone(),
                }),
                TrainingOutcome::Skipped => debug!(%name, "No training data available"),
            }
            report.outcomes.push((name, outcome));
        }
        report
    }

    async fn train_from_sources(
        &self,
        provider: &dyn ModelProvider,
        sources: &[Arc<dyn TrainingSource>],
    ) -> TrainingOutcome {
        let mut contributed = 0;
        let mut errors = Vec::new();
        for source in sources {
            match source.push_training_update(provider).await {
                Ok(true) => contributed += 1,
                Ok(false) => {}
                Err(e) => errors.push(format!("{}: {}", source.name(), e)),
            }
        }

        if contributed > 0 {
            TrainingOutcome::Trained {
                sources: contributed,
                errors,
            }
        } else if !errors.is_empty() {
            TrainingOutcome::Failed(errors.join("; "))
        } else {
            TrainingOutcome::Skipped
        }
    }
}
