// Detectors
//
// One detector per vulnerability kind. The orchestrator holds them as
// `Arc<dyn Detector>` so new kinds need no orchestrator change.
//
// - sql / rce: baseline placeholders that never report a vulnerability
// - probe:     reusable skeleton that sends payloads (and their evasion
//              variants) through the transport and asks a validator

pub mod probe;
pub mod rce;
pub mod sql;

pub use probe::{ProbeDetector, RejectAll, ResponseValidator, RAW_FORM};
pub use rce::RceDetector;
pub use sql::SqlInjectionDetector;

use crate::engine::HttpResponse;
use crate::error::DetectorError;
use crate::models::{ParameterSet, Target, Verdict};
use async_trait::async_trait;

#[async_trait]
pub trait Detector: Send + Sync {
    /// Try to prove the vulnerability on `target` through `parameters`.
    ///
    /// A negative result is `Ok(Verdict::clean())`. `Err` means the probe
    /// could not run; the orchestrator records it and moves on.
    async fn scan(&self, target: &Target, parameters: &ParameterSet) -> Result<Verdict, DetectorError>;

    /// Second look at a single response to weed out false positives
    fn validate_finding(&self, response: &HttpResponse, payload: &str) -> bool;
}
