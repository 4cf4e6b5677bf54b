// SQL injection detector (baseline)
// Placeholder until real heuristics are plugged in: it never reports a
// vulnerability, so an unimplemented detector cannot invent findings.

use super::Detector;
use crate::engine::HttpResponse;
use crate::error::DetectorError;
use crate::models::{ParameterSet, Target, Verdict};
use async_trait::async_trait;

#[derive(Debug, Default, Clone, Copy)]
pub struct SqlInjectionDetector;

#[async_trait]
impl Detector for SqlInjectionDetector {
    async fn scan(&self, target: &Target, parameters: &ParameterSet) -> Result<Verdict, DetectorError> {
        tracing::info!(params = parameters.len(), "Scanning {} for SQL injection", target);
        Ok(Verdict::clean())
    }

    fn validate_finding(&self, _response: &HttpResponse, _payload: &str) -> bool {
        false
    }
}
