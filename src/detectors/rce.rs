// Remote code execution detector (baseline)
// Same contract as the SQL baseline: always negative.

use super::Detector;
use crate::engine::HttpResponse;
use crate::error::DetectorError;
use crate::models::{ParameterSet, Target, Verdict};
use async_trait::async_trait;

#[derive(Debug, Default, Clone, Copy)]
pub struct RceDetector;

#[async_trait]
impl Detector for RceDetector {
    async fn scan(&self, target: &Target, parameters: &ParameterSet) -> Result<Verdict, DetectorError> {
        tracing::info!(params = parameters.len(), "Scanning {} for RCE", target);
        Ok(Verdict::clean())
    }

    fn validate_finding(&self, _response: &HttpResponse, _payload: &str) -> bool {
        false
    }
}
