//! 固定返回结果的评分替身

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use risk_analysis_service::decode::ScoringResponse;
use risk_analysis_service::error::ScoringError;
use risk_analysis_service::scoring::{OrderSummary, RiskScorer};
use ticket_shared::order::RiskLevel;

pub struct ScriptedScorer {
    result: Result<ScoringResponse, ScoringError>,
    calls: AtomicU32,
}

impl ScriptedScorer {
    pub fn returning(risk: RiskLevel, recommendation: &str, vip_status: bool) -> Self {
        Self {
            result: Ok(ScoringResponse {
                risk,
                recommendation: recommendation.to_string(),
                vip_status,
            }),
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing(error: ScoringError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RiskScorer for ScriptedScorer {
    async fn classify(&self, _order: &OrderSummary) -> Result<ScoringResponse, ScoringError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
