//! 风险分级策略
//!
//! 风险等级由金额唯一决定：
//! - amount > 2000 -> HIGH
//! - 500 < amount <= 2000 -> MEDIUM，且为 VIP
//! - 其余 -> LOW，非 VIP
//!
//! 评分结果只提供建议文本；等级与策略不一致时以策略为准。

use ticket_shared::order::RiskLevel;

use crate::decode::ScoringResponse;

pub const HIGH_RISK_THRESHOLD: f64 = 2000.0;
pub const MEDIUM_RISK_THRESHOLD: f64 = 500.0;

/// 按金额分级
pub fn classify_amount(amount: f64) -> RiskLevel {
    if amount > HIGH_RISK_THRESHOLD {
        RiskLevel::High
    } else if amount > MEDIUM_RISK_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// 最终生效的分级结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub risk: RiskLevel,
    pub recommendation: String,
    pub is_vip: bool,
    /// 评分结果给出的等级与策略不一致
    pub overridden: bool,
}

/// 以金额策略校正评分结果
///
/// MEDIUM 固定为 VIP，LOW 固定为非 VIP，HIGH 沿用评分结果中的 vipStatus
pub fn apply(amount: f64, response: &ScoringResponse) -> Classification {
    let risk = classify_amount(amount);
    let is_vip = match risk {
        RiskLevel::Medium => true,
        RiskLevel::Low => false,
        RiskLevel::High => response.vip_status,
    };

    Classification {
        risk,
        recommendation: response.recommendation.clone(),
        is_vip,
        overridden: risk != response.risk,
    }
}
