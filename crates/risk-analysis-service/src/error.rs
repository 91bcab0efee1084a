//! 风险分析服务专用错误类型

use alert_dispatcher::AlertError;
use ticket_shared::error::TicketError;

/// 评分错误
///
/// 瞬时错误触发重投；格式错误说明结果本身不可用，重投也不会改变，直接跳过
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoringError {
    /// 网络错误、超时或评分服务端错误
    #[error("评分服务暂时不可用: {0}")]
    Transient(String),

    /// 评分结果不符合 {risk, recommendation, vipStatus} 结构
    #[error("评分结果格式无效: {0}")]
    Malformed(String),
}

impl ScoringError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// 服务装配错误
#[derive(Debug, thiserror::Error)]
pub enum RiskAnalysisError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error(transparent)]
    Alert(#[from] AlertError),

    #[error(transparent)]
    Shared(#[from] TicketError),
}
