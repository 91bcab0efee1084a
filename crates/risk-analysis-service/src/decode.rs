//! 评分结果解码
//!
//! 模型返回的文本必须是 `{risk, recommendation, vipStatus}` 形式的 JSON 对象，
//! 三个字段缺一不可且类型严格匹配，否则视为格式错误。

use serde::Deserialize;
use ticket_shared::order::RiskLevel;

use crate::error::ScoringError;

/// 评分结果
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringResponse {
    pub risk: RiskLevel,
    pub recommendation: String,
    pub vip_status: bool,
}

/// 将模型输出文本解码为评分结果
pub fn decode_scoring_text(text: &str) -> Result<ScoringResponse, ScoringError> {
    serde_json::from_str(text.trim()).map_err(|e| ScoringError::Malformed(e.to_string()))
}
