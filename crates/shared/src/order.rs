//! 订单模型
//!
//! 订单是系统中唯一持久化的实体。字段分为三组，由不同写入方负责：
//! - 创建字段（orderId、userId、ticketType、amount、createdAt）：仅在创建时写入，之后不可变
//! - 状态字段（status）：仅由支付确认方写入，只允许 PENDING -> PAID
//! - 风险字段组（aiRisk、aiRecommendation、isVip、aiAnalyzedAt）：仅由风险分类方整组写入

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::TicketError;

// ---------------------------------------------------------------------------
// OrderStatus
// ---------------------------------------------------------------------------

/// 订单状态
///
/// 状态单调递增：PENDING < PAID，不存在其他迁移
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Paid,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = TicketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            other => Err(TicketError::Internal(format!("未知的订单状态: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// RiskLevel
// ---------------------------------------------------------------------------

/// 风险等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = TicketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            other => Err(TicketError::Internal(format!("未知的风险等级: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// RiskAssessment
// ---------------------------------------------------------------------------

/// 风险字段组
///
/// 四个字段只能作为一个整体写入存储，不存在单独更新其中某个字段的接口
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub risk: RiskLevel,
    pub recommendation: String,
    pub is_vip: bool,
    pub analyzed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

/// 订单记录
///
/// 序列化字段名与事件 detail 保持一致（camelCase），`OrderCreated` 事件直接携带该结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: String,
    pub user_id: String,
    pub ticket_type: String,
    pub amount: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_risk: Option<RiskLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_vip: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_analyzed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// 构建初始订单：状态为 PENDING，风险字段为空
    pub fn new_pending(
        order_id: impl Into<String>,
        user_id: impl Into<String>,
        ticket_type: impl Into<String>,
        amount: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            user_id: user_id.into(),
            ticket_type: ticket_type.into(),
            amount,
            status: OrderStatus::Pending,
            created_at,
            ai_risk: None,
            ai_recommendation: None,
            is_vip: None,
            ai_analyzed_at: None,
        }
    }

    /// 读取风险字段组，仅当整组字段都存在时返回
    pub fn risk_assessment(&self) -> Option<RiskAssessment> {
        match (
            self.ai_risk,
            &self.ai_recommendation,
            self.is_vip,
            self.ai_analyzed_at,
        ) {
            (Some(risk), Some(recommendation), Some(is_vip), Some(analyzed_at)) => {
                Some(RiskAssessment {
                    risk,
                    recommendation: recommendation.clone(),
                    is_vip,
                    analyzed_at,
                })
            }
            _ => None,
        }
    }

    /// 整组覆盖风险字段，不触碰状态与创建字段
    pub fn apply_risk(&mut self, assessment: &RiskAssessment) {
        self.ai_risk = Some(assessment.risk);
        self.ai_recommendation = Some(assessment.recommendation.clone());
        self.is_vip = Some(assessment.is_vip);
        self.ai_analyzed_at = Some(assessment.analyzed_at);
    }
}
