//! 统一错误处理模块
//!
//! 定义系统中所有共享的错误类型，使用 thiserror 提供良好的错误信息。
//! `is_retryable` 是消费端决定"重投"还是"跳过"的唯一依据。

use thiserror::Error;

/// 系统错误类型
#[derive(Debug, Error)]
pub enum TicketError {
    // ==================== 存储错误 ====================
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("记录未找到: {entity} id={id}")]
    NotFound { entity: String, id: String },

    /// 创建时主键冲突（订单 ID 重复）
    #[error("记录已存在: {entity} {field}={value}")]
    AlreadyExists {
        entity: String,
        field: String,
        value: String,
    },

    #[error("存储不可用: {0}")]
    StoreUnavailable(String),

    // ==================== 消息错误 ====================
    #[error("Kafka 错误: {0}")]
    Kafka(String),

    #[error("通道投递失败: channel={channel}, 原因={reason}")]
    ChannelDelivery { channel: String, reason: String },

    #[error("事件格式无效: {0}")]
    InvalidEvent(String),

    // ==================== 通用错误 ====================
    #[error("配置错误: {0}")]
    Config(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, TicketError>;

impl TicketError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Kafka(_) => "KAFKA_ERROR",
            Self::ChannelDelivery { .. } => "CHANNEL_DELIVERY_ERROR",
            Self::InvalidEvent(_) => "INVALID_EVENT",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为可重试（瞬时）错误
    ///
    /// 数据库层面的 RowNotFound 属于数据问题，重投也不会成功
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::RowNotFound) => false,
            Self::Database(_)
            | Self::StoreUnavailable(_)
            | Self::Kafka(_)
            | Self::ChannelDelivery { .. } => true,
            _ => false,
        }
    }

    /// 构造订单不存在错误
    pub fn order_not_found(order_id: &str) -> Self {
        Self::NotFound {
            entity: "Order".to_string(),
            id: order_id.to_string(),
        }
    }
}

impl From<config::ConfigError> for TicketError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
