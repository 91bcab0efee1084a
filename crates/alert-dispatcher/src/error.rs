//! 告警错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("告警发送失败: 渠道={channel}, 原因={reason}")]
    SendFailed { channel: String, reason: String },

    #[error("告警渠道配置无效: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Shared(#[from] ticket_shared::error::TicketError),
}
