//! 支付服务专用错误类型

use ticket_shared::error::TicketError;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// 事件状态不是 SUCCESS，不应触发状态迁移
    #[error("支付状态无效: {order_id} status={status}")]
    UnexpectedStatus { order_id: String, status: String },

    #[error(transparent)]
    Shared(#[from] TicketError),
}
