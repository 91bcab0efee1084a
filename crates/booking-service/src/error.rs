//! 订单创建服务错误类型

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use ticket_shared::error::TicketError;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("参数验证失败: {0}")]
    Validation(String),

    #[error("订单不存在: {0}")]
    OrderNotFound(String),

    #[error("订单已存在: {0}")]
    Conflict(String),

    /// 事件发布失败；创建订单时记录已写入，状态保持 PENDING
    #[error("事件发布失败: {0}")]
    PublishFailed(String),

    #[error("订单存储不可用: {0}")]
    StoreUnavailable(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl BookingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::OrderNotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PublishFailed(_) | Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::OrderNotFound(_) => "ORDER_NOT_FOUND",
            Self::Conflict(_) => "ORDER_CONFLICT",
            Self::PublishFailed(_) => "PUBLISH_FAILED",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 依赖故障只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::PublishFailed(e) | Self::StoreUnavailable(e) | Self::Internal(e) => {
                tracing::error!(code = self.error_code(), error = %e, "订单请求处理失败");
                "Failed to process order".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for BookingError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl From<TicketError> for BookingError {
    fn from(err: TicketError) -> Self {
        match err {
            TicketError::NotFound { id, .. } => Self::OrderNotFound(id),
            TicketError::AlreadyExists { value, .. } => Self::Conflict(value),
            e @ (TicketError::ChannelDelivery { .. } | TicketError::Kafka(_)) => {
                Self::PublishFailed(e.to_string())
            }
            e @ (TicketError::Database(_) | TicketError::StoreUnavailable(_)) => {
                Self::StoreUnavailable(e.to_string())
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, BookingError>;
