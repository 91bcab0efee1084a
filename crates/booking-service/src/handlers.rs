//! HTTP 处理器

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde_json::{Value, json};
use validator::Validate;

use crate::SERVICE_NAME;
use crate::dto::{CreateOrderRequest, OrderAccepted, PaymentWebhookRequest};
use crate::error::{BookingError, Result};
use crate::state::AppState;
use ticket_shared::order::Order;

/// 请求体无法解析（缺字段、类型错误）同样按参数错误返回
fn parse_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| BookingError::Validation(rejection.body_text()))
}

/// 创建订单
///
/// POST /orders
pub async fn create_order(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderAccepted>)> {
    let request = parse_body(payload)?;
    request.validate()?;

    let order = state.booking.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(OrderAccepted::created(order.order_id))))
}

/// 模拟支付成功回调
///
/// POST /orders/webhook/payment-success
pub async fn payment_success_webhook(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PaymentWebhookRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderAccepted>)> {
    let request = parse_body(payload)?;
    request.validate()?;

    state
        .booking
        .simulate_payment_success(&request.order_id)
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(OrderAccepted::payment_published(request.order_id)),
    ))
}

/// 查询订单
///
/// GET /orders/{orderId}
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<Order>> {
    Ok(Json(state.booking.get_order(&order_id).await?))
}

/// 存活探针
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME
    }))
}
