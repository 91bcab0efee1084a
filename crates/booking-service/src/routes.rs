//! 路由配置模块

use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use ticket_shared::observability::middleware as obs_middleware;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;

use crate::{handlers, state::AppState};

/// 单个请求的处理时间上限
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// 订单相关路由
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(handlers::create_order))
        .route(
            "/orders/webhook/payment-success",
            post(handlers::payment_success_webhook),
        )
        .route("/orders/{order_id}", get(handlers::get_order))
}

/// 完整应用：业务路由、健康检查与可观测性中间件
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(order_routes())
        .route("/health", get(handlers::health_check))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}
