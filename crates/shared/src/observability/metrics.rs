//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::ObservabilityConfig;

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 与 `/health`
pub async fn init(service_name: &str, config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    register_common_metrics(service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!("orders_created_total", "Total number of created orders");
    metrics::describe_counter!(
        "events_published_total",
        "Total number of events routed to a channel"
    );
    metrics::describe_counter!(
        "deliveries_total",
        "Total number of channel deliveries by disposition"
    );
    metrics::describe_counter!(
        "deliveries_dead_lettered_total",
        "Total number of deliveries moved to the dead-letter channel"
    );
    metrics::describe_counter!(
        "risk_classifications_total",
        "Total number of risk classifications"
    );
    metrics::describe_histogram!(
        "risk_scoring_duration_seconds",
        "Risk scoring call duration in seconds"
    );
    metrics::describe_counter!("risk_alerts_total", "Total number of risk alerts");
    metrics::describe_counter!(
        "payments_confirmed_total",
        "Total number of payment confirmations"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("指标服务监听于 {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("指标服务异常退出: {}", e);
        }
    });

    Ok(server_handle)
}

// ============================================================================
// 指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录订单创建
#[inline]
pub fn record_order_created(ticket_type: &str) {
    metrics::counter!(
        "orders_created_total",
        "ticket_type" => ticket_type.to_string()
    )
    .increment(1);
}

/// 记录事件路由到通道的结果
#[inline]
pub fn record_event_published(detail_type: &str, channel: &str, status: &str) {
    metrics::counter!(
        "events_published_total",
        "type" => detail_type.to_string(),
        "channel" => channel.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录一次通道投递的处理结果
#[inline]
pub fn record_delivery(channel: &str, disposition: &str) {
    metrics::counter!(
        "deliveries_total",
        "channel" => channel.to_string(),
        "disposition" => disposition.to_string()
    )
    .increment(1);
}

/// 记录进入死信通道的消息
#[inline]
pub fn record_dead_lettered(channel: &str) {
    metrics::counter!(
        "deliveries_dead_lettered_total",
        "channel" => channel.to_string()
    )
    .increment(1);
}

/// 记录风险分类
#[inline]
pub fn record_risk_classification(risk: &str, outcome: &str) {
    metrics::counter!(
        "risk_classifications_total",
        "risk" => risk.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// 记录评分调用耗时
#[inline]
pub fn record_scoring_duration(scorer: &str, duration_secs: f64) {
    metrics::histogram!(
        "risk_scoring_duration_seconds",
        "scorer" => scorer.to_string()
    )
    .record(duration_secs);
}

/// 记录风险告警发送
#[inline]
pub fn record_risk_alert(status: &str) {
    metrics::counter!("risk_alerts_total", "status" => status.to_string()).increment(1);
}

/// 记录支付确认
#[inline]
pub fn record_payment_confirmed(transition: &str) {
    metrics::counter!(
        "payments_confirmed_total",
        "transition" => transition.to_string()
    )
    .increment(1);
}
