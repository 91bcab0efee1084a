//! 订单创建服务
//!
//! 提供订单创建、支付模拟回调与订单查询的 REST API。

use std::sync::Arc;

use booking_service::SERVICE_NAME;
use booking_service::routes;
use booking_service::service::BookingService;
use booking_service::state::AppState;
use ticket_shared::config::AppConfig;
use ticket_shared::kafka::KafkaChannelTransport;
use ticket_shared::retry::RetryPolicy;
use ticket_shared::router::{EventRouter, default_rules};
use ticket_shared::{observability, shutdown, store};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME)?;
    let _guard = observability::init(SERVICE_NAME, &config.observability).await?;

    info!("Starting booking-service on {}", config.server_addr());

    let store = store::connect(&config.store, &config.database).await?;
    let transport = Arc::new(KafkaChannelTransport::new(&config.kafka)?);
    let router = Arc::new(EventRouter::new(
        default_rules(&config.channels),
        transport,
        RetryPolicy::from_delivery(&config.delivery),
    ));

    let booking = Arc::new(BookingService::new(store, router));
    let app = routes::app(AppState::new(booking));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
