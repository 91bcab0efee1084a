//! 支付确认服务
//!
//! 消费支付通道更新订单状态，并监控死信通道。

use std::sync::Arc;

use payment_service::SERVICE_NAME;
use payment_service::confirmer::PaymentConfirmer;
use payment_service::consumer::PaymentConsumer;
use ticket_shared::config::AppConfig;
use ticket_shared::{observability, shutdown, store};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME)?;
    let _guard = observability::init(SERVICE_NAME, &config.observability).await?;

    info!(
        environment = %config.environment,
        channel = %config.channels.payments,
        dead_letter = %config.channels.dead_letter,
        "Starting payment-service..."
    );

    let store = store::connect(&config.store, &config.database).await?;
    let confirmer = Arc::new(PaymentConfirmer::new(store));

    let consumer = PaymentConsumer::connect(&config, confirmer)?;
    consumer.run(shutdown::watch()).await;

    info!("payment-service shutdown complete");
    Ok(())
}
