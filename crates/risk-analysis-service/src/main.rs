//! 风险分析服务
//!
//! 消费风险分析通道，对新订单评分并写入风险字段，高风险订单触发告警。

use std::sync::Arc;

use alert_dispatcher::{AlertDispatcher, build_notifier};
use risk_analysis_service::SERVICE_NAME;
use risk_analysis_service::classifier::RiskClassifier;
use risk_analysis_service::consumer::RiskAnalysisConsumer;
use risk_analysis_service::scoring::build_scorer;
use ticket_shared::config::AppConfig;
use ticket_shared::{observability, shutdown, store};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME)?;
    let _guard = observability::init(SERVICE_NAME, &config.observability).await?;

    info!(
        environment = %config.environment,
        channel = %config.channels.risk_analysis,
        scoring_mode = ?config.scoring.mode,
        "Starting risk-analysis-service..."
    );

    let store = store::connect(&config.store, &config.database).await?;
    let scorer = build_scorer(&config.scoring)?;
    let alerts = Arc::new(AlertDispatcher::new(
        build_notifier(&config.alert)?,
        config.alert.operator_address.clone(),
    ));
    let classifier = Arc::new(RiskClassifier::new(store, scorer, alerts));

    let consumer = RiskAnalysisConsumer::connect(&config, classifier)?;
    consumer.run(shutdown::watch()).await;

    info!("risk-analysis-service shutdown complete");
    Ok(())
}
