//! 记录所有告警的通知器

use std::sync::Mutex;

use alert_dispatcher::{AlertError, Notification, Notifier, SendResult};
use async_trait::async_trait;

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    /// 发往指定订单的告警
    pub fn sent_for(&self, order_id: &str) -> Vec<Notification> {
        let subject = format!("Alert: Risky Order {order_id}");
        self.sent()
            .into_iter()
            .filter(|n| n.subject == subject)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<SendResult, AlertError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(SendResult {
            channel: self.channel(),
            message_id: None,
        })
    }

    fn channel(&self) -> &'static str {
        "RECORDING"
    }
}
