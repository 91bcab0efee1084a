//! 风险告警分发
//!
//! 风险分类结果为 HIGH 时，向固定的运营人员渠道发送一条告警通知。
//! 告警只发送一次，自身不重试；发送失败仅记录日志，不影响已提交的风险写入。

pub mod dispatcher;
pub mod error;
pub mod sender;
pub mod templates;

pub use dispatcher::{AlertDispatcher, AlertOutcome, RiskAlert};
pub use error::AlertError;
pub use sender::{LogNotifier, Notification, Notifier, SendResult, WebhookNotifier, build_notifier};
