//! 模型评分
//!
//! 以 messages 风格的接口调用外部模型：提示中给出订单 JSON 与分级规则，
//! 要求只返回 JSON 对象；取响应中第一个文本块交给解码器。
//! 请求有超时上限，网络错误、超时与非 2xx 响应都是瞬时错误。

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ticket_shared::config::ScoringConfig;
use ticket_shared::observability::metrics;
use tracing::{debug, warn};

use super::{OrderSummary, RiskScorer};
use crate::decode::{ScoringResponse, decode_scoring_text};
use crate::error::ScoringError;

const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl MessagesResponse {
    fn first_text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text.as_deref())
    }
}

pub struct ModelScorer {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
}

impl ModelScorer {
    pub fn new(config: &ScoringConfig) -> Result<Self, ScoringError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ScoringError::Transient(format!("HTTP 客户端创建失败: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            max_tokens: config.max_tokens,
        })
    }

    fn prompt(order: &OrderSummary) -> Result<String, ScoringError> {
        let order_json = serde_json::to_string(order)
            .map_err(|e| ScoringError::Malformed(format!("订单序列化失败: {e}")))?;

        Ok(format!(
            "You are a fraud detection system. Analyze this order JSON:\n\
             {order_json}\n\n\
             Rules:\n\
             1. Amount > 2000 -> Risk HIGH.\n\
             2. Amount > 500 -> Risk MEDIUM (VIP).\n\
             3. Else -> Risk LOW.\n\n\
             Return ONLY JSON: {{ \"risk\": \"LOW|MEDIUM|HIGH\", \"recommendation\": \"string\", \"vipStatus\": boolean }}"
        ))
    }

    async fn request(&self, order: &OrderSummary) -> Result<ScoringResponse, ScoringError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: Self::prompt(order)?,
            }],
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("anthropic-version", API_VERSION)
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ScoringError::Transient(format!("评分请求超时: {e}"))
            } else {
                ScoringError::Transient(format!("评分请求失败: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoringError::Transient(format!(
                "评分服务返回 HTTP {}",
                status.as_u16()
            )));
        }

        // 读取响应体同样受超时约束，读取失败属于瞬时错误
        let raw = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ScoringError::Transient(format!("读取评分响应超时: {e}"))
            } else {
                ScoringError::Transient(format!("读取评分响应失败: {e}"))
            }
        })?;
        let payload: MessagesResponse = serde_json::from_slice(&raw)
            .map_err(|e| ScoringError::Malformed(format!("评分响应无法解析: {e}")))?;

        let text = payload
            .first_text()
            .ok_or_else(|| ScoringError::Malformed("评分响应不含文本块".to_string()))?;

        debug!(order_id = %order.order_id, output = text, "收到模型输出");
        decode_scoring_text(text).inspect_err(|e| {
            warn!(order_id = %order.order_id, output = text, error = %e, "模型输出不符合结果格式");
        })
    }
}

#[async_trait]
impl RiskScorer for ModelScorer {
    async fn classify(&self, order: &OrderSummary) -> Result<ScoringResponse, ScoringError> {
        let start = Instant::now();
        let result = self.request(order).await;
        metrics::record_scoring_duration(self.name(), start.elapsed().as_secs_f64());
        result
    }

    fn name(&self) -> &'static str {
        "model"
    }
}
