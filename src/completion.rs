//! Chat completion backends.
//!
//! - **[`OpenAICompleter`]**: one `POST {base_url}/chat/completions` request per call.
//! - **[`SimulatedCompleter`]**: waits briefly, then returns a canned response
//!   chosen by which task marker the prompt contains.
//!
//! Failures come back as a [`CompletionError`] rather than text on the
//! success path, so callers branch on the variant and never on message
//! contents. The `Display` form of each variant is the user-facing diagnostic.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

use crate::models::BackendConfig;
use crate::prompt::{ANALYSIS_MARKER, QUESTIONS_MARKER, QUESTIONS_MARKER_ALT, SUMMARY_MARKER};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompletionError {
    #[error("API请求超时，请稍后重试")]
    Timeout,
    #[error("无法连接到API，请检查网络连接: {0}")]
    Connection(String),
    #[error("API错误 ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("API响应格式异常: {0}")]
    MalformedResponse(String),
    #[error("调用API失败: {0}")]
    Request(String),
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CompletionError::Timeout
        } else if e.is_connect() {
            CompletionError::Connection(e.to_string())
        } else {
            CompletionError::Request(e.to_string())
        }
    }
}

#[async_trait]
pub trait Completer: Send + Sync {
    fn model_name(&self) -> &str;

    /// Generates text for `prompt`. `None` overrides fall back to the
    /// backend's configured temperature and token limit.
    async fn complete(
        &self,
        prompt: &str,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<String, CompletionError>;
}

// ============ Simulated ============

pub struct SimulatedCompleter {
    model: String,
    latency: Duration,
}

impl SimulatedCompleter {
    pub fn new(model: &str, latency: Duration) -> Self {
        Self {
            model: model.to_string(),
            latency,
        }
    }
}

#[async_trait]
impl Completer for SimulatedCompleter {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        prompt: &str,
        _temperature: Option<f32>,
        _max_tokens: Option<u32>,
    ) -> Result<String, CompletionError> {
        log::info!("Simulation mode: generating canned response");
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(simulated_response(prompt).to_string())
    }
}

/// Canned response for a prompt, matched on the task template markers.
pub fn simulated_response(prompt: &str) -> &'static str {
    if prompt.contains(SUMMARY_MARKER) {
        MOCK_SUMMARY
    } else if prompt.contains(ANALYSIS_MARKER) {
        MOCK_ANALYSIS
    } else if prompt.contains(QUESTIONS_MARKER) || prompt.contains(QUESTIONS_MARKER_ALT) {
        MOCK_QUESTIONS
    } else {
        MOCK_GENERIC
    }
}

pub const MOCK_GENERIC: &str = "这是AI生成的模拟响应。请配置AI API密钥以获取真实结果。";

const MOCK_SUMMARY: &str = "## 主要内容概述
这是一个示例文档的总结。文档主要讨论了现代技术对社会的影响。

## 关键要点
1. 技术发展迅速改变了人们的生活方式
2. 数字化转型已成为企业发展的必然趋势
3. 人工智能在各行各业都有广泛应用
4. 数据安全和个人隐私保护变得日益重要

## 重要结论
技术发展带来了巨大机遇，但也伴随着挑战，需要平衡创新与规范。";

const MOCK_ANALYSIS: &str = "## 内容深度解析
文档从多个角度分析了技术发展的影响，包括经济、社会和文化层面。

## 核心观点分析
1. **技术驱动变革**: 文档强调技术是推动社会进步的主要动力
2. **数字化转型**: 企业必须适应数字化趋势以保持竞争力
3. **伦理考量**: 技术创新需要与伦理规范相结合

## 逻辑结构分析
文档采用总分总结构，先提出总体观点，然后分点论述，最后总结升华。

## 价值与意义
本文为理解技术发展趋势提供了重要参考，对政策制定和企业战略具有指导意义。";

const MOCK_QUESTIONS: &str = "## 选择题（5道）
1. 技术发展的主要驱动力是什么？
   A. 市场需求
   B. 政策支持
   C. 科技创新
   D. 资本投入
   正确答案：C

2. 数字化转型对企业意味着什么？
   A. 增加成本
   B. 提高效率
   C. 减少员工
   D. 降低质量
   正确答案：B

## 判断题（3道）
1. 人工智能可以完全替代人类工作。 (错误)
2. 数据安全是数字化时代的重要议题。 (正确)
3. 技术发展只会带来正面影响。 (错误)

## 简答题（2道）
1. 请简述数字化转型的三个主要优势。
   参考答案：提高效率、优化流程、创新业务模式

## 填空题（3道）
1. 技术创新的核心是__创造性思维__。
2. 数字化转型的关键在于__数据驱动__。
3. 人工智能的基础是__算法和算力__。";

// ============ OpenAI-compatible ============

pub struct OpenAICompleter {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAICompleter {
    pub fn new(backend: &BackendConfig, timeout: Duration) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", backend.base_url),
            api_key: backend.api_key.clone(),
            model: backend.chat_model.clone(),
            temperature: backend.temperature,
            max_tokens: backend.max_tokens,
        })
    }
}

#[async_trait]
impl Completer for OpenAICompleter {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        prompt: &str,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<String, CompletionError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": temperature.unwrap_or(self.temperature),
            "max_tokens": max_tokens.unwrap_or(self.max_tokens),
            "stream": false,
        });

        log::info!("Calling chat API: {} (model {})", self.endpoint, self.model);
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        log::info!("Chat API response status: {}", status);

        if status != StatusCode::OK {
            log::warn!("Chat API error response: {}", text);
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }

        log::debug!("Chat API response: {}", text);
        parse_completion(&text)
    }
}

/// Pulls `choices[0].message.content` out of a successful response body.
fn parse_completion(raw: &str) -> Result<String, CompletionError> {
    let json: serde_json::Value = serde_json::from_str(raw)
        .map_err(|_| CompletionError::MalformedResponse(raw.to_string()))?;

    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.pointer("/message/content"))
        .and_then(|content| content.as_str())
        .map(str::to_string)
        .ok_or_else(|| CompletionError::MalformedResponse(raw.to_string()))
}

/// Best-effort message from an error body: `error.message`, then `error`,
/// then the raw text.
fn api_error_message(raw: &str) -> String {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(raw) else {
        return raw.to_string();
    };
    match json.get("error") {
        Some(serde_json::Value::Object(obj)) => match obj.get("message") {
            Some(serde_json::Value::String(msg)) => msg.clone(),
            Some(other) => other.to_string(),
            None => serde_json::Value::Object(obj.clone()).to_string(),
        },
        Some(serde_json::Value::String(msg)) => msg.clone(),
        Some(other) => other.to_string(),
        None => raw.to_string(),
    }
}

/// Create the completer for the resolved backend.
pub fn create_completer(
    backend: &BackendConfig,
    timeout: Duration,
    simulation_latency: Duration,
) -> Result<Box<dyn Completer>, CompletionError> {
    if backend.simulation_mode {
        return Ok(Box::new(SimulatedCompleter::new(
            &backend.chat_model,
            simulation_latency,
        )));
    }
    Ok(Box::new(OpenAICompleter::new(backend, timeout)?))
}
