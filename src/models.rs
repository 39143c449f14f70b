//! Core data models used throughout the pipeline.
//!
//! These types represent the resolved backend, the task being requested,
//! the per-document index, and search hits that flow between the
//! extraction, indexing, and generation stages.

use std::fmt;
use std::str::FromStr;

/// Default chat model used when no persisted configuration names one.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
/// Default embedding model used when no persisted configuration names one.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
/// Fixed dimensionality of every stored vector.
pub const VECTOR_DIM: usize = 1536;

/// The active embedding/LLM backend, resolved once at the process boundary.
///
/// When `simulation_mode` is true, `api_key` and `base_url` are never used
/// for an outbound call.
#[derive(Clone, PartialEq)]
pub struct BackendConfig {
    pub api_key: String,
    /// Base URL without a trailing slash (e.g. `https://api.aihubmix.com/v1`).
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub simulation_mode: bool,
}

impl BackendConfig {
    /// The configuration used when no live backend is available.
    pub fn simulation() -> Self {
        Self {
            api_key: String::new(),
            base_url: String::new(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            simulation_mode: true,
        }
    }

    /// API key with everything but the last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        let count = self.api_key.chars().count();
        if count <= 4 {
            return "*".repeat(count);
        }
        let tail: String = self.api_key.chars().skip(count - 4).collect();
        format!("{}{}", "*".repeat(count - 4), tail)
    }
}

// Hand-written so the key never ends up in logs.
impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("api_key", &self.masked_api_key())
            .field("base_url", &self.base_url)
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("simulation_mode", &self.simulation_mode)
            .finish()
    }
}

/// The fixed set of generation tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    Summary,
    Analysis,
    Questions,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Summary => "summary",
            TaskType::Analysis => "analysis",
            TaskType::Questions => "questions",
        }
    }

    /// How many leading chunks go into the prompt for this task.
    pub fn context_window(&self) -> usize {
        match self {
            TaskType::Summary => 10,
            TaskType::Analysis => 15,
            TaskType::Questions => 12,
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a task type string is not one of the supported tasks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("未知的任务类型")]
pub struct UnknownTaskType(pub String);

impl FromStr for TaskType {
    type Err = UnknownTaskType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summary" => Ok(TaskType::Summary),
            "analysis" => Ok(TaskType::Analysis),
            "questions" => Ok(TaskType::Questions),
            other => Err(UnknownTaskType(other.to_string())),
        }
    }
}

/// A chunk returned from a similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub text: String,
    /// Raw inner-product score; higher is closer.
    pub score: f32,
}

/// The persisted state for one document: vectors and chunks, index-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentIndex {
    pub dim: usize,
    pub vectors: Vec<Vec<f32>>,
    pub chunks: Vec<String>,
}
