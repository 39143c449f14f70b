//! Settings file parsing and backend resolution.
//!
//! [`AppConfig`] is read from a TOML file and carries storage, chunking,
//! retrieval, timeout, and simulation settings. Its optional `[backend]`
//! table is the persisted "active configuration" record.
//!
//! [`ConfigResolver`] is the only place that looks at ambient state (the
//! persisted record and the process environment). Everything downstream
//! receives the resolved [`BackendConfig`] explicitly.
//!
//! Resolution order:
//! 1. an active persisted backend with a non-empty `api_key` and `base_url`
//! 2. `AIHUBMIX_API_KEY` + `AIHUBMIX_BASE_URL` from the environment
//! 3. simulation defaults

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::{
    BackendConfig, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL, DEFAULT_MAX_TOKENS,
    DEFAULT_TEMPERATURE, VECTOR_DIM,
};

pub const ENV_API_KEY: &str = "AIHUBMIX_API_KEY";
pub const ENV_BASE_URL: &str = "AIHUBMIX_BASE_URL";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub backend: Option<StoredBackend>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_vector_dim")]
    pub vector_dim: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: default_index_dir(),
            vector_dim: VECTOR_DIM,
        }
    }
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("./faiss_index")
}
fn default_vector_dim() -> usize {
    VECTOR_DIM
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    400
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimeoutConfig {
    #[serde(default = "default_embedding_secs")]
    pub embedding_secs: u64,
    #[serde(default = "default_completion_secs")]
    pub completion_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            embedding_secs: default_embedding_secs(),
            completion_secs: default_completion_secs(),
        }
    }
}

fn default_embedding_secs() -> u64 {
    30
}
fn default_completion_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Artificial delay before a canned completion is returned.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_latency_ms(),
        }
    }
}

fn default_latency_ms() -> u64 {
    2000
}

/// Persisted backend record (the `[backend]` table).
#[derive(Debug, Deserialize, Clone)]
pub struct StoredBackend {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
}

fn default_base_url() -> String {
    "https://api.aihubmix.com/v1".to_string()
}
fn default_chat_model() -> String {
    DEFAULT_CHAT_MODEL.to_string()
}
fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}
fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}
fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}
fn default_is_active() -> bool {
    true
}

pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: AppConfig =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &AppConfig) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.index.vector_dim == 0 {
        anyhow::bail!("index.vector_dim must be > 0");
    }
    if config.timeouts.embedding_secs == 0 || config.timeouts.completion_secs == 0 {
        anyhow::bail!("timeouts must be > 0 seconds");
    }
    if let Some(backend) = &config.backend {
        if !(0.0..=2.0).contains(&backend.temperature) {
            anyhow::bail!("backend.temperature must be in [0.0, 2.0]");
        }
        if backend.max_tokens == 0 {
            anyhow::bail!("backend.max_tokens must be > 0");
        }
    }
    Ok(())
}

/// External key-value lookup for the persisted active backend.
pub trait ActiveConfigLookup: Send + Sync {
    /// Returns the active record, `None` when nothing is marked active.
    fn active_backend(&self) -> Result<Option<StoredBackend>>;
}

impl ActiveConfigLookup for AppConfig {
    fn active_backend(&self) -> Result<Option<StoredBackend>> {
        Ok(self.backend.clone().filter(|b| b.is_active))
    }
}

type EnvLookup<'a> = Box<dyn Fn(&str) -> Option<String> + Send + Sync + 'a>;

/// Decides which [`BackendConfig`] is active. Never fails.
pub struct ConfigResolver<'a> {
    store: Option<&'a dyn ActiveConfigLookup>,
    env: EnvLookup<'a>,
}

impl<'a> ConfigResolver<'a> {
    /// Resolver reading the real process environment.
    pub fn new(store: Option<&'a dyn ActiveConfigLookup>) -> Self {
        Self::with_env(store, |key| std::env::var(key).ok())
    }

    pub fn with_env<F>(store: Option<&'a dyn ActiveConfigLookup>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'a,
    {
        Self {
            store,
            env: Box::new(env),
        }
    }

    pub fn resolve(&self) -> BackendConfig {
        if let Some(store) = self.store {
            match store.active_backend() {
                Ok(Some(stored)) => {
                    let base_url = stored.base_url.trim().trim_end_matches('/');
                    if !stored.api_key.trim().is_empty() && !base_url.is_empty() {
                        log::info!(
                            "Using persisted backend configuration '{}'",
                            stored.name.as_deref().unwrap_or("default")
                        );
                        return BackendConfig {
                            api_key: stored.api_key.trim().to_string(),
                            base_url: base_url.to_string(),
                            chat_model: stored.chat_model,
                            embedding_model: stored.embedding_model,
                            temperature: stored.temperature,
                            max_tokens: stored.max_tokens,
                            simulation_mode: false,
                        };
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    log::warn!("Failed to load persisted backend configuration: {e:#}; trying environment");
                }
            }
        }

        let api_key = (self.env)(ENV_API_KEY).unwrap_or_default();
        let base_url = (self.env)(ENV_BASE_URL).unwrap_or_default();
        let api_key = api_key.trim();
        let base_url = base_url.trim().trim_end_matches('/');

        if api_key.is_empty() || base_url.is_empty() {
            log::warn!("No backend configuration found; running in simulation mode");
            return BackendConfig::simulation();
        }

        log::info!("Using backend configuration from environment");
        BackendConfig {
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
            simulation_mode: false,
            ..BackendConfig::simulation()
        }
    }
}

/// Resolves the backend against `config` and the process environment.
pub fn resolve_backend(config: &AppConfig) -> BackendConfig {
    ConfigResolver::new(Some(config)).resolve()
}
