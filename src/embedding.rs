//! Embedding backends and vector utilities.
//!
//! Defines the [`Embedder`] trait and two implementations:
//! - **[`OpenAIEmbedder`]**: calls an OpenAI-compatible `POST {base_url}/embeddings`
//!   endpoint with every input text in a single batch.
//! - **[`SimulatedEmbedder`]**: returns random vectors of the right dimension.
//!   It exists only to keep the pipeline runnable without network access; its
//!   vectors carry no meaning and retrieval quality is undefined.
//!
//! Also provides vector helpers used by the index:
//! - [`inner_product`]: the similarity metric for stored vectors
//! - [`vec_to_blob`] / [`blob_to_vec`]: little-endian `f32` encoding
//!
//! # Failure handling
//!
//! One attempt per call, no retry. Any non-200 status, unparseable body,
//! or transport error (including the timeout) is returned as an
//! [`EmbedError`] so index creation can abort.

use async_trait::async_trait;
use rand::Rng;
use reqwest::StatusCode;
use std::time::Duration;

use crate::models::BackendConfig;

#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("embedding API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid embedding response: {0}")]
    Malformed(String),
    #[error("expected {expected} embeddings, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
    #[error("embedding request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Converts text into fixed-dimension vectors, one per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-ada-002"`).
    fn model_name(&self) -> &str;
    /// Returns the vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;
}

/// Embed a single query text.
pub async fn embed_query(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>, EmbedError> {
    let results = embedder.embed(&[text.to_string()]).await?;
    results
        .into_iter()
        .next()
        .ok_or(EmbedError::CountMismatch {
            expected: 1,
            actual: 0,
        })
}

// ============ Simulated ============

/// Random-vector fallback used in simulation mode.
pub struct SimulatedEmbedder {
    model: String,
    dims: usize,
}

impl SimulatedEmbedder {
    pub fn new(model: &str, dims: usize) -> Self {
        Self {
            model: model.to_string(),
            dims,
        }
    }
}

#[async_trait]
impl Embedder for SimulatedEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        log::info!("Simulation mode: generating {} random embeddings", texts.len());
        let mut rng = rand::thread_rng();
        Ok(texts
            .iter()
            .map(|_| (0..self.dims).map(|_| rng.gen::<f32>()).collect())
            .collect())
    }
}

// ============ OpenAI-compatible ============

/// Embedder for any OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dims: usize,
}

impl OpenAIEmbedder {
    pub fn new(backend: &BackendConfig, timeout: Duration, dims: usize) -> Result<Self, EmbedError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", backend.base_url),
            api_key: backend.api_key.clone(),
            model: backend.embedding_model.clone(),
            dims,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        log::info!("Calling embedding API: {}", self.endpoint);
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

        if status != StatusCode::OK {
            log::warn!("Embedding API error: {} - {}", status, text);
            return Err(EmbedError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let json: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| EmbedError::Malformed(e.to_string()))?;
        let embeddings = parse_embedding_response(&json)?;

        if embeddings.len() != texts.len() {
            return Err(EmbedError::CountMismatch {
                expected: texts.len(),
                actual: embeddings.len(),
            });
        }
        Ok(embeddings)
    }
}

/// Extracts `data[].embedding`, ordered by `data[].index` when every item has one.
fn parse_embedding_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, EmbedError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| EmbedError::Malformed(format!("missing data array: {}", json)))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| EmbedError::Malformed("missing embedding".to_string()))?;

        let vec = embedding
            .iter()
            .map(|v| {
                v.as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| EmbedError::Malformed("non-numeric embedding value".to_string()))
            })
            .collect::<Result<Vec<f32>, _>>()?;

        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize);
        indexed.push((index.unwrap_or(position), index.is_some(), vec));
    }

    if indexed.iter().all(|(_, has_index, _)| *has_index) {
        indexed.sort_by_key(|(i, _, _)| *i);
    }

    Ok(indexed.into_iter().map(|(_, _, v)| v).collect())
}

/// Create the embedder for the resolved backend.
pub fn create_embedder(
    backend: &BackendConfig,
    timeout: Duration,
    dims: usize,
) -> Result<Box<dyn Embedder>, EmbedError> {
    if backend.simulation_mode {
        return Ok(Box::new(SimulatedEmbedder::new(&backend.embedding_model, dims)));
    }
    Ok(Box::new(OpenAIEmbedder::new(backend, timeout, dims)?))
}

/// Encode a float vector as little-endian `f32` bytes.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode little-endian `f32` bytes; trailing partial values are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Raw dot product. Not normalized: vectors that are not unit length rank
/// by magnitude as well as direction.
///
/// Returns `0.0` for vectors of different lengths.
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
