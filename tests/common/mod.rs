//! Shared fixtures: a fake OpenAI-compatible backend and counting test doubles.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use pdf_insight::completion::{Completer, CompletionError};
use pdf_insight::embedding::{EmbedError, Embedder};
use pdf_insight::models::{BackendConfig, VECTOR_DIM};

pub const API_KEY: &str = "test-key";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChatMode {
    /// Echo back which task marker the prompt contained.
    Echo,
    /// 401 with an OpenAI-style error object.
    Unauthorized,
    /// 200 with no `choices`.
    Malformed,
    /// Sleep past any reasonable client timeout.
    Slow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EmbedMode {
    /// One vector per input.
    Vectors,
    /// 200 with no `data` array.
    NoData,
    /// 200 with one vector fewer than requested.
    Short,
}

pub struct FakeBackend {
    pub embed_status: u16,
    pub embed_mode: EmbedMode,
    pub chat_mode: ChatMode,
    pub embed_calls: AtomicUsize,
    pub chat_calls: AtomicUsize,
    pub last_chat_body: Mutex<Option<Value>>,
}

impl FakeBackend {
    pub fn new(embed_status: u16, chat_mode: ChatMode) -> Arc<Self> {
        Self::build(embed_status, EmbedMode::Vectors, chat_mode)
    }

    pub fn with_embed_mode(embed_mode: EmbedMode) -> Arc<Self> {
        Self::build(200, embed_mode, ChatMode::Echo)
    }

    fn build(embed_status: u16, embed_mode: EmbedMode, chat_mode: ChatMode) -> Arc<Self> {
        Arc::new(Self {
            embed_status,
            embed_mode,
            chat_mode,
            embed_calls: AtomicUsize::new(0),
            chat_calls: AtomicUsize::new(0),
            last_chat_body: Mutex::new(None),
        })
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", API_KEY))
}

async fn embeddings(
    State(state): State<Arc<FakeBackend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.embed_calls.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "missing bearer token").into_response();
    }
    if state.embed_status != 200 {
        let status = StatusCode::from_u16(state.embed_status).unwrap();
        return (status, "embedding backend exploded").into_response();
    }

    if state.embed_mode == EmbedMode::NoData {
        return Json(json!({"object": "list", "model": "fake"})).into_response();
    }

    let mut inputs = body["input"].as_array().cloned().unwrap_or_default();
    if state.embed_mode == EmbedMode::Short {
        inputs.pop();
    }
    let data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let len = text.as_str().unwrap_or_default().chars().count();
            let mut v = vec![0.0f32; VECTOR_DIM];
            v[len % VECTOR_DIM] = len as f32;
            json!({"object": "embedding", "index": i, "embedding": v})
        })
        .collect();
    Json(json!({"object": "list", "data": data})).into_response()
}

async fn chat(
    State(state): State<Arc<FakeBackend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.chat_calls.fetch_add(1, Ordering::SeqCst);
    *state.last_chat_body.lock().unwrap() = Some(body.clone());
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "missing bearer token").into_response();
    }

    match state.chat_mode {
        ChatMode::Echo => {
            let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
            let content = if prompt.contains("总结要点") {
                "live summary"
            } else if prompt.contains("详细分析") {
                "live analysis"
            } else {
                "live other"
            };
            Json(json!({
                "id": "chatcmpl-1",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
            }))
            .into_response()
        }
        ChatMode::Unauthorized => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"message": "invalid api key", "type": "auth_error"}})),
        )
            .into_response(),
        ChatMode::Malformed => Json(json!({"id": "chatcmpl-1", "choices": []})).into_response(),
        ChatMode::Slow => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"choices": [{"message": {"content": "too late"}}]})).into_response()
        }
    }
}

/// Serves the fake backend on an ephemeral local port.
pub async fn spawn_backend(state: Arc<FakeBackend>) -> SocketAddr {
    let app = Router::new()
        .route("/v1/embeddings", post(embeddings))
        .route("/v1/chat/completions", post(chat))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub fn live_backend(addr: SocketAddr) -> BackendConfig {
    BackendConfig {
        api_key: API_KEY.to_string(),
        base_url: format!("http://{}/v1", addr),
        simulation_mode: false,
        ..BackendConfig::simulation()
    }
}

/// Embedder double that counts calls and never touches the network.
pub struct CountingEmbedder {
    pub calls: AtomicUsize,
}

impl CountingEmbedder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for CountingEmbedder {
    fn model_name(&self) -> &str {
        "counting"
    }
    fn dims(&self) -> usize {
        VECTOR_DIM
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|_| vec![0.5; VECTOR_DIM]).collect())
    }
}

/// Completer double that counts calls and returns a fixed reply.
pub struct CountingCompleter {
    pub calls: AtomicUsize,
}

impl CountingCompleter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Completer for CountingCompleter {
    fn model_name(&self) -> &str {
        "counting"
    }
    async fn complete(
        &self,
        _prompt: &str,
        _temperature: Option<f32>,
        _max_tokens: Option<u32>,
    ) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("done".to_string())
    }
}
