//! End-to-end document processing.
//!
//! [`Pipeline::process_document`] runs, in order:
//!
//! ```text
//! task check → read PDF → extract → clean → chunk → ensure index → prompt → complete
//! ```
//!
//! Every step is awaited sequentially on the calling task. The first failure
//! short-circuits with a [`ProcessError`] whose `Display` is the diagnostic
//! handed back to the user; there are no partial results.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::chunk::chunk_text;
use crate::clean::clean_text;
use crate::completion::{create_completer, Completer, CompletionError};
use crate::config::AppConfig;
use crate::embedding::{create_embedder, Embedder};
use crate::extract::{extract_text, read_source, ExtractError};
use crate::index::{BuildOutcome, IndexError, VectorIndex};
use crate::models::{BackendConfig, SearchResult, TaskType, UnknownTaskType};
use crate::prompt::build_prompt;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("未知的任务类型")]
    UnknownTaskType(#[from] UnknownTaskType),
    #[error("文件不存在: {}", .0.display())]
    MissingSource(PathBuf),
    #[error("读取文件失败: {0}")]
    Read(#[source] ExtractError),
    #[error("无法从PDF提取文本")]
    Extraction,
    #[error("创建向量索引失败")]
    IndexBuild(#[source] IndexError),
    #[error(transparent)]
    Completion(#[from] CompletionError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessOptions {
    /// Re-embed even if an index already exists for the document.
    pub force_rebuild: bool,
}

pub struct Pipeline {
    index: VectorIndex,
    completer: Arc<dyn Completer>,
    chunk_size: usize,
    top_k: usize,
}

impl Pipeline {
    pub fn new(
        index: VectorIndex,
        completer: Arc<dyn Completer>,
        chunk_size: usize,
        top_k: usize,
    ) -> Self {
        Self {
            index,
            completer,
            chunk_size,
            top_k,
        }
    }

    /// Wires up the backends for `backend` using the settings in `config`.
    pub fn from_config(config: &AppConfig, backend: &BackendConfig) -> Result<Self> {
        let embedder: Arc<dyn Embedder> = Arc::from(create_embedder(
            backend,
            Duration::from_secs(config.timeouts.embedding_secs),
            config.index.vector_dim,
        )?);
        let completer: Arc<dyn Completer> = Arc::from(create_completer(
            backend,
            Duration::from_secs(config.timeouts.completion_secs),
            Duration::from_millis(config.simulation.latency_ms),
        )?);
        let index = VectorIndex::open(&config.index.dir, config.index.vector_dim, embedder)
            .with_context(|| {
                format!(
                    "Failed to open index directory: {}",
                    config.index.dir.display()
                )
            })?;

        Ok(Self::new(
            index,
            completer,
            config.chunking.chunk_size,
            config.retrieval.top_k,
        ))
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Runs `task_type` over the PDF at `pdf_path`.
    ///
    /// The task type is checked first, so an unsupported task never
    /// touches the file, the embedder, or the completer.
    pub async fn process_document(
        &self,
        document_id: &str,
        pdf_path: &Path,
        task_type: &str,
        options: ProcessOptions,
    ) -> Result<String, ProcessError> {
        let task: TaskType = task_type.parse()?;

        let bytes = read_source(pdf_path).map_err(|e| match e {
            ExtractError::MissingSource(path) => ProcessError::MissingSource(path),
            other => ProcessError::Read(other),
        })?;

        self.process_bytes(document_id, &bytes, task, options).await
    }

    /// Same as [`process_document`](Self::process_document) for callers that
    /// already hold the PDF bytes.
    pub async fn process_bytes(
        &self,
        document_id: &str,
        pdf_bytes: &[u8],
        task: TaskType,
        options: ProcessOptions,
    ) -> Result<String, ProcessError> {
        let text = extract_text(pdf_bytes);
        if text.trim().is_empty() {
            log::warn!("No text extracted for document {}", document_id);
            return Err(ProcessError::Extraction);
        }
        self.process_text(document_id, &text, task, options).await
    }

    /// Everything after extraction: clean, chunk, index, prompt, complete.
    pub async fn process_text(
        &self,
        document_id: &str,
        text: &str,
        task: TaskType,
        options: ProcessOptions,
    ) -> Result<String, ProcessError> {
        let cleaned = clean_text(text);
        let chunks = chunk_text(&cleaned, self.chunk_size);
        log::info!(
            "Document {}: {} chars extracted, {} chunks",
            document_id,
            text.chars().count(),
            chunks.len()
        );

        match self
            .index
            .ensure_built(document_id, &chunks, options.force_rebuild)
            .await
        {
            Ok(BuildOutcome::Built) => log::info!("Built index for document {}", document_id),
            Ok(BuildOutcome::Reused) => {
                log::info!("Reusing index for document {}", document_id)
            }
            Err(e) => {
                log::error!("Index build failed for document {}: {}", document_id, e);
                return Err(ProcessError::IndexBuild(e));
            }
        }

        let prompt = build_prompt(task, &chunks);
        log::debug!("Built {} prompt ({} chars)", task, prompt.chars().count());

        let result = self.completer.complete(&prompt, None, None).await;
        if let Err(e) = &result {
            log::error!("Completion failed for document {}: {:?}", document_id, e);
        }
        Ok(result?)
    }

    /// Similarity search over an already-built document index.
    pub async fn search(
        &self,
        document_id: &str,
        query: &str,
        top_k: Option<usize>,
    ) -> Vec<SearchResult> {
        self.index
            .search(document_id, query, top_k.unwrap_or(self.top_k))
            .await
    }
}
