//! Per-document vector index persisted on disk.
//!
//! Each document owns two artifacts in the index directory, keyed by its id:
//!
//! | File | Contents |
//! |------|----------|
//! | `{id}.index` | magic `PDFIIDX1`, `u32` dimension, `u32` count, then `count × dim` little-endian `f32` |
//! | `{id}_chunks.json` | JSON array of chunk strings, UTF-8, index-aligned with the vectors |
//!
//! Both are written to temporary files and renamed into place, so a failed
//! build never leaves a half-written pair behind. An existing pair is treated
//! as immutable: [`VectorIndex::ensure_built`] reuses it even if the chunks
//! that produced it have since changed, unless a rebuild is forced.
//!
//! Similarity is the raw inner product (see [`inner_product`]). Every search
//! re-reads the artifacts from disk; nothing is cached in memory.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::embedding::{
    blob_to_vec, embed_query, inner_product, vec_to_blob, EmbedError, Embedder,
};
use crate::models::{DocumentIndex, SearchResult};

const MAGIC: &[u8; 8] = b"PDFIIDX1";
const HEADER_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("no chunks to index")]
    Empty,
    #[error("invalid document id: {0:?}")]
    InvalidDocumentId(String),
    #[error(transparent)]
    Embedding(#[from] EmbedError),
    #[error("expected {expected} vectors, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
    #[error("vector dimension {actual} does not match index dimension {expected}")]
    Dimension { expected: usize, actual: usize },
    #[error("corrupt index for {document_id}: {reason}")]
    Corrupt { document_id: String, reason: String },
    #[error("index I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("chunk file error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What [`VectorIndex::ensure_built`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    Built,
    Reused,
}

pub struct VectorIndex {
    dir: PathBuf,
    dim: usize,
    embedder: Arc<dyn Embedder>,
    build_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl VectorIndex {
    /// Opens (creating if needed) the index directory.
    pub fn open(dir: &Path, dim: usize, embedder: Arc<dyn Embedder>) -> Result<Self, IndexError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            dim,
            embedder,
            build_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    fn index_path(&self, document_id: &str) -> PathBuf {
        self.dir.join(format!("{}.index", document_id))
    }

    fn chunks_path(&self, document_id: &str) -> PathBuf {
        self.dir.join(format!("{}_chunks.json", document_id))
    }

    /// True when both artifacts for `document_id` are present.
    pub fn exists(&self, document_id: &str) -> bool {
        validate_document_id(document_id).is_ok()
            && self.index_path(document_id).is_file()
            && self.chunks_path(document_id).is_file()
    }

    /// Embeds `chunks` and persists the pair. Writes nothing on failure.
    pub async fn build(&self, document_id: &str, chunks: &[String]) -> Result<(), IndexError> {
        validate_document_id(document_id)?;
        if chunks.is_empty() {
            return Err(IndexError::Empty);
        }

        log::info!(
            "Embedding {} chunks for document {} with {}",
            chunks.len(),
            document_id,
            self.embedder.model_name()
        );
        let vectors = self.embedder.embed(chunks).await?;

        if vectors.len() != chunks.len() {
            return Err(IndexError::CountMismatch {
                expected: chunks.len(),
                actual: vectors.len(),
            });
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dim) {
            return Err(IndexError::Dimension {
                expected: self.dim,
                actual: bad.len(),
            });
        }

        self.persist(document_id, &vectors, chunks)?;
        log::info!("Index written for document {}", document_id);
        Ok(())
    }

    fn persist(
        &self,
        document_id: &str,
        vectors: &[Vec<f32>],
        chunks: &[String],
    ) -> Result<(), IndexError> {
        let index_path = self.index_path(document_id);
        let chunks_path = self.chunks_path(document_id);

        let mut index_tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        index_tmp.write_all(&encode_vectors(self.dim, vectors))?;
        index_tmp.as_file().sync_all()?;

        let mut chunks_tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer(&mut chunks_tmp, chunks)?;
        chunks_tmp.as_file().sync_all()?;

        chunks_tmp.persist(&chunks_path).map_err(|e| e.error)?;
        if let Err(e) = index_tmp.persist(&index_path) {
            // Both artifacts go, including any stale index a forced rebuild was replacing.
            let _ = std::fs::remove_file(&chunks_path);
            let _ = std::fs::remove_file(&index_path);
            return Err(e.error.into());
        }
        Ok(())
    }

    /// Builds the index unless one already exists for `document_id`.
    ///
    /// Concurrent calls for the same id are serialized, so at most one of
    /// them embeds. Calls for different ids do not block each other.
    pub async fn ensure_built(
        &self,
        document_id: &str,
        chunks: &[String],
        force_rebuild: bool,
    ) -> Result<BuildOutcome, IndexError> {
        validate_document_id(document_id)?;
        let lease = self.lease(document_id);
        let _guard = lease.lock.lock().await;
        if !force_rebuild && self.exists(document_id) {
            log::debug!("Reusing existing index for document {}", document_id);
            return Ok(BuildOutcome::Reused);
        }
        self.build(document_id, chunks).await?;
        Ok(BuildOutcome::Built)
    }

    fn lease(&self, document_id: &str) -> KeyLease<'_> {
        let mut locks = self.build_locks.lock().unwrap_or_else(|e| e.into_inner());
        let lock = locks
            .entry(document_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        KeyLease {
            locks: &self.build_locks,
            document_id: document_id.to_string(),
            lock,
        }
    }

    /// Loads under the key's lock so a concurrent rebuild is never seen half-renamed.
    async fn load_consistent(&self, document_id: &str) -> Result<Option<DocumentIndex>, IndexError> {
        validate_document_id(document_id)?;
        let lease = self.lease(document_id);
        let _guard = lease.lock.lock().await;
        self.load(document_id)
    }

    /// Reads the persisted pair, `None` if either artifact is missing.
    pub fn load(&self, document_id: &str) -> Result<Option<DocumentIndex>, IndexError> {
        validate_document_id(document_id)?;
        if !self.exists(document_id) {
            return Ok(None);
        }

        let raw = std::fs::read(self.index_path(document_id))?;
        let (dim, vectors) = decode_vectors(&raw).map_err(|reason| IndexError::Corrupt {
            document_id: document_id.to_string(),
            reason,
        })?;

        let chunks_file = std::fs::File::open(self.chunks_path(document_id))?;
        let chunks: Vec<String> = serde_json::from_reader(std::io::BufReader::new(chunks_file))?;

        if vectors.len() != chunks.len() {
            log::warn!(
                "Index for document {} has {} vectors but {} chunks",
                document_id,
                vectors.len(),
                chunks.len()
            );
        }

        Ok(Some(DocumentIndex {
            dim,
            vectors,
            chunks,
        }))
    }

    /// Top-`top_k` chunks by inner product with the embedded query,
    /// highest score first.
    ///
    /// Returns an empty list when there is no index for `document_id` or
    /// when anything along the way fails.
    pub async fn search(&self, document_id: &str, query: &str, top_k: usize) -> Vec<SearchResult> {
        let index = match self.load_consistent(document_id).await {
            Ok(Some(index)) => index,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::warn!("Search failed for document {}: {}", document_id, e);
                return Vec::new();
            }
        };

        let query_vec = match embed_query(self.embedder.as_ref(), query).await {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Query embedding failed: {}", e);
                return Vec::new();
            }
        };
        if query_vec.len() != index.dim {
            log::warn!(
                "Query dimension {} does not match index dimension {}",
                query_vec.len(),
                index.dim
            );
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = index
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, inner_product(&query_vec, v)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        scored
            .into_iter()
            .filter_map(|(i, score)| {
                index.chunks.get(i).map(|text| SearchResult {
                    text: text.clone(),
                    score,
                })
            })
            .collect()
    }

    /// Deletes both artifacts. Returns whether anything was removed.
    pub fn remove(&self, document_id: &str) -> Result<bool, IndexError> {
        validate_document_id(document_id)?;
        let mut removed = false;
        for path in [self.index_path(document_id), self.chunks_path(document_id)] {
            match std::fs::remove_file(&path) {
                Ok(()) => removed = true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }
}

/// A handle on one document's build lock. Dropping it removes the map
/// entry once no other caller holds the key, even if the owning future was
/// cancelled mid-await.
struct KeyLease<'a> {
    locks: &'a Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    document_id: String,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for KeyLease<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // The map's reference plus this one.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.document_id);
        }
    }
}

/// Ids become file names, so anything that could escape the index directory is refused.
fn validate_document_id(document_id: &str) -> Result<(), IndexError> {
    let invalid = document_id.is_empty()
        || document_id == "."
        || document_id == ".."
        || document_id
            .chars()
            .any(|c| c == '/' || c == '\\' || c == '\0');
    if invalid {
        return Err(IndexError::InvalidDocumentId(document_id.to_string()));
    }
    Ok(())
}

fn encode_vectors(dim: usize, vectors: &[Vec<f32>]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + vectors.len() * dim * 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&(dim as u32).to_le_bytes());
    out.extend_from_slice(&(vectors.len() as u32).to_le_bytes());
    for v in vectors {
        out.extend_from_slice(&vec_to_blob(v));
    }
    out
}

fn decode_vectors(raw: &[u8]) -> Result<(usize, Vec<Vec<f32>>), String> {
    if raw.len() < HEADER_LEN || &raw[..8] != MAGIC {
        return Err("bad header".to_string());
    }
    let dim = u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]) as usize;
    let count = u32::from_le_bytes([raw[12], raw[13], raw[14], raw[15]]) as usize;
    let body = &raw[HEADER_LEN..];
    if dim == 0 || body.len() != dim * count * 4 {
        return Err(format!(
            "expected {} vectors of dimension {}, found {} bytes",
            count,
            dim,
            body.len()
        ));
    }
    let vectors = body.chunks_exact(dim * 4).map(blob_to_vec).collect();
    Ok((dim, vectors))
}
