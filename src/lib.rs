//! # PDF Insight
//!
//! Retrieval-augmented summaries, analyses, and quizzes for PDF documents.
//!
//! A PDF is extracted, cleaned, split into sentence-aligned chunks, embedded,
//! and indexed per document. A task prompt is then built from the leading
//! chunks and sent to an OpenAI-compatible chat backend. With no backend
//! configured the whole pipeline runs in simulation mode.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐   ┌────────────┐
//! │ Extract  │──▶│ Clean+Chunk  │──▶│ Embed+Index  │──▶│   Prompt   │
//! │ (PDF)    │   │              │   │ (per doc id) │   │            │
//! └──────────┘   └──────────────┘   └──────────────┘   └─────┬──────┘
//!                                                            ▼
//!                                                     ┌────────────┐
//!                                                     │ Completion │
//!                                                     └────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML settings and backend resolution |
//! | [`models`] | Core data types |
//! | [`extract`] | PDF text extraction |
//! | [`clean`] | Text normalization |
//! | [`chunk`] | Sentence-boundary chunking |
//! | [`embedding`] | Embedding backends and vector helpers |
//! | [`index`] | Per-document on-disk vector index |
//! | [`prompt`] | Task prompt templates |
//! | [`completion`] | Chat completion backends |
//! | [`pipeline`] | End-to-end orchestration |

pub mod chunk;
pub mod clean;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod prompt;
