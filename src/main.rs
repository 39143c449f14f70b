//! # PDF Insight CLI (`pdfi`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pdfi process <id> <pdf> --task <task>` | Summarize, analyze, or quiz a PDF |
//! | `pdfi search <id> "<query>"` | Similarity search over a document's index |
//! | `pdfi config` | Show the resolved backend |
//! | `pdfi index-remove <id>` | Delete a document's index |
//!
//! ## Examples
//!
//! ```bash
//! export AIHUBMIX_API_KEY=sk-...
//! export AIHUBMIX_BASE_URL=https://api.aihubmix.com/v1
//!
//! pdfi process 42 ./papers/ai.pdf --task summary
//! pdfi process 42 ./papers/ai.pdf --task questions --rebuild
//! pdfi search 42 "教育" --top-k 5
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG` (default `info`).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use pdf_insight::config::{self, AppConfig};
use pdf_insight::pipeline::{Pipeline, ProcessOptions};

/// PDF Insight: retrieval-augmented summaries, analyses, and quizzes for PDFs.
#[derive(Parser)]
#[command(name = "pdfi", version, about)]
struct Cli {
    /// Path to the settings file (TOML). Defaults apply when it does not exist.
    #[arg(long, global = true, default_value = "./config/pdfi.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a generation task over a PDF.
    ///
    /// Builds the document's vector index on first use and reuses it on
    /// later runs unless `--rebuild` is given.
    Process {
        /// Stable document identifier; keys the on-disk index.
        document_id: String,

        /// Path to the PDF file.
        pdf_path: PathBuf,

        /// Task: `summary`, `analysis`, or `questions`.
        #[arg(long, default_value = "summary")]
        task: String,

        /// Re-embed even if an index already exists for this document.
        #[arg(long)]
        rebuild: bool,
    },

    /// Search a document's index for chunks similar to a query.
    Search {
        document_id: String,
        query: String,

        /// Number of results (defaults to `[retrieval].top_k`).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Print the resolved backend configuration.
    Config,

    /// Delete the persisted index for a document.
    IndexRemove { document_id: String },
}

fn load_settings(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        config::load_config(path)
    } else {
        log::info!("No config at {}, using defaults", path.display());
        Ok(AppConfig::default())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let cfg = load_settings(&cli.config)?;
    let backend = config::resolve_backend(&cfg);

    match cli.command {
        Commands::Process {
            document_id,
            pdf_path,
            task,
            rebuild,
        } => {
            let pipeline = Pipeline::from_config(&cfg, &backend)?;
            let options = ProcessOptions {
                force_rebuild: rebuild,
            };
            match pipeline
                .process_document(&document_id, &pdf_path, &task, options)
                .await
            {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Search {
            document_id,
            query,
            top_k,
        } => {
            let pipeline = Pipeline::from_config(&cfg, &backend)?;
            let results = pipeline.search(&document_id, &query, top_k).await;
            if results.is_empty() {
                println!("No results.");
            }
            for (i, r) in results.iter().enumerate() {
                println!("{}. [{:.4}] {}", i + 1, r.score, r.text);
            }
        }
        Commands::Config => {
            println!("simulation_mode: {}", backend.simulation_mode);
            println!("api_key:         {}", backend.masked_api_key());
            println!("base_url:        {}", backend.base_url);
            println!("chat_model:      {}", backend.chat_model);
            println!("embedding_model: {}", backend.embedding_model);
            println!("temperature:     {}", backend.temperature);
            println!("max_tokens:      {}", backend.max_tokens);
            println!("index_dir:       {}", cfg.index.dir.display());
        }
        Commands::IndexRemove { document_id } => {
            let pipeline = Pipeline::from_config(&cfg, &backend)?;
            if pipeline.index().remove(&document_id)? {
                println!("Removed index for document {}", document_id);
            } else {
                println!("No index for document {}", document_id);
            }
        }
    }

    Ok(())
}
