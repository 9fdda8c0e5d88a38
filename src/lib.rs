//! Document question answering
//!
//! Fits a document and a question into a model's context budget, splitting
//! the text into token-bounded chunks when needed, and streams one
//! chat-completion answer per chunk.
//!
//! ```no_run
//! use doc_qa::{ApiCredential, Config, ConsoleSink, Document, QaPipeline};
//!
//! # async fn run() -> doc_qa::Result<()> {
//! let config = Config::load(None)?;
//! let credential = ApiCredential::from_env(&config.completion.api_key_env)?;
//! let pipeline = QaPipeline::new(&config, credential)?;
//!
//! let document = Document::from_upload("notes.md", std::fs::read("notes.md").unwrap())?;
//! let mut sink = ConsoleSink::new();
//! pipeline.answer(&document, "Can you give me a short summary?", &mut sink).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod llm;
pub mod logging;
pub mod metrics;
pub mod orchestrator;

pub use crate::config::{Config, LoggingConfig, PlannerConfig};
pub use context::{Chunk, ChunkPlan, ChunkPlanner, ChunkPolicy, QuestionPlacement, TokenBudget};
pub use error::{QaError, Result};
pub use extract::{Document, DocumentFormat};
pub use llm::{ApiCredential, ChunkError, CompletionClient, CompletionConfig};
pub use orchestrator::{
    AnswerEvent, AnswerReport, AnswerSink, ChannelSink, CollectingSink, ConsoleSink, QaPipeline,
    RequestOrchestrator,
};
