//! Chat-completion endpoint integration
//!
//! One streaming POST per chunk, bearer-authenticated with an injected
//! credential. Responses are read line by line as they arrive.

pub mod client;
pub mod config;
pub mod credential;
pub mod models;

pub use client::{ChunkError, CompletionClient, CompletionStream};
pub use config::CompletionConfig;
pub use credential::ApiCredential;
pub use models::{parse_stream_line, ChatMessage, CompletionRequest, Role, StreamLine};
