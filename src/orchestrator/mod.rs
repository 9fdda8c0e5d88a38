//! Request orchestration and answer delivery
//!
//! Runs planned chunks sequentially against the completion endpoint and
//! relays streamed fragments to an [`AnswerSink`].

pub mod pipeline;
pub mod runner;
pub mod sink;

pub use pipeline::QaPipeline;
pub use runner::{AnswerReport, ChunkOutcome, ChunkState, RequestOrchestrator};
pub use sink::{AnswerEvent, AnswerSink, ChannelSink, CollectingSink, ConsoleSink};
