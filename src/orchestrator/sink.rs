//! Output sinks for streamed answers

use crate::context::Truncation;
use crate::llm::ChunkError;
use std::io::Write;
use tokio::sync::mpsc;

/// Caller-visible event produced while answering
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerEvent {
    /// Input was cut to fit the budget
    Truncated(Truncation),
    ChunkStarted { index: usize, total: usize },
    /// One streamed piece of generated text
    Fragment { index: usize, text: String },
    ChunkCompleted { index: usize, fragments: usize },
    ChunkFailed { index: usize, error: ChunkError },
}

/// Destination for answer events
pub trait AnswerSink: Send {
    fn emit(&mut self, event: AnswerEvent);
}

/// Writes fragments to stdout and notices to stderr
#[derive(Debug, Default)]
pub struct ConsoleSink {
    quiet: bool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress chunk headers
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }
}

impl AnswerSink for ConsoleSink {
    fn emit(&mut self, event: AnswerEvent) {
        match event {
            AnswerEvent::Truncated(t) => {
                eprintln!(
                    "warning: document truncated to its first {} characters ({} of {} tokens kept)",
                    t.kept_chars, t.kept_tokens, t.original_tokens
                );
            }
            AnswerEvent::ChunkStarted { index, total } => {
                if total > 1 && !self.quiet {
                    eprintln!("--- chunk {}/{} ---", index + 1, total);
                }
            }
            AnswerEvent::Fragment { text, .. } => {
                let mut out = std::io::stdout().lock();
                let _ = out.write_all(text.as_bytes());
                let _ = out.flush();
            }
            AnswerEvent::ChunkCompleted { .. } => {
                println!();
            }
            AnswerEvent::ChunkFailed { index, error } => {
                eprintln!("error: chunk {} failed: {}", index + 1, error);
            }
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub events: Vec<AnswerEvent>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concatenated fragments of one chunk
    pub fn text_for(&self, chunk: usize) -> String {
        self.events
            .iter()
            .filter_map(|e| match e {
                AnswerEvent::Fragment { index, text } if *index == chunk => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn fragment_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AnswerEvent::Fragment { .. }))
            .count()
    }

    pub fn failures(&self) -> Vec<(usize, &ChunkError)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AnswerEvent::ChunkFailed { index, error } => Some((*index, error)),
                _ => None,
            })
            .collect()
    }
}

impl AnswerSink for CollectingSink {
    fn emit(&mut self, event: AnswerEvent) {
        self.events.push(event);
    }
}

/// Forwards events to an async consumer
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<AnswerEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<AnswerEvent>) -> Self {
        Self { tx }
    }

    /// Sink and the receiving end of its channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AnswerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl AnswerSink for ChannelSink {
    fn emit(&mut self, event: AnswerEvent) {
        // receiver gone means nobody is listening any more
        let _ = self.tx.send(event);
    }
}
