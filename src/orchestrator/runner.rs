//! Sequential per-chunk request orchestration
//!
//! Each chunk moves through `Pending → Sent → Streaming → Completed`, or ends
//! in `Failed`. Chunk *i+1* is dispatched only after chunk *i* has completed
//! or failed, and a failure never stops the remaining chunks.

use super::sink::{AnswerEvent, AnswerSink};
use crate::context::{Chunk, ChunkPlan};
use crate::llm::{parse_stream_line, ChunkError, CompletionClient, CompletionRequest, StreamLine};
use crate::metrics::METRICS;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Lifecycle of one chunk request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkState {
    Pending,
    Sent,
    Streaming,
    Completed,
    Failed,
}

impl ChunkState {
    /// Allowed transitions
    pub fn can_advance_to(self, next: ChunkState) -> bool {
        use ChunkState::*;
        matches!(
            (self, next),
            (Pending, Sent)
                | (Sent, Streaming)
                | (Sent, Failed)
                | (Streaming, Completed)
                | (Streaming, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ChunkState::Completed | ChunkState::Failed)
    }
}

/// Result of one chunk
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkOutcome {
    pub index: usize,
    pub state: ChunkState,
    pub fragments: usize,
    pub error: Option<ChunkError>,
}

impl ChunkOutcome {
    fn pending(index: usize) -> Self {
        Self {
            index,
            state: ChunkState::Pending,
            fragments: 0,
            error: None,
        }
    }

    fn advance(&mut self, next: ChunkState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "invalid chunk transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!("Chunk {} {:?} -> {:?}", self.index + 1, self.state, next);
        self.state = next;
    }
}

/// Per-chunk outcomes of one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerReport {
    pub outcomes: Vec<ChunkOutcome>,
    pub cancelled: bool,
}

impl AnswerReport {
    pub fn completed(&self) -> usize {
        self.count(ChunkState::Completed)
    }

    pub fn failed(&self) -> usize {
        self.count(ChunkState::Failed)
    }

    /// Chunks never dispatched because the run was cancelled
    pub fn unsent(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.state.is_terminal()).count()
    }

    /// No chunk produced an answer
    pub fn all_failed(&self) -> bool {
        self.completed() == 0
    }

    fn count(&self, state: ChunkState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }
}

/// Dispatches planned chunks one at a time and relays their streams
pub struct RequestOrchestrator {
    client: CompletionClient,
    cancel: CancellationToken,
}

impl RequestOrchestrator {
    pub fn new(client: CompletionClient) -> Self {
        Self {
            client,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn client(&self) -> &CompletionClient {
        &self.client
    }

    /// Run every chunk of `plan` in order
    pub async fn run(&self, plan: &ChunkPlan, sink: &mut dyn AnswerSink) -> AnswerReport {
        let mut report = AnswerReport {
            outcomes: plan.chunks.iter().map(|c| ChunkOutcome::pending(c.index)).collect(),
            cancelled: false,
        };

        if let Some(truncation) = plan.truncation {
            sink.emit(AnswerEvent::Truncated(truncation));
        }

        for (chunk, outcome) in plan.chunks.iter().zip(report.outcomes.iter_mut()) {
            if self.cancel.is_cancelled() {
                info!("Run cancelled before chunk {}", chunk.label());
                report.cancelled = true;
                break;
            }

            let span = info_span!("chunk", index = chunk.index + 1, total = chunk.total);
            self.run_chunk(chunk, outcome, sink).instrument(span).await;

            if outcome.error == Some(ChunkError::Cancelled) {
                report.cancelled = true;
                break;
            }
        }

        info!(
            "Run finished: {} completed, {} failed, {} not sent of {} chunk(s)",
            report.completed(),
            report.failed(),
            report.unsent(),
            plan.len()
        );
        report
    }

    async fn run_chunk(&self, chunk: &Chunk, outcome: &mut ChunkOutcome, sink: &mut dyn AnswerSink) {
        let start = Instant::now();
        sink.emit(AnswerEvent::ChunkStarted {
            index: chunk.index,
            total: chunk.total,
        });

        let request = CompletionRequest::for_chunk(self.client.config(), &chunk.text);
        debug!("Sending chunk {} ({} tokens)", chunk.label(), chunk.token_count);
        outcome.advance(ChunkState::Sent);

        let opened = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ChunkError::Cancelled),
            result = self.client.open_stream(&request) => result,
        };

        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => return self.fail(chunk, outcome, e, start, sink),
        };
        outcome.advance(ChunkState::Streaming);

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Some(Err(ChunkError::Cancelled)),
                line = stream.next_line() => line,
            };

            let line = match next {
                None => break,
                Some(Ok(line)) => line,
                Some(Err(e)) => return self.fail(chunk, outcome, e, start, sink),
            };

            match parse_stream_line(&line) {
                StreamLine::Content(text) => {
                    outcome.fragments += 1;
                    METRICS.fragments_forwarded.inc();
                    sink.emit(AnswerEvent::Fragment {
                        index: chunk.index,
                        text,
                    });
                }
                StreamLine::Done => break,
                StreamLine::Empty => {}
                StreamLine::Error(message) => {
                    METRICS.malformed_events.inc();
                    warn!("Error event in stream for chunk {}: {}", chunk.label(), message);
                }
                StreamLine::Malformed => {
                    METRICS.malformed_events.inc();
                    debug!("Skipping malformed stream line ({} bytes)", line.len());
                }
            }
        }

        outcome.advance(ChunkState::Completed);
        METRICS.record_completion("completed", start.elapsed().as_secs_f64());
        info!(
            "Chunk {} completed with {} fragment(s) in {:?}",
            chunk.label(),
            outcome.fragments,
            start.elapsed()
        );
        sink.emit(AnswerEvent::ChunkCompleted {
            index: chunk.index,
            fragments: outcome.fragments,
        });
    }

    fn fail(
        &self,
        chunk: &Chunk,
        outcome: &mut ChunkOutcome,
        error: ChunkError,
        start: Instant,
        sink: &mut dyn AnswerSink,
    ) {
        outcome.advance(ChunkState::Failed);
        METRICS.record_completion(error.outcome(), start.elapsed().as_secs_f64());
        warn!("Chunk {} failed: {}", chunk.label(), error);

        outcome.error = Some(error.clone());
        sink.emit(AnswerEvent::ChunkFailed {
            index: chunk.index,
            error,
        });
    }
}
