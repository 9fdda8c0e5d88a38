//! Streaming chat-completion client

use super::config::CompletionConfig;
use super::credential::ApiCredential;
use super::models::CompletionRequest;
use crate::error::{QaError, Result};
use bytes::{Bytes, BytesMut};
use futures::stream::{BoxStream, StreamExt};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Per-chunk request errors; a failed chunk never aborts the run
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Upstream error: status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Cancelled")]
    Cancelled,
}

impl ChunkError {
    /// HTTP status for upstream failures
    pub fn status(&self) -> Option<u16> {
        match self {
            ChunkError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Metric label
    pub fn outcome(&self) -> &'static str {
        match self {
            ChunkError::Transport(_) => "transport_error",
            ChunkError::Timeout(_) => "timeout",
            ChunkError::Upstream { .. } => "upstream_error",
            ChunkError::Cancelled => "cancelled",
        }
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChunkError::Timeout(e.to_string())
        } else {
            ChunkError::Transport(e.to_string())
        }
    }
}

/// Chat-completion client bound to one endpoint and credential
pub struct CompletionClient {
    http: Client,
    config: CompletionConfig,
    credential: ApiCredential,
}

impl CompletionClient {
    /// Create a new completion client
    pub fn new(config: CompletionConfig, credential: ApiCredential) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| QaError::Configuration(e.to_string()))?;

        Ok(Self {
            http,
            config,
            credential,
        })
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    /// Send a streaming request and return its line reader
    ///
    /// `timeout_ms` bounds the wait for response headers only; once the body
    /// streams, each read is bounded by `idle_timeout_ms` instead, so a long
    /// answer is never cut off while tokens keep arriving. Non-success
    /// statuses are read to completion and returned verbatim.
    pub async fn open_stream(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<CompletionStream, ChunkError> {
        debug!(
            "POST {} with {} message(s)",
            self.config.endpoint,
            request.messages.len()
        );

        let send = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(self.credential.bearer())
            .json(request)
            .send();

        let response = tokio::time::timeout(self.config.timeout(), send)
            .await
            .map_err(|_| {
                ChunkError::Timeout(format!("no response within {:?}", self.config.timeout()))
            })?
            .map_err(ChunkError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = match tokio::time::timeout(self.config.idle_timeout(), response.text()).await
            {
                Ok(Ok(body)) => body,
                Ok(Err(e)) => format!("<unreadable body: {}>", e),
                Err(_) => "<body timed out>".to_string(),
            };
            return Err(ChunkError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(CompletionStream::new(
            response.bytes_stream().boxed(),
            self.config.idle_timeout(),
        ))
    }
}

/// Newline-delimited reader over a streamed response body
pub struct CompletionStream {
    inner: BoxStream<'static, reqwest::Result<Bytes>>,
    buffer: BytesMut,
    idle_timeout: Duration,
    finished: bool,
}

impl CompletionStream {
    fn new(inner: BoxStream<'static, reqwest::Result<Bytes>>, idle_timeout: Duration) -> Self {
        Self {
            inner,
            buffer: BytesMut::new(),
            idle_timeout,
            finished: false,
        }
    }

    /// Next line without its terminator; `None` once the body is exhausted
    ///
    /// Waits on the network only when no complete line is buffered.
    pub async fn next_line(&mut self) -> Option<std::result::Result<String, ChunkError>> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
                let line = self.buffer.split_to(pos + 1);
                return Some(Ok(decode_line(&line[..pos])));
            }

            if self.finished {
                if self.buffer.is_empty() {
                    return None;
                }
                let rest = self.buffer.split();
                return Some(Ok(decode_line(&rest)));
            }

            let error = match tokio::time::timeout(self.idle_timeout, self.inner.next()).await {
                Ok(Some(Ok(bytes))) => {
                    self.buffer.extend_from_slice(&bytes);
                    continue;
                }
                Ok(None) => {
                    self.finished = true;
                    continue;
                }
                Ok(Some(Err(e))) => ChunkError::from_reqwest(e),
                Err(_) => ChunkError::Timeout(format!("no data for {:?}", self.idle_timeout)),
            };

            self.finished = true;
            self.buffer.clear();
            return Some(Err(error));
        }
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let line = String::from_utf8_lossy(bytes);
    line.strip_suffix('\r').unwrap_or(&line).to_string()
}
