//! Request and stream event types for the chat-completion API

use super::config::CompletionConfig;
use serde::{Deserialize, Serialize};

/// Message author role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Streaming chat-completion request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub repetition_penalty: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    pub stream: bool,
}

impl CompletionRequest {
    /// Single user message carrying one chunk's text
    pub fn for_chunk(config: &CompletionConfig, content: &str) -> Self {
        Self {
            model: config.model.clone(),
            messages: vec![ChatMessage::user(content)],
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            repetition_penalty: config.repetition_penalty,
            stop: if config.stop.is_empty() {
                None
            } else {
                Some(config.stop.clone())
            },
            stream: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
    /// Completion-style streams put generated text here
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Classification of one response line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamLine {
    /// Generated content to forward
    Content(String),
    /// End-of-stream marker
    Done,
    /// Valid event without content (role header, finish reason)
    Empty,
    /// Error object sent inside the stream
    Error(String),
    /// Not valid structured data
    Malformed,
}

/// Parse one newline-delimited response line
///
/// Lines may carry a server-sent-events `data:` prefix.
pub fn parse_stream_line(line: &str) -> StreamLine {
    let line = line.trim();
    let payload = line
        .strip_prefix("data:")
        .map(str::trim_start)
        .unwrap_or(line);

    if payload.is_empty() {
        return StreamLine::Empty;
    }
    if payload == "[DONE]" {
        return StreamLine::Done;
    }

    let event: StreamEvent = match serde_json::from_str(payload) {
        Ok(event) => event,
        Err(_) => return StreamLine::Malformed,
    };

    if let Some(error) = event.error {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return StreamLine::Error(message);
    }

    let content = event.choices.into_iter().next().and_then(|choice| {
        choice
            .delta
            .and_then(|d| d.content)
            .or(choice.text)
    });

    match content {
        Some(text) if !text.is_empty() => StreamLine::Content(text),
        _ => StreamLine::Empty,
    }
}
