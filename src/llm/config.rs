//! Configuration for the chat-completion endpoint

use crate::error::{QaError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Completion endpoint and decoding parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Chat-completion URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Model context window in tokens
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Output tokens requested, also reserved out of the context window
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_repetition_penalty")]
    pub repetition_penalty: f32,

    /// Stop sequences, omitted from the request when empty
    #[serde(default = "default_stop")]
    pub stop: Vec<String>,

    /// TCP connect timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Time allowed until the response headers arrive, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Longest gap between two reads of a streamed body, in milliseconds
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_endpoint() -> String { "https://api.together.xyz/v1/chat/completions".to_string() }
fn default_model() -> String { "meta-llama/Meta-Llama-3.1-405B-Instruct-Turbo".to_string() }
fn default_context_window() -> usize { 131_072 }
fn default_max_tokens() -> usize { 2512 }
fn default_temperature() -> f32 { 0.7 }
fn default_top_p() -> f32 { 0.7 }
fn default_top_k() -> u32 { 50 }
fn default_repetition_penalty() -> f32 { 1.0 }
fn default_stop() -> Vec<String> { vec!["\"\"".to_string()] }
fn default_connect_timeout_ms() -> u64 { 10_000 }
fn default_timeout_ms() -> u64 { 120_000 }
fn default_idle_timeout_ms() -> u64 { 60_000 }
fn default_api_key_env() -> String { "TOGETHER_API_KEY".to_string() }

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            context_window: default_context_window(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            repetition_penalty: default_repetition_penalty(),
            stop: default_stop(),
            connect_timeout_ms: default_connect_timeout_ms(),
            timeout_ms: default_timeout_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl CompletionConfig {
    /// Check decoding parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(QaError::Configuration("model must not be empty".to_string()));
        }
        if self.max_tokens == 0 {
            return Err(QaError::Configuration("max_tokens must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(QaError::Configuration(format!(
                "temperature {} outside [0, 1]",
                self.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(QaError::Configuration(format!(
                "top_p {} outside [0, 1]",
                self.top_p
            )));
        }
        if self.connect_timeout_ms == 0 || self.timeout_ms == 0 || self.idle_timeout_ms == 0 {
            return Err(QaError::Configuration("timeouts must be positive".to_string()));
        }
        if self.repetition_penalty <= 0.0 {
            return Err(QaError::Configuration(format!(
                "repetition_penalty {} must be positive",
                self.repetition_penalty
            )));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Time allowed until the response headers arrive
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Longest silence tolerated while a body is streaming
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}
