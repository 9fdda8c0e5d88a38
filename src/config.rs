//! Application configuration
//!
//! Sources, later ones overriding earlier ones:
//! - built-in defaults
//! - optional TOML file (`docqa.toml` unless a path is given)
//! - environment variables prefixed `DOCQA_`, nested with `__`
//!   (e.g. `DOCQA_COMPLETION__MAX_TOKENS=1024`)

use crate::context::{BudgetMode, ChunkPolicy, PromptFrame, QuestionPlacement, TokenBudget, TokenEncoding};
use crate::error::{QaError, Result};
use crate::llm::CompletionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub planner: PlannerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Chunk planning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub policy: ChunkPolicy,

    #[serde(default)]
    pub budget_mode: BudgetMode,

    /// Input budget used when `budget_mode = "fixed"`
    #[serde(default)]
    pub fixed_budget: Option<usize>,

    #[serde(default)]
    pub question_placement: QuestionPlacement,

    #[serde(default = "default_preamble")]
    pub preamble: String,

    #[serde(default = "default_separator")]
    pub separator: String,

    #[serde(default)]
    pub encoding: TokenEncoding,
}

fn default_preamble() -> String {
    PromptFrame::default().preamble
}

fn default_separator() -> String {
    PromptFrame::default().separator
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            policy: ChunkPolicy::default(),
            budget_mode: BudgetMode::default(),
            fixed_budget: None,
            question_placement: QuestionPlacement::default(),
            preamble: default_preamble(),
            separator: default_separator(),
            encoding: TokenEncoding::default(),
        }
    }
}

impl PlannerConfig {
    pub fn frame(&self) -> PromptFrame {
        PromptFrame::new(self.preamble.clone(), self.separator.clone())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive for this crate
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from an optional file, `.env` and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let file = match path {
            Some(path) => ::config::File::from(path).required(true),
            None => ::config::File::with_name("docqa").required(false),
        };

        let config: Config = ::config::Config::builder()
            .add_source(file)
            .add_source(
                ::config::Environment::with_prefix("DOCQA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Config = ::config::Config::builder()
            .add_source(::config::File::from_str(toml, ::config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check parameters and the derived budget
    pub fn validate(&self) -> Result<()> {
        self.completion.validate()?;
        self.budget()?;
        Ok(())
    }

    /// Input token budget derived from the completion and planner settings
    pub fn budget(&self) -> Result<TokenBudget> {
        TokenBudget::for_mode(
            self.planner.budget_mode,
            self.completion.context_window,
            self.completion.max_tokens,
            self.planner.fixed_budget,
        )
        .map_err(QaError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.planner.policy, ChunkPolicy::Split);
        assert_eq!(config.planner.question_placement, QuestionPlacement::Combined);
        assert_eq!(config.planner.encoding, TokenEncoding::Cl100kBase);
        assert_eq!(config.budget().unwrap().input_tokens(), 131_072 - 2512);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_toml() {
        let config = Config::from_toml_str(
            r#"
            [completion]
            model = "test-model"
            context_window = 8192
            max_tokens = 1024

            [planner]
            policy = "truncate"
            budget_mode = "fixed"
            fixed_budget = 4000
            question_placement = "every_chunk"
            encoding = "p50k_base"

            [logging]
            json = true
            "#,
        )
        .unwrap();

        assert_eq!(config.completion.model, "test-model");
        assert_eq!(config.completion.top_k, 50);
        assert_eq!(config.planner.policy, ChunkPolicy::Truncate);
        assert_eq!(config.planner.question_placement, QuestionPlacement::EveryChunk);
        assert_eq!(config.planner.encoding, TokenEncoding::P50kBase);
        assert_eq!(config.budget().unwrap().input_tokens(), 4000);
        assert!(config.logging.json);
    }

    #[test]
    fn test_non_positive_budget_rejected() {
        let err = Config::from_toml_str(
            r#"
            [completion]
            context_window = 2048
            max_tokens = 2048
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, QaError::Configuration(_)));
    }

    #[test]
    fn test_fixed_budget_over_window_rejected() {
        let err = Config::from_toml_str(
            r#"
            [completion]
            context_window = 8192
            max_tokens = 2048

            [planner]
            budget_mode = "fixed"
            fixed_budget = 7000
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, QaError::Configuration(_)));
    }
}
