//! Token budgeting and chunk planning
//!
//! Fits a document and a question into the model's input budget, splitting
//! the combined text into ordered chunks when it does not fit.

pub mod chunk_planner;
pub mod models;
pub mod token_budget;
pub mod tokenizer;

pub use chunk_planner::{ChunkPlanner, ChunkPolicy, QuestionPlacement};
pub use models::{Chunk, ChunkPlan, CombinedInput, PromptFrame, Truncation};
pub use token_budget::{BudgetError, BudgetMode, TokenBudget};
pub use tokenizer::{TiktokenTokenizer, TokenEncoding, TokenSequence, Tokenizer};
