//! Data models for prompt assembly and chunk planning

use serde::{Deserialize, Serialize};

/// Text placed around the document and the question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptFrame {
    pub preamble: String,
    pub separator: String,
}

impl Default for PromptFrame {
    fn default() -> Self {
        Self {
            preamble: "Here's a document: ".to_string(),
            separator: " \n\n---\n\n ".to_string(),
        }
    }
}

impl PromptFrame {
    pub fn new(preamble: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            preamble: preamble.into(),
            separator: separator.into(),
        }
    }

    /// Combine a document and a question under this frame
    pub fn combine(&self, document: &str, question: &str) -> CombinedInput {
        CombinedInput::new(self.clone(), document.to_string(), question.to_string())
    }

    /// Render the frame around an arbitrary document slice
    ///
    /// An empty slice renders to the bare question.
    pub fn render(&self, document: &str, question: &str) -> String {
        if document.is_empty() {
            return question.to_string();
        }
        let mut text = String::with_capacity(
            self.preamble.len() + document.len() + self.separator.len() + question.len(),
        );
        text.push_str(&self.preamble);
        text.push_str(document);
        text.push_str(&self.separator);
        text.push_str(question);
        text
    }
}

/// Preamble, document, separator and question, fixed once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedInput {
    frame: PromptFrame,
    document: String,
    question: String,
    text: String,
}

impl CombinedInput {
    fn new(frame: PromptFrame, document: String, question: String) -> Self {
        let text = frame.render(&document, &question);
        Self {
            frame,
            document,
            question,
            text,
        }
    }

    /// Full combined text
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn frame(&self) -> &PromptFrame {
        &self.frame
    }
}

/// One token-bounded slice of input, sent as its own request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Zero-based position in the plan
    pub index: usize,
    /// Number of chunks in the plan
    pub total: usize,
    pub text: String,
    pub token_count: usize,
}

impl Chunk {
    pub fn new(index: usize, total: usize, text: impl Into<String>, token_count: usize) -> Self {
        Self {
            index,
            total,
            text: text.into(),
            token_count,
        }
    }

    /// One-based label, e.g. "2/3"
    pub fn label(&self) -> String {
        format!("{}/{}", self.index + 1, self.total)
    }
}

/// Record of a character-level truncation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truncation {
    pub original_tokens: usize,
    pub kept_chars: usize,
    pub kept_tokens: usize,
}

/// Ordered chunks produced for one submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPlan {
    pub chunks: Vec<Chunk>,
    /// Tokens in the planned input before partitioning
    pub total_tokens: usize,
    pub budget: usize,
    pub truncation: Option<Truncation>,
}

impl ChunkPlan {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn is_truncated(&self) -> bool {
        self.truncation.is_some()
    }
}
