//! Token encoding using tiktoken

use crate::error::{QaError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tiktoken_rs::{cl100k_base, p50k_base, r50k_base, CoreBPE};

/// Named BPE encoding used for every encode/decode/count call in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TokenEncoding {
    #[default]
    #[serde(rename = "cl100k_base")]
    Cl100kBase,
    #[serde(rename = "p50k_base")]
    P50kBase,
    #[serde(rename = "r50k_base")]
    R50kBase,
}

impl TokenEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenEncoding::Cl100kBase => "cl100k_base",
            TokenEncoding::P50kBase => "p50k_base",
            TokenEncoding::R50kBase => "r50k_base",
        }
    }
}

impl fmt::Display for TokenEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered token ids produced from a single text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSequence(Vec<usize>);

impl TokenSequence {
    pub fn new(ids: Vec<usize>) -> Self {
        Self(ids)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<usize> {
        self.0
    }
}

impl From<Vec<usize>> for TokenSequence {
    fn from(ids: Vec<usize>) -> Self {
        Self(ids)
    }
}

/// Converts text to and from token ids under one fixed encoding
pub trait Tokenizer: Send + Sync {
    /// Encoding scheme this tokenizer is bound to
    fn encoding(&self) -> TokenEncoding;

    /// Encode text into token ids
    fn encode(&self, text: &str) -> TokenSequence;

    /// Decode token ids back into text
    ///
    /// Fails when the ids end inside a multi-byte character.
    fn decode(&self, tokens: &[usize]) -> Result<String>;

    /// Decode token ids, replacing incomplete characters with U+FFFD
    fn decode_lossy(&self, tokens: &[usize]) -> String {
        self.decode(tokens)
            .unwrap_or_else(|_| char::REPLACEMENT_CHARACTER.to_string().repeat(tokens.len()))
    }

    /// Number of tokens in `text`
    fn count(&self, text: &str) -> usize {
        self.encode(text).len()
    }
}

/// Tiktoken-backed tokenizer
pub struct TiktokenTokenizer {
    encoding: TokenEncoding,
    bpe: Arc<CoreBPE>,
}

impl TiktokenTokenizer {
    /// Load the BPE ranks for `encoding`
    pub fn new(encoding: TokenEncoding) -> Result<Self> {
        let bpe = match encoding {
            TokenEncoding::Cl100kBase => cl100k_base(),
            TokenEncoding::P50kBase => p50k_base(),
            TokenEncoding::R50kBase => r50k_base(),
        }
        .map_err(|e| QaError::Tokenizer(format!("failed to load {}: {}", encoding, e)))?;

        Ok(Self {
            encoding,
            bpe: Arc::new(bpe),
        })
    }
}

impl fmt::Debug for TiktokenTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TiktokenTokenizer")
            .field("encoding", &self.encoding)
            .finish()
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn encoding(&self) -> TokenEncoding {
        self.encoding
    }

    fn encode(&self, text: &str) -> TokenSequence {
        TokenSequence(self.bpe.encode_with_special_tokens(text))
    }

    fn decode(&self, tokens: &[usize]) -> Result<String> {
        self.bpe
            .decode(tokens.to_vec())
            .map_err(|e| QaError::Tokenizer(e.to_string()))
    }

    fn decode_lossy(&self, tokens: &[usize]) -> String {
        String::from_utf8_lossy(&self.bpe._decode_native(tokens)).into_owned()
    }
}
