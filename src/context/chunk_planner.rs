//! Chunk planning under a token budget
//!
//! Turns a combined document+question input into one or more chunks whose
//! token count never exceeds the input budget:
//! - Split policy: encode once, cut into contiguous runs of at most `budget`
//!   tokens, decode each run on its own
//! - Truncate policy: keep the first `budget` characters and report it
//!
//! Runs are shortened (never reordered or overlapped) when a cut would land
//! inside a multi-byte character or when the decoded slice re-encodes to more
//! tokens than allowed. Multi-byte text can therefore need more chunks than
//! `ceil(total / budget)`. A character that alone spans more tokens than the
//! budget is cut anyway and decoded lossily.

use super::models::{Chunk, ChunkPlan, CombinedInput, Truncation};
use super::token_budget::{BudgetError, TokenBudget};
use super::tokenizer::Tokenizer;
use crate::error::Result;
use crate::metrics::METRICS;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What to do when the input exceeds the budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkPolicy {
    #[default]
    Split,
    /// Keep the first `budget` characters only
    Truncate,
}

/// Where the question goes when the input is split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionPlacement {
    /// Question appended once to the combined text before splitting, so it
    /// only appears in the final chunk
    #[default]
    Combined,
    /// Every chunk carries the frame and the question around its document slice
    EveryChunk,
}

/// Plans chunks for a combined input
pub struct ChunkPlanner {
    tokenizer: Arc<dyn Tokenizer>,
    policy: ChunkPolicy,
    placement: QuestionPlacement,
}

impl ChunkPlanner {
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        policy: ChunkPolicy,
        placement: QuestionPlacement,
    ) -> Self {
        Self {
            tokenizer,
            policy,
            placement,
        }
    }

    pub fn policy(&self) -> ChunkPolicy {
        self.policy
    }

    pub fn placement(&self) -> QuestionPlacement {
        self.placement
    }

    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    /// Plan the chunks for `input` under `budget`
    pub fn plan(&self, input: &CombinedInput, budget: &TokenBudget) -> Result<ChunkPlan> {
        let plan = match (self.policy, self.placement) {
            (ChunkPolicy::Truncate, _) => self.plan_truncated(input, budget)?,
            (ChunkPolicy::Split, QuestionPlacement::Combined) => self.plan_combined(input, budget)?,
            (ChunkPolicy::Split, QuestionPlacement::EveryChunk) => {
                self.plan_every_chunk(input, budget)?
            }
        };

        METRICS.chunks_planned.observe(plan.len() as f64);
        info!(
            "Planned {} chunk(s) from {} tokens with budget {} ({:?}, {:?})",
            plan.len(),
            plan.total_tokens,
            plan.budget,
            self.policy,
            self.placement
        );

        Ok(plan)
    }

    fn plan_combined(&self, input: &CombinedInput, budget: &TokenBudget) -> Result<ChunkPlan> {
        let limit = budget.input_tokens();
        let tokens = self.tokenizer.encode(input.text());

        let runs = self.split_tokens(tokens.as_slice(), limit, budget, |slice| slice.to_string())?;

        let even = budget.partition_count(tokens.len());
        if runs.len() > even {
            debug!(
                "Character boundaries added {} chunk(s) over the even split of {}",
                runs.len() - even,
                even
            );
        }
        if runs.len() > 1 && !input.document().is_empty() {
            info!(
                "Input split into {} chunks; the question is only present in the last one",
                runs.len()
            );
        }

        Ok(into_plan(runs, tokens.len(), limit, None))
    }

    fn plan_every_chunk(&self, input: &CombinedInput, budget: &TokenBudget) -> Result<ChunkPlan> {
        let limit = budget.input_tokens();
        let frame = input.frame();

        let overhead = self.tokenizer.count(&frame.preamble)
            + self.tokenizer.count(&frame.separator)
            + self.tokenizer.count(input.question());
        let slice_budget = budget.after_overhead(overhead)?;

        let doc_tokens = self.tokenizer.encode(input.document());
        debug!(
            "Question frame costs {} tokens; {} tokens left per document slice",
            overhead, slice_budget
        );

        let runs = self.split_tokens(doc_tokens.as_slice(), slice_budget, budget, |slice| {
            frame.render(slice, input.question())
        })?;

        Ok(into_plan(runs, doc_tokens.len() + overhead, limit, None))
    }

    fn plan_truncated(&self, input: &CombinedInput, budget: &TokenBudget) -> Result<ChunkPlan> {
        let limit = budget.input_tokens();
        let tokens = self.tokenizer.encode(input.text());

        if tokens.len() <= limit {
            return Ok(into_plan(
                vec![(input.text().to_string(), tokens.len())],
                tokens.len(),
                limit,
                None,
            ));
        }

        let mut kept: String = input.text().chars().take(limit).collect();
        let mut kept_tokens = self.tokenizer.count(&kept);

        if kept_tokens > limit {
            // more tokens than characters; fall back to the token prefix
            let kept_ids = self.tokenizer.encode(&kept);
            let mut runs = self.split_tokens(kept_ids.as_slice(), limit, budget, |s| s.to_string())?;
            let (text, count) = runs.remove(0);
            kept = text;
            kept_tokens = count;
        }

        let truncation = Truncation {
            original_tokens: tokens.len(),
            kept_chars: kept.chars().count(),
            kept_tokens,
        };

        METRICS.truncations.inc();
        warn!(
            "Input truncated from {} tokens to {} characters ({} tokens)",
            truncation.original_tokens, truncation.kept_chars, truncation.kept_tokens
        );

        Ok(into_plan(
            vec![(kept, kept_tokens)],
            tokens.len(),
            limit,
            Some(truncation),
        ))
    }

    /// Cut `tokens` into ordered runs of at most `slice_budget` ids, rendering
    /// each decoded run and checking the rendered text against `budget`
    fn split_tokens<F>(
        &self,
        tokens: &[usize],
        slice_budget: usize,
        budget: &TokenBudget,
        render: F,
    ) -> Result<Vec<(String, usize)>>
    where
        F: Fn(&str) -> String,
    {
        if slice_budget == 0 {
            return Err(BudgetError::InsufficientBudget {
                needed: 1,
                available: 0,
            }
            .into());
        }

        if tokens.is_empty() {
            let text = render("");
            let count = self.tokenizer.count(&text);
            budget.check(count)?;
            return Ok(vec![(text, count)]);
        }

        let mut runs = Vec::with_capacity(tokens.len().div_ceil(slice_budget));
        let mut lossy = 0;
        let mut start = 0;

        while start < tokens.len() {
            let mut end = (start + slice_budget).min(tokens.len());

            let run = loop {
                match self.tokenizer.decode(&tokens[start..end]) {
                    Ok(slice) => {
                        let text = render(&slice);
                        let count = self.tokenizer.count(&text);
                        match budget.check(count) {
                            Ok(()) => break (text, count),
                            Err(e) if end - start == 1 => return Err(e.into()),
                            Err(_) => debug!(
                                "Run {}..{} re-encodes to {} tokens, over {}",
                                start,
                                end,
                                count,
                                budget.input_tokens()
                            ),
                        }
                    }
                    Err(_) if end - start == 1 => {
                        // one character spans more tokens than the budget
                        let text = render(&self.tokenizer.decode_lossy(&tokens[start..end]));
                        let count = self.tokenizer.count(&text);
                        budget.check(count)?;
                        lossy += 1;
                        break (text, count);
                    }
                    Err(_) => {
                        debug!("Run {}..{} ends inside a character", start, end);
                    }
                }
                end -= 1;
            };

            runs.push(run);
            start = end;
        }

        if lossy > 0 {
            warn!(
                "{} chunk(s) cut inside a character wider than the budget; replacement characters substituted",
                lossy
            );
        }

        Ok(runs)
    }
}

fn into_plan(
    runs: Vec<(String, usize)>,
    total_tokens: usize,
    budget: usize,
    truncation: Option<Truncation>,
) -> ChunkPlan {
    let total = runs.len();
    let chunks = runs
        .into_iter()
        .enumerate()
        .map(|(index, (text, token_count))| Chunk::new(index, total, text, token_count))
        .collect();

    ChunkPlan {
        chunks,
        total_tokens,
        budget,
        truncation,
    }
}
