//! Input token budget for a single completion request
//!
//! The budget is what remains of the model context window once the output
//! allowance (`max_tokens`) has been reserved:
//! - Reserved mode: `context_window - max_tokens`
//! - Fixed mode: a configured input size, still checked against the window
//!
//! The reservation always happens before any splitting.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the input budget is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetMode {
    /// Whole context window minus reserved output tokens
    #[default]
    Reserved,
    /// Configured input size
    Fixed,
}

/// Token budget errors
#[derive(Debug, Error)]
pub enum BudgetError {
    #[error("Budget is not positive: context window {context_window}, reserved output {reserved}")]
    NonPositive { context_window: usize, reserved: usize },

    #[error("Fixed budget of {fixed} tokens plus {reserved} output tokens exceeds context window {context_window}")]
    ExceedsWindow {
        fixed: usize,
        reserved: usize,
        context_window: usize,
    },

    #[error("Budget exceeded: {used} tokens used, {max} tokens allowed")]
    BudgetExceeded { used: usize, max: usize },

    #[error("Insufficient budget: need {needed} tokens, have {available} tokens")]
    InsufficientBudget { needed: usize, available: usize },
}

/// Input token budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBudget {
    context_window: usize,
    reserved_output: usize,
    input_tokens: usize,
}

impl TokenBudget {
    /// Budget = `context_window - max_tokens`
    pub fn reserved(context_window: usize, max_tokens: usize) -> Result<Self, BudgetError> {
        if max_tokens >= context_window {
            return Err(BudgetError::NonPositive {
                context_window,
                reserved: max_tokens,
            });
        }

        Ok(Self {
            context_window,
            reserved_output: max_tokens,
            input_tokens: context_window - max_tokens,
        })
    }

    /// Fixed input budget that must still leave room for `max_tokens`
    pub fn fixed(
        input_tokens: usize,
        context_window: usize,
        max_tokens: usize,
    ) -> Result<Self, BudgetError> {
        if input_tokens == 0 {
            return Err(BudgetError::NonPositive {
                context_window,
                reserved: max_tokens,
            });
        }

        if input_tokens.saturating_add(max_tokens) > context_window {
            return Err(BudgetError::ExceedsWindow {
                fixed: input_tokens,
                reserved: max_tokens,
                context_window,
            });
        }

        Ok(Self {
            context_window,
            reserved_output: max_tokens,
            input_tokens,
        })
    }

    /// Build a budget from a mode and its parameters
    pub fn for_mode(
        mode: BudgetMode,
        context_window: usize,
        max_tokens: usize,
        fixed_budget: Option<usize>,
    ) -> Result<Self, BudgetError> {
        match mode {
            BudgetMode::Reserved => Self::reserved(context_window, max_tokens),
            BudgetMode::Fixed => Self::fixed(fixed_budget.unwrap_or(0), context_window, max_tokens),
        }
    }

    /// Maximum tokens allowed in a request's input content
    pub fn input_tokens(&self) -> usize {
        self.input_tokens
    }

    pub fn reserved_output(&self) -> usize {
        self.reserved_output
    }

    pub fn context_window(&self) -> usize {
        self.context_window
    }

    /// Check that a token count fits the input budget
    pub fn check(&self, tokens: usize) -> Result<(), BudgetError> {
        if tokens > self.input_tokens {
            return Err(BudgetError::BudgetExceeded {
                used: tokens,
                max: self.input_tokens,
            });
        }
        Ok(())
    }

    /// Budget left after a fixed per-chunk overhead is taken out
    pub fn after_overhead(&self, overhead: usize) -> Result<usize, BudgetError> {
        if overhead >= self.input_tokens {
            return Err(BudgetError::InsufficientBudget {
                needed: overhead + 1,
                available: self.input_tokens,
            });
        }
        Ok(self.input_tokens - overhead)
    }

    /// Number of partitions needed for `total_tokens`
    pub fn partition_count(&self, total_tokens: usize) -> usize {
        total_tokens.div_ceil(self.input_tokens).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_budget_subtracts_output() {
        let budget = TokenBudget::reserved(131_072, 2512).unwrap();
        assert_eq!(budget.input_tokens(), 128_560);
        assert_eq!(budget.reserved_output(), 2512);
        assert_eq!(budget.context_window(), 131_072);
    }

    #[test]
    fn test_non_positive_budget() {
        assert!(matches!(
            TokenBudget::reserved(2512, 2512),
            Err(BudgetError::NonPositive { .. })
        ));
        assert!(matches!(
            TokenBudget::reserved(1000, 4000),
            Err(BudgetError::NonPositive { .. })
        ));
        assert!(matches!(
            TokenBudget::fixed(0, 8000, 1000),
            Err(BudgetError::NonPositive { .. })
        ));
    }

    #[test]
    fn test_fixed_budget_must_leave_output_room() {
        assert!(TokenBudget::fixed(7000, 8000, 1000).is_ok());
        assert!(matches!(
            TokenBudget::fixed(7001, 8000, 1000),
            Err(BudgetError::ExceedsWindow { .. })
        ));
    }

    #[test]
    fn test_for_mode() {
        let reserved = TokenBudget::for_mode(BudgetMode::Reserved, 100, 20, Some(5)).unwrap();
        assert_eq!(reserved.input_tokens(), 80);

        let fixed = TokenBudget::for_mode(BudgetMode::Fixed, 100, 20, Some(10)).unwrap();
        assert_eq!(fixed.input_tokens(), 10);

        assert!(TokenBudget::for_mode(BudgetMode::Fixed, 100, 20, None).is_err());
    }

    #[test]
    fn test_check_budget() {
        let budget = TokenBudget::fixed(10, 100, 20).unwrap();
        assert!(budget.check(10).is_ok());
        assert!(matches!(
            budget.check(11),
            Err(BudgetError::BudgetExceeded { used: 11, max: 10 })
        ));
    }

    #[test]
    fn test_partition_count() {
        let budget = TokenBudget::fixed(10, 100, 20).unwrap();
        assert_eq!(budget.partition_count(0), 1);
        assert_eq!(budget.partition_count(10), 1);
        assert_eq!(budget.partition_count(11), 2);
        assert_eq!(budget.partition_count(25), 3);
    }

    #[test]
    fn test_after_overhead() {
        let budget = TokenBudget::fixed(10, 100, 20).unwrap();
        assert_eq!(budget.after_overhead(4).unwrap(), 6);
        assert!(matches!(
            budget.after_overhead(10),
            Err(BudgetError::InsufficientBudget { .. })
        ));
    }
}
