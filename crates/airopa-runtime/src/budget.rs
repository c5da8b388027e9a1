//! Run-scoped token budget.
//!
//! The budget only counts. Deciding whether to skip an LLM call when it is
//! exhausted is the orchestrator's job.

use std::sync::atomic::{AtomicU64, Ordering};

/// Token ceiling for one pipeline run. A max of 0 means unlimited.
#[derive(Debug, Default)]
pub struct TokenBudget {
    max_tokens: u64,
    used: AtomicU64,
}

impl TokenBudget {
    pub fn new(max_tokens: u64) -> Self {
        Self {
            max_tokens,
            used: AtomicU64::new(0),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(0)
    }

    /// Add one call's usage.
    pub fn record(&self, tokens_in: u32, tokens_out: u32) {
        self.used
            .fetch_add(u64::from(tokens_in) + u64::from(tokens_out), Ordering::SeqCst);
    }

    /// True once usage has reached the ceiling. Never true when unlimited.
    pub fn exceeded(&self) -> bool {
        self.max_tokens > 0 && self.used() >= self.max_tokens
    }

    /// Tokens left, floored at 0, or -1 when unlimited.
    pub fn remaining(&self) -> i64 {
        if self.max_tokens == 0 {
            return -1;
        }
        let left = self.max_tokens.saturating_sub(self.used());
        i64::try_from(left).unwrap_or(i64::MAX)
    }

    pub fn used(&self) -> u64 {
        self.used.load(Ordering::SeqCst)
    }

    pub fn max_tokens(&self) -> u64 {
        self.max_tokens
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_tokens == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_budget_enforcement() {
        let budget = TokenBudget::new(100);
        assert!(!budget.exceeded());
        assert_eq!(budget.remaining(), 100);

        budget.record(40, 20);
        assert_eq!(budget.used(), 60);
        assert_eq!(budget.remaining(), 40);
        assert!(!budget.exceeded());

        budget.record(30, 10);
        assert!(budget.exceeded());
        assert_eq!(budget.remaining(), 0);

        budget.record(50, 0);
        assert_eq!(budget.remaining(), 0);
        assert_eq!(budget.used(), 150);
    }

    #[test]
    fn test_unlimited() {
        let budget = TokenBudget::unlimited();
        budget.record(u32::MAX, u32::MAX);
        assert!(!budget.exceeded());
        assert_eq!(budget.remaining(), -1);
        assert!(budget.is_unlimited());
        assert_eq!(budget.max_tokens(), 0);
    }

    proptest! {
        #[test]
        fn exceeded_matches_usage(max in 1u64..10_000, calls in prop::collection::vec((0u32..500, 0u32..500), 0..20)) {
            let budget = TokenBudget::new(max);
            let mut total = 0u64;
            for (tin, tout) in calls {
                budget.record(tin, tout);
                total += u64::from(tin) + u64::from(tout);
            }
            prop_assert_eq!(budget.used(), total);
            prop_assert_eq!(budget.exceeded(), total >= max);
            prop_assert!(budget.remaining() >= 0);
        }
    }
}
