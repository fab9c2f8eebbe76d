use crate::kinds::ContentKind;
use std::fmt;
use tiktoken_rs::CoreBPE;

/// Estimates prompt cost with the cl100k BPE vocabulary.
///
/// Counts are for logging and budget visibility only; nothing is truncated
/// based on them.
pub struct TokenCounter {
    bpe: Option<CoreBPE>,
}

impl TokenCounter {
    /// Load the tokenizer. A load failure is logged and leaves the counter
    /// returning 0 for every input.
    pub fn new() -> Self {
        match tiktoken_rs::cl100k_base() {
            Ok(bpe) => Self { bpe: Some(bpe) },
            Err(e) => {
                tracing::error!("Failed to initialize tokenizer: {}", e);
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self { bpe: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.bpe.is_some()
    }

    pub fn count(&self, text: &str) -> usize {
        match &self.bpe {
            Some(bpe) if !text.is_empty() => bpe.encode_with_special_tokens(text).len(),
            _ => 0,
        }
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCounter")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Token cost before and after reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReductionStats {
    pub original: usize,
    pub reduced: usize,
}

impl ReductionStats {
    /// Tokens saved; negative when reduction grew the payload.
    pub fn saved(&self) -> i64 {
        self.original as i64 - self.reduced as i64
    }

    pub fn percent_saved(&self) -> f64 {
        if self.original == 0 {
            return 0.0;
        }
        self.saved() as f64 / self.original as f64 * 100.0
    }

    /// Activity log line, e.g. `Event tokens - Original: 900, Reduced: 300, Saved: 600 (66.7%)`.
    pub fn describe(&self, kind: ContentKind) -> String {
        format!(
            "{} tokens - Original: {}, Reduced: {}, Saved: {} ({:.1}%)",
            kind.label(),
            self.original,
            self.reduced,
            self.saved(),
            self.percent_saved()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_zero() {
        assert_eq!(TokenCounter::new().count(""), 0);
    }

    #[test]
    fn test_disabled_counter_is_zero() {
        assert_eq!(TokenCounter::disabled().count("Välkommen till Falkenberg"), 0);
    }

    #[test]
    fn test_count_is_deterministic_and_monotone() {
        let counter = TokenCounter::new();
        let short = counter.count("Midsommarfirande i Doktorsparken");
        assert!(short > 0);
        assert_eq!(short, counter.count("Midsommarfirande i Doktorsparken"));
        let long = counter.count(&"Midsommarfirande i Doktorsparken. ".repeat(10));
        assert!(long > short);
    }

    #[test]
    fn test_stats_description() {
        let stats = ReductionStats { original: 900, reduced: 300 };
        assert_eq!(stats.saved(), 600);
        assert_eq!(
            stats.describe(ContentKind::Events),
            "Event tokens - Original: 900, Reduced: 300, Saved: 600 (66.7%)"
        );
    }

    #[test]
    fn test_stats_with_zero_original() {
        let stats = ReductionStats { original: 0, reduced: 0 };
        assert_eq!(stats.percent_saved(), 0.0);
        assert!(stats.describe(ContentKind::Pages).starts_with("Page tokens"));
    }
}
