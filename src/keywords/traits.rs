// Keyword ranker trait: swap-ready abstraction.
//
// Every extraction strategy (plain TextRank, assisted TextRank, EmbedRank,
// TF-IDF) sits behind this trait, so the pipeline holds one ranker for titles
// and one for descriptions and never branches on the strategy itself.

use anyhow::Result;

/// A keyword and its strategy-specific score (higher is more relevant).
#[derive(Debug, Clone, PartialEq)]
pub struct RankedKeyword {
    pub word: String,
    pub weight: f64,
}

/// Trait for ranking the keywords of a piece of text.
pub trait KeywordRanker {
    /// Up to `top_k` keywords, best first.
    fn rank(&self, text: &str, top_k: usize) -> Result<Vec<RankedKeyword>>;

    /// Like `rank`, without the weights.
    fn keywords(&self, text: &str, top_k: usize) -> Result<Vec<String>> {
        Ok(self
            .rank(text, top_k)?
            .into_iter()
            .map(|k| k.word)
            .collect())
    }
}

/// Stable descending sort by weight, then truncate. Equal weights keep their
/// incoming order.
pub fn top_ranked(mut ranked: Vec<RankedKeyword>, top_k: usize) -> Vec<RankedKeyword> {
    ranked.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    ranked.truncate(top_k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(word: &str, weight: f64) -> RankedKeyword {
        RankedKeyword {
            word: word.to_string(),
            weight,
        }
    }

    #[test]
    fn test_top_ranked_is_stable() {
        let ranked = top_ranked(
            vec![kw("a", 0.5), kw("b", 0.9), kw("c", 0.5), kw("d", 0.1)],
            3,
        );
        let words: Vec<&str> = ranked.iter().map(|k| k.word.as_str()).collect();
        assert_eq!(words, vec!["b", "a", "c"]);
    }
}
