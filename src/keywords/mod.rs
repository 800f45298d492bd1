// Keyword extraction: segmentation, ranking strategies and their selection.

pub mod embedrank;
pub mod segment;
pub mod strategy;
pub mod textrank;
pub mod tfidf;
pub mod traits;

pub use strategy::{ExtractedKeywords, KeywordSources, KeywordStrategy, ModelAssets};
pub use traits::{KeywordRanker, RankedKeyword};
