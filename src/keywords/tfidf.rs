// TF-IDF keyword ranking against the item corpus.
//
// Candidates come from jieba's tag extraction (its own bundled IDF). Each
// distinct candidate is then re-scored with the corpus IDF:
//
//   score = (occurrences in the candidate list) * corpus_idf(word)
//
// so words that are common across the catalogue sink even if they are rare
// in general Chinese text. Words outside the corpus vocabulary are dropped.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use jieba_rs::{KeywordExtract, TfIdf};

use super::segment::Segmenter;
use super::traits::{top_ranked, KeywordRanker, RankedKeyword};
use crate::vsm::IdfModel;

/// How many tags jieba proposes before corpus re-scoring.
pub const CANDIDATE_TAGS: usize = 20;

/// jieba's TF-IDF tag extraction, every part of speech allowed. Used for
/// titles and as the candidate source of `TfIdfRanker`.
pub struct TagExtractor {
    segmenter: Arc<Segmenter>,
    extractor: TfIdf,
}

impl TagExtractor {
    pub fn new(segmenter: Arc<Segmenter>) -> Self {
        Self {
            segmenter,
            extractor: TfIdf::default(),
        }
    }
}

impl KeywordRanker for TagExtractor {
    fn rank(&self, text: &str, top_k: usize) -> Result<Vec<RankedKeyword>> {
        Ok(self
            .extractor
            .extract_keywords(self.segmenter.jieba(), text, top_k, Vec::new())
            .into_iter()
            .map(|k| RankedKeyword {
                word: k.keyword,
                weight: k.weight,
            })
            .collect())
    }
}

pub struct TfIdfRanker {
    tags: TagExtractor,
    model: IdfModel,
}

impl TfIdfRanker {
    pub fn new(segmenter: Arc<Segmenter>, model: IdfModel) -> Self {
        Self {
            tags: TagExtractor::new(segmenter),
            model,
        }
    }
}

/// Score each distinct word of `words` by its frequency in the list times
/// its corpus IDF, in first-seen order. Out-of-vocabulary words are skipped.
pub fn score_tags(words: &[String], model: &IdfModel) -> Vec<RankedKeyword> {
    let mut seen = HashSet::new();
    words
        .iter()
        .filter(|w| seen.insert(w.as_str()))
        .filter_map(|word| {
            let idf = model.idf(word)?;
            let tf = words.iter().filter(|w| *w == word).count() as f64;
            Some(RankedKeyword {
                word: word.clone(),
                weight: tf * idf,
            })
        })
        .collect()
}

impl KeywordRanker for TfIdfRanker {
    fn rank(&self, text: &str, top_k: usize) -> Result<Vec<RankedKeyword>> {
        let words = self.tags.keywords(text, CANDIDATE_TAGS)?;
        Ok(top_ranked(score_tags(&words, &self.model), top_k))
    }
}
