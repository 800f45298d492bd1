// EmbedRank keyword ranking.
//
// Candidates are the distinct nouns and place names of the text. The
// candidates are embedded together as the "document" and one by one as
// words; each word scores the cosine similarity between its vector and the
// document vector.

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use super::segment::{Segmenter, TEXTRANK_POS};
use super::traits::{top_ranked, KeywordRanker, RankedKeyword};
use crate::embedding::sentence::TextEncoder;
use crate::embedding::vector;

pub struct EmbedRank<E: TextEncoder> {
    segmenter: Arc<Segmenter>,
    encoder: E,
}

impl<E: TextEncoder> EmbedRank<E> {
    pub fn new(segmenter: Arc<Segmenter>, encoder: E) -> Self {
        Self { segmenter, encoder }
    }
}

impl<E: TextEncoder> KeywordRanker for EmbedRank<E> {
    fn rank(&self, text: &str, top_k: usize) -> Result<Vec<RankedKeyword>> {
        let candidates = self.segmenter.candidates(text, &TEXTRANK_POS);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        // One batch: document first, then every candidate word
        let mut batch = Vec::with_capacity(candidates.len() + 1);
        batch.push(candidates.join(" "));
        batch.extend(candidates.iter().cloned());

        let vectors = self.encoder.encode(&batch)?;
        if vectors.len() != batch.len() {
            anyhow::bail!(
                "Encoder returned {} vectors for {} texts",
                vectors.len(),
                batch.len()
            );
        }

        let doc_vec = &vectors[0];
        let ranked: Vec<RankedKeyword> = candidates
            .into_iter()
            .zip(&vectors[1..])
            .map(|(word, word_vec)| RankedKeyword {
                weight: vector::cosine_similarity(word_vec, doc_vec),
                word,
            })
            .collect();

        debug!(candidates = ranked.len(), "EmbedRank scored candidates");
        Ok(top_ranked(ranked, top_k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encodes text as a 2-d vector: (contains 音乐, contains anything else).
    struct ToyEncoder;

    impl TextEncoder for ToyEncoder {
        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let music = t.matches("音乐").count() as f64;
                    let other = t.split(' ').filter(|w| *w != "音乐").count() as f64;
                    vec![music, other]
                })
                .collect())
        }
    }

    struct ShortEncoder;

    impl TextEncoder for ShortEncoder {
        fn encode(&self, _texts: &[String]) -> Result<Vec<Vec<f64>>> {
            Ok(vec![vec![1.0]])
        }
    }

    #[test]
    fn test_scores_are_sorted_and_bounded() {
        let segmenter = Arc::new(Segmenter::new().unwrap());
        let ranker = EmbedRank::new(segmenter, ToyEncoder);
        let ranked = ranker
            .rank("音乐节邀请乐团与歌手，音乐爱好者在公园欣赏音乐", 10)
            .unwrap();
        assert!(ranked.len() <= 10);
        assert!(ranked.windows(2).all(|w| w[0].weight >= w[1].weight));
        assert!(ranked.iter().all(|k| (-1.0..=1.0).contains(&k.weight)));
    }

    #[test]
    fn test_empty_text_has_no_keywords() {
        let segmenter = Arc::new(Segmenter::new().unwrap());
        let ranker = EmbedRank::new(segmenter, ToyEncoder);
        assert!(ranker.rank("", 10).unwrap().is_empty());
    }

    #[test]
    fn test_encoder_output_length_is_checked() {
        let segmenter = Arc::new(Segmenter::new().unwrap());
        let text = "我们在北京参观了故宫博物院的书法展览";
        // Only text with at least one candidate reaches the encoder
        assert!(!segmenter.candidates(text, &TEXTRANK_POS).is_empty());

        let ranker = EmbedRank::new(segmenter, ShortEncoder);
        let err = ranker.rank(text, 10).unwrap_err();
        assert!(err.to_string().contains("Encoder returned"), "got: {err}");
    }
}
