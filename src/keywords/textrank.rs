// TextRank keyword ranking.
//
// Plain TextRank is jieba's own implementation. The assisted variants build
// the same word co-occurrence graph (window of 5 over the segmented text,
// only nouns and place names as nodes) but scale every edge by how related
// its two words are according to an external model:
//
//   - word vectors: edge *= max(cos(a, b), 0) when both words have vectors
//   - IDF (vector-space model): edge *= idf(a) * idf(b)
//
// and then run weighted PageRank over the undirected graph.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::Result;
use jieba_rs::{KeywordExtract, TextRank};

use super::segment::{Segmenter, TEXTRANK_POS};
use super::traits::{top_ranked, KeywordRanker, RankedKeyword};
use crate::concepts::ConceptTable as WordVectors;
use crate::embedding::vector;
use crate::vsm::IdfModel;

/// Co-occurrence window, in words.
const SPAN: usize = 5;
const DAMPING: f64 = 0.85;
const CONVERGENCE: f64 = 1e-6;
const MAX_ITERATIONS: usize = 100;

fn allowed_pos() -> Vec<String> {
    TEXTRANK_POS.iter().map(|p| p.to_string()).collect()
}

/// jieba's TextRank restricted to nouns and place names.
pub struct JiebaTextRank {
    segmenter: Arc<Segmenter>,
    extractor: TextRank,
}

impl JiebaTextRank {
    pub fn new(segmenter: Arc<Segmenter>) -> Self {
        Self {
            segmenter,
            extractor: TextRank::default(),
        }
    }
}

impl KeywordRanker for JiebaTextRank {
    fn rank(&self, text: &str, top_k: usize) -> Result<Vec<RankedKeyword>> {
        Ok(self
            .extractor
            .extract_keywords(self.segmenter.jieba(), text, top_k, allowed_pos())
            .into_iter()
            .map(|k| RankedKeyword {
                word: k.keyword,
                weight: k.weight,
            })
            .collect())
    }
}

/// Source of the extra edge weight in assisted TextRank.
pub enum EdgeWeighting {
    WordVectors(WordVectors),
    Idf(IdfModel),
}

impl EdgeWeighting {
    fn factor(&self, a: &str, b: &str) -> f64 {
        match self {
            Self::WordVectors(vectors) => match (vectors.get(a), vectors.get(b)) {
                (Some(va), Some(vb)) => vector::cosine_similarity(va, vb).max(0.0),
                _ => 1.0,
            },
            Self::Idf(model) => {
                let fallback = model.max_idf();
                model.idf(a).unwrap_or(fallback) * model.idf(b).unwrap_or(fallback)
            }
        }
    }
}

/// TextRank with model-weighted edges.
pub struct WeightedTextRank {
    segmenter: Arc<Segmenter>,
    weighting: EdgeWeighting,
}

impl WeightedTextRank {
    pub fn new(segmenter: Arc<Segmenter>, weighting: EdgeWeighting) -> Self {
        Self {
            segmenter,
            weighting,
        }
    }
}

impl KeywordRanker for WeightedTextRank {
    fn rank(&self, text: &str, top_k: usize) -> Result<Vec<RankedKeyword>> {
        let tagged = self.segmenter.tag(text);
        let keep: Vec<bool> = tagged
            .iter()
            .map(|w| self.segmenter.is_candidate(w, &TEXTRANK_POS))
            .collect();

        // Node ids in first-seen order; edges keyed (low, high) for determinism
        let mut nodes: Vec<&str> = Vec::new();
        let mut node_ids: HashMap<&str, usize> = HashMap::new();
        let mut counts: BTreeMap<(usize, usize), f64> = BTreeMap::new();

        for i in 0..tagged.len() {
            if !keep[i] {
                continue;
            }
            for j in (i + 1)..(i + SPAN).min(tagged.len()) {
                if !keep[j] || tagged[i].word == tagged[j].word {
                    continue;
                }
                let a = node_id(&tagged[i].word, &mut nodes, &mut node_ids);
                let b = node_id(&tagged[j].word, &mut nodes, &mut node_ids);
                *counts.entry((a.min(b), a.max(b))).or_insert(0.0) += 1.0;
            }
        }

        let edges: Vec<(usize, usize, f64)> = counts
            .into_iter()
            .map(|((a, b), count)| (a, b, count * self.weighting.factor(nodes[a], nodes[b])))
            .collect();

        let scores = weighted_pagerank(nodes.len(), &edges);
        let max = scores.iter().copied().fold(0.0_f64, f64::max);

        let ranked: Vec<RankedKeyword> = nodes
            .iter()
            .zip(&scores)
            .map(|(word, &score)| RankedKeyword {
                word: word.to_string(),
                weight: if max > 0.0 { score / max } else { 0.0 },
            })
            .collect();

        Ok(top_ranked(ranked, top_k))
    }
}

fn node_id<'t>(
    word: &'t str,
    nodes: &mut Vec<&'t str>,
    node_ids: &mut HashMap<&'t str, usize>,
) -> usize {
    *node_ids.entry(word).or_insert_with(|| {
        nodes.push(word);
        nodes.len() - 1
    })
}

/// PageRank over an undirected weighted graph given as an edge list.
pub fn weighted_pagerank(n: usize, edges: &[(usize, usize, f64)]) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }

    let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    let mut out_sum = vec![0.0_f64; n];
    for &(a, b, w) in edges {
        adjacency[a].push((b, w));
        adjacency[b].push((a, w));
        out_sum[a] += w;
        out_sum[b] += w;
    }

    let mut scores = vec![1.0 / n as f64; n];
    for _ in 0..MAX_ITERATIONS {
        let mut max_diff = 0.0_f64;
        let next: Vec<f64> = (0..n)
            .map(|i| {
                let incoming: f64 = adjacency[i]
                    .iter()
                    .filter(|&&(j, _)| out_sum[j] > 0.0)
                    .map(|&(j, w)| w / out_sum[j] * scores[j])
                    .sum();
                (1.0 - DAMPING) + DAMPING * incoming
            })
            .collect();

        for (old, new) in scores.iter().zip(&next) {
            max_diff = max_diff.max((old - new).abs());
        }
        scores = next;
        if max_diff < CONVERGENCE {
            break;
        }
    }

    scores
}
