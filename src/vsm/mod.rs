// Vector-space model over the item keyword corpus.
//
// Each corpus item is a document whose tokens are its extracted keywords.
// The fitted model holds a lexicographically sorted vocabulary and smoothed
// inverse document frequencies:
//
//   idf(t) = ln((1 + n) / (1 + df(t))) + 1
//
// It serves three roles: document rows for the content-space index, the
// corpus IDF for TF-IDF keyword ranking, and edge weights for IDF-assisted
// TextRank.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::embedding::vector;

/// File names the keyword strategies look for in the concept directory.
pub const VSM_MODEL_FILE: &str = "vsm_model.json";
pub const TFIDF_MODEL_FILE: &str = "tfidf_model.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdfModel {
    /// Term -> column index
    pub vocabulary: HashMap<String, usize>,
    /// Inverse document frequency per column
    pub idf: Vec<f64>,
}

/// Lower-case a token and drop it when shorter than two characters.
fn normalize_token(token: &str) -> Option<String> {
    let token = token.trim().to_lowercase();
    (token.chars().count() >= 2).then_some(token)
}

impl IdfModel {
    /// Fit vocabulary and IDF over a set of tokenized documents.
    pub fn fit<D, T>(documents: &[D]) -> Self
    where
        D: AsRef<[T]>,
        T: AsRef<str>,
    {
        let n = documents.len() as f64;
        let mut df: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let distinct: BTreeSet<String> = doc
                .as_ref()
                .iter()
                .filter_map(|t| normalize_token(t.as_ref()))
                .collect();
            for term in distinct {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let terms: BTreeSet<&String> = df.keys().collect();
        let mut vocabulary = HashMap::with_capacity(terms.len());
        let mut idf = Vec::with_capacity(terms.len());
        for (index, term) in terms.into_iter().enumerate() {
            vocabulary.insert(term.clone(), index);
            idf.push(((1.0 + n) / (1.0 + df[term] as f64)).ln() + 1.0);
        }

        info!(
            documents = documents.len(),
            vocabulary = vocabulary.len(),
            "Fitted IDF model"
        );

        Self { vocabulary, idf }
    }

    pub fn dim(&self) -> usize {
        self.idf.len()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        let term = normalize_token(term)?;
        self.vocabulary.get(&term).map(|&i| self.idf[i])
    }

    /// Largest IDF in the model, used as the weight of unseen terms.
    pub fn max_idf(&self) -> f64 {
        self.idf.iter().copied().fold(1.0, f64::max)
    }

    /// L2-normalised tf-idf row for one tokenized document.
    pub fn transform<T: AsRef<str>>(&self, tokens: &[T]) -> Vec<f64> {
        let mut row = vec![0.0; self.dim()];
        for token in tokens {
            let Some(term) = normalize_token(token.as_ref()) else {
                continue;
            };
            if let Some(&index) = self.vocabulary.get(&term) {
                row[index] += self.idf[index];
            }
        }
        vector::normalize(&mut row);
        row
    }

    /// Unnormalised sum of IDF over the in-vocabulary tags. Unknown tags are
    /// ignored, so a fully out-of-vocabulary query is the zero vector.
    pub fn idf_vector<T: AsRef<str>>(&self, tags: &[T]) -> Vec<f64> {
        let mut row = vec![0.0; self.dim()];
        for tag in tags {
            let Some(term) = normalize_token(tag.as_ref()) else {
                continue;
            };
            if let Some(&index) = self.vocabulary.get(&term) {
                row[index] += self.idf[index];
            }
        }
        row
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self).context("Failed to serialize IDF model")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write IDF model to {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read IDF model from {}", path.display()))?;
        let model: Self = serde_json::from_str(&json)
            .with_context(|| format!("Invalid IDF model in {}", path.display()))?;
        if model.vocabulary.values().any(|&i| i >= model.idf.len()) {
            anyhow::bail!(
                "IDF model {} references columns beyond its {} idf values",
                path.display(),
                model.idf.len()
            );
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Vec<&'static str>> {
        vec![
            vec!["音樂", "演唱會"],
            vec!["音樂", "展覽"],
            vec!["展覽", "藝術", "藝術"],
        ]
    }

    #[test]
    fn test_vocabulary_is_sorted() {
        let model = IdfModel::fit(&corpus());
        let mut terms: Vec<(&String, &usize)> = model.vocabulary.iter().collect();
        terms.sort_by_key(|entry| *entry.1);
        let ordered: Vec<&str> = terms.iter().map(|(t, _)| t.as_str()).collect();
        let mut sorted = ordered.clone();
        sorted.sort();
        assert_eq!(ordered, sorted);
        assert_eq!(model.dim(), 4);
    }

    #[test]
    fn test_smoothed_idf() {
        let model = IdfModel::fit(&corpus());
        // 音樂 appears in 2 of 3 documents
        let expected = (4.0_f64 / 3.0).ln() + 1.0;
        assert!((model.idf("音樂").unwrap() - expected).abs() < 1e-12);
        // 藝術 appears in 1 document, repeated tokens count once
        let expected = (4.0_f64 / 2.0).ln() + 1.0;
        assert!((model.idf("藝術").unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_short_tokens_dropped_and_case_folded() {
        let model = IdfModel::fit(&[vec!["A", "Jazz"], vec!["jazz", "b"]]);
        assert_eq!(model.dim(), 1);
        assert!(model.idf("JAZZ").is_some());
        assert!(model.idf("a").is_none());
    }

    #[test]
    fn test_transform_is_unit_length() {
        let model = IdfModel::fit(&corpus());
        let row = model.transform(&["展覽", "藝術", "藝術"]);
        assert!((vector::norm(&row) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_idf_vector_ignores_unknown_tags() {
        let model = IdfModel::fit(&corpus());
        let row = model.idf_vector(&["不存在"]);
        assert_eq!(row.len(), model.dim());
        assert!(row.iter().all(|&v| v == 0.0));

        let row = model.idf_vector(&["音樂"]);
        let index = model.vocabulary["音樂"];
        assert!((row[index] - model.idf("音樂").unwrap()).abs() < 1e-12);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join("coldprop-idf-model-test.json");
        let model = IdfModel::fit(&corpus());
        model.save(&path).unwrap();
        let loaded = IdfModel::load(&path).unwrap();
        assert_eq!(loaded.vocabulary, model.vocabulary);
        assert_eq!(loaded.idf, model.idf);
        std::fs::remove_file(&path).unwrap();
    }
}
