// Keyword strategy selection.
//
// The strategy is chosen once, on the command line, and turned into a pair
// of rankers here. Strategies that need an external model fall back to plain
// TextRank when the model is missing, so a run never fails for lack of an
// optional model.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::ValueEnum;
use tracing::{info, warn};

use super::embedrank::EmbedRank;
use super::segment::Segmenter;
use super::textrank::{EdgeWeighting, JiebaTextRank, WeightedTextRank};
use super::tfidf::{TagExtractor, TfIdfRanker};
use super::traits::KeywordRanker;
use crate::concepts::ConceptTable;
use crate::data::{corpus_documents, Corpus};
use crate::embedding::sentence::SentenceEmbedder;
use crate::models::download;
use crate::vsm::{IdfModel, TFIDF_MODEL_FILE, VSM_MODEL_FILE};

/// Word vectors for similarity-assisted TextRank, word2vec text format.
pub const WORD2VEC_FILE: &str = "word2vec.txt";

/// Keywords taken from each of title and description.
pub const KEYWORDS_PER_SOURCE: usize = 10;

/// How description keywords are extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum KeywordStrategy {
    /// jieba TextRank over nouns and place names
    #[default]
    #[value(name = "textrank")]
    TextRank,
    /// TextRank with edges weighted by word-vector similarity
    #[value(name = "textrank-word2vec")]
    TextRankWordVectors,
    /// TextRank with edges weighted by corpus IDF
    #[value(name = "textrank-idf")]
    TextRankIdf,
    /// Candidates scored by sentence-embedding similarity to the text
    #[value(name = "embedrank")]
    EmbedRank,
    /// jieba tags re-scored with corpus IDF
    #[value(name = "tfidf")]
    TfIdf,
}

impl KeywordStrategy {
    /// Concept mapping file matching the vocabulary this strategy produces.
    pub fn mapping_file(self) -> &'static str {
        match self {
            Self::EmbedRank => "embedrank_mapping.txt",
            Self::TfIdf => "tfidf_mapping.txt",
            _ => "textrank_mapping.txt",
        }
    }
}

/// Where strategy models are looked up.
pub struct ModelAssets<'a> {
    pub concept_dir: PathBuf,
    pub model_dir: PathBuf,
    /// Used to fit an IDF model when none is stored
    pub corpus: Option<&'a Corpus>,
}

/// Title and description rankers for one run.
pub struct KeywordSources {
    pub title: Box<dyn KeywordRanker>,
    pub description: Box<dyn KeywordRanker>,
}

/// Keywords extracted for one item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedKeywords {
    pub title: Vec<String>,
    pub description: Vec<String>,
}

impl ExtractedKeywords {
    /// Title keywords followed by description keywords, duplicates kept.
    pub fn combined(&self) -> Vec<&str> {
        self.title
            .iter()
            .chain(&self.description)
            .map(String::as_str)
            .collect()
    }
}

impl KeywordSources {
    pub fn new(title: Box<dyn KeywordRanker>, description: Box<dyn KeywordRanker>) -> Self {
        Self { title, description }
    }

    /// jieba tag extraction for titles, `strategy` for descriptions.
    pub fn for_strategy(
        strategy: KeywordStrategy,
        segmenter: Arc<Segmenter>,
        assets: &ModelAssets<'_>,
    ) -> Result<Self> {
        let title = Box::new(TagExtractor::new(Arc::clone(&segmenter)));
        let description = build_description_ranker(strategy, segmenter, assets)?;
        Ok(Self::new(title, description))
    }

    pub fn extract(&self, title: &str, description: &str) -> Result<ExtractedKeywords> {
        Ok(ExtractedKeywords {
            title: self.title.keywords(title, KEYWORDS_PER_SOURCE)?,
            description: self.description.keywords(description, KEYWORDS_PER_SOURCE)?,
        })
    }
}

fn load_idf_model(path: &Path) -> Option<IdfModel> {
    if !path.exists() {
        return None;
    }
    match IdfModel::load(path) {
        Ok(model) => Some(model),
        Err(e) => {
            warn!("Ignoring unreadable IDF model: {e:#}");
            None
        }
    }
}

/// Build the description ranker for `strategy`, falling back to plain
/// TextRank when the strategy's model cannot be loaded.
pub fn build_description_ranker(
    strategy: KeywordStrategy,
    segmenter: Arc<Segmenter>,
    assets: &ModelAssets<'_>,
) -> Result<Box<dyn KeywordRanker>> {
    let fallback = |segmenter: Arc<Segmenter>, what: &str| -> Box<dyn KeywordRanker> {
        warn!("{what} not available, falling back to plain TextRank");
        Box::new(JiebaTextRank::new(segmenter))
    };

    let ranker: Box<dyn KeywordRanker> = match strategy {
        KeywordStrategy::TextRank => Box::new(JiebaTextRank::new(segmenter)),

        KeywordStrategy::TextRankWordVectors => {
            let path = assets.concept_dir.join(WORD2VEC_FILE);
            if !path.exists() {
                return Ok(fallback(segmenter, "Word vectors"));
            }
            info!("Loading word vectors from {}", path.display());
            match ConceptTable::load(&path) {
                Ok(vectors) => Box::new(WeightedTextRank::new(
                    segmenter,
                    EdgeWeighting::WordVectors(vectors),
                )),
                Err(e) => {
                    warn!("Ignoring unreadable word vectors: {e:#}");
                    fallback(segmenter, "Word vectors")
                }
            }
        }

        KeywordStrategy::TextRankIdf => {
            match load_idf_model(&assets.concept_dir.join(VSM_MODEL_FILE)) {
                Some(model) => Box::new(WeightedTextRank::new(segmenter, EdgeWeighting::Idf(model))),
                None => fallback(segmenter, "VSM model"),
            }
        }

        KeywordStrategy::EmbedRank => {
            let dir = download::sentence_model_dir(&assets.model_dir);
            if !download::sentence_files_present(&assets.model_dir) {
                return Ok(fallback(segmenter, "Sentence embedding model"));
            }
            match SentenceEmbedder::load(&dir) {
                Ok(encoder) => Box::new(EmbedRank::new(segmenter, encoder)),
                Err(e) => {
                    warn!("{e:#}");
                    fallback(segmenter, "Sentence embedding model")
                }
            }
        }

        KeywordStrategy::TfIdf => {
            let stored = load_idf_model(&assets.concept_dir.join(TFIDF_MODEL_FILE));
            let model = match (stored, assets.corpus) {
                (Some(model), _) => model,
                (None, Some(corpus)) => {
                    info!("No stored TF-IDF model, fitting one on the corpus");
                    IdfModel::fit(&corpus_documents(corpus))
                }
                (None, None) => return Ok(fallback(segmenter, "TF-IDF model")),
            };
            Box::new(TfIdfRanker::new(segmenter, model))
        }
    };

    info!(strategy = ?strategy, "Keyword ranker ready");
    Ok(ranker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_files() {
        assert_eq!(KeywordStrategy::EmbedRank.mapping_file(), "embedrank_mapping.txt");
        assert_eq!(KeywordStrategy::TfIdf.mapping_file(), "tfidf_mapping.txt");
        assert_eq!(KeywordStrategy::TextRank.mapping_file(), "textrank_mapping.txt");
        assert_eq!(
            KeywordStrategy::TextRankIdf.mapping_file(),
            "textrank_mapping.txt"
        );
    }

    #[test]
    fn test_combined_keeps_title_first_and_duplicates() {
        let kw = ExtractedKeywords {
            title: vec!["音樂".to_string(), "展覽".to_string()],
            description: vec!["展覽".to_string()],
        };
        assert_eq!(kw.combined(), vec!["音樂", "展覽", "展覽"]);
    }

    #[test]
    fn test_missing_models_fall_back() {
        let segmenter = Arc::new(Segmenter::new().unwrap());
        let empty = std::env::temp_dir().join("coldprop-empty-concepts");
        let assets = ModelAssets {
            concept_dir: empty.clone(),
            model_dir: empty,
            corpus: None,
        };
        for strategy in [
            KeywordStrategy::TextRankWordVectors,
            KeywordStrategy::TextRankIdf,
            KeywordStrategy::EmbedRank,
            KeywordStrategy::TfIdf,
        ] {
            let ranker = build_description_ranker(strategy, Arc::clone(&segmenter), &assets);
            assert!(ranker.is_ok(), "{strategy:?} should fall back");
        }
    }

    #[test]
    fn test_malformed_models_fall_back() {
        let segmenter = Arc::new(Segmenter::new().unwrap());
        let dir = std::env::temp_dir().join(format!("coldprop-bad-models-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        // Ragged rows and a non-numeric component
        std::fs::write(dir.join(WORD2VEC_FILE), "2 3\n音樂 0.1 0.2 0.3\n展覽 0.1 x\n").unwrap();
        std::fs::write(dir.join(VSM_MODEL_FILE), "not json").unwrap();
        std::fs::write(dir.join(TFIDF_MODEL_FILE), "{").unwrap();

        let assets = ModelAssets {
            concept_dir: dir.clone(),
            model_dir: dir.clone(),
            corpus: None,
        };
        for strategy in [
            KeywordStrategy::TextRankWordVectors,
            KeywordStrategy::TextRankIdf,
            KeywordStrategy::TfIdf,
        ] {
            let ranker = build_description_ranker(strategy, Arc::clone(&segmenter), &assets);
            assert!(ranker.is_ok(), "{strategy:?} should fall back");
        }

        let _ = std::fs::remove_dir_all(&dir);
    }
}
