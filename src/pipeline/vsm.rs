// Content-space propagation.
//
// The corpus keyword lists are turned into TF-IDF rows and indexed directly,
// with no concept space in between. An unseen item's query is the IDF vector
// of the tags extracted from its title and description.

use anyhow::Result;
use clap::ValueEnum;
use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use super::RunOptions;
use crate::data::{corpus_documents, Corpus, EmbeddingTable, UnseenItem};
use crate::index::{AngularForest, ForestBuilder};
use crate::keywords::tfidf::CANDIDATE_TAGS;
use crate::keywords::KeywordRanker;
use crate::output::terminal::RunSummary;
use crate::propagation::{propagate, InverseDistance, PropagationError};
use crate::vsm::IdfModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum VsmMode {
    /// Propagate trained embeddings from the nearest items
    #[default]
    Propagate,
    /// Emit the item's raw TF-IDF query vector
    #[value(name = "tfidf")]
    TfIdf,
}

/// The fitted corpus model and the forest over its document rows.
pub struct ContentIndex {
    pub model: IdfModel,
    pub forest: AngularForest,
}

pub fn build_content_index(corpus: &Corpus, options: &RunOptions) -> Result<ContentIndex> {
    let documents = corpus_documents(corpus);
    let model = IdfModel::fit(&documents);

    let mut builder = ForestBuilder::new(model.dim());
    for (id, document) in corpus.keys().zip(&documents) {
        builder.add_item(id, model.transform(document))?;
    }

    Ok(ContentIndex {
        forest: builder.build(options.trees, options.seed),
        model,
    })
}

pub fn run(
    items: &[UnseenItem],
    tags: &dyn KeywordRanker,
    index: &ContentIndex,
    trained: &EmbeddingTable,
    mode: VsmMode,
    options: &RunOptions,
) -> Result<(Vec<(String, Vec<f64>)>, RunSummary)> {
    let weight = InverseDistance {
        epsilon: options.epsilon,
    };
    let mut entries = Vec::with_capacity(items.len());
    let mut summary = RunSummary {
        unseen: items.len(),
        indexed: index.forest.len(),
        ..RunSummary::default()
    };

    let pb = ProgressBar::new(items.len() as u64);
    for item in items {
        info!(id = %item.id, "Resolving unseen item");
        let item_tags = tags.keywords(&item.text(), CANDIDATE_TAGS)?;
        debug!(tags = ?item_tags, "Extracted tags");
        let query = index.model.idf_vector(&item_tags);
        pb.inc(1);

        if mode == VsmMode::TfIdf {
            entries.push((item.id.clone(), query));
            continue;
        }

        let neighbors = index.forest.nearest(&query, options.neighbors)?;
        debug!(neighbors = ?neighbors, "Nearest corpus items");

        match propagate(&neighbors, trained, &weight) {
            Ok(propagated) => {
                info!(
                    id = %item.id,
                    related = propagated.contributors.len(),
                    "Propagated embedding"
                );
                entries.push((item.id.clone(), propagated.vector));
            }
            Err(PropagationError::NoResolvableNeighbors { candidates }) => {
                warn!(
                    id = %item.id,
                    candidates,
                    "No neighbor has an embedding, skipping item"
                );
                summary.skipped.push(item.id.clone());
            }
            Err(e) => return Err(e.into()),
        }
    }
    pb.finish_and_clear();

    summary.written = entries.len();
    Ok((entries, summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Corpus {
        serde_json::from_str(
            r#"{
                "1": [["音樂", 1.0], ["演唱會", 0.5]],
                "2": [["展覽", 1.0], ["藝術", 0.5]],
                "3": [["音樂", 1.0], ["爵士", 0.7]]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_content_index_covers_every_item() {
        let index = build_content_index(&corpus(), &RunOptions::default()).unwrap();
        assert_eq!(index.forest.len(), 3);
        assert_eq!(index.forest.dim(), index.model.dim());
    }

    #[test]
    fn test_music_query_finds_music_items() {
        let index = build_content_index(&corpus(), &RunOptions::default()).unwrap();
        let query = index.model.idf_vector(&["音樂", "爵士"]);
        let hits = index.forest.nearest(&query, 2).unwrap();
        let ids: Vec<&str> = hits.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1"]);
    }
}
