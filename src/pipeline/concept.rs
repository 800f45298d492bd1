// Label propagation through the concept space.
//
// 1. Every corpus item gets a label embedding: the mean concept vector of its
//    keywords. Items whose keywords all miss the concept space get none and
//    are not indexed.
// 2. An unseen item's title and description keywords are averaged the same
//    way (zero vector if nothing resolves) and used to query the index.
// 3. The neighbors' embeddings from the chosen source table are averaged
//    with inverse-distance weights.
//
// The neighbors are found by label proximity, but the label vectors are
// only a key: the values propagated normally come from the trained table.

use std::collections::HashMap;

use anyhow::Result;
use clap::ValueEnum;
use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use super::RunOptions;
use crate::concepts::ConceptSpace;
use crate::data::{Corpus, EmbeddingTable, UnseenItem};
use crate::embedding::mapping::{transform, EmbeddingMapper};
use crate::index::{AngularForest, ForestBuilder, Neighbor};
use crate::keywords::{ExtractedKeywords, KeywordSources};
use crate::output::terminal::RunSummary;
use crate::propagation::{propagate, InverseDistance, PropagationError};

/// Which table the propagated values come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PropagationSource {
    /// Trained item embeddings
    #[default]
    Trained,
    /// The neighbors' label embeddings
    Label,
    /// Label embeddings remapped by the mapping model
    Mapped,
}

/// What is written for each unseen item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Emit {
    /// The propagated embedding
    #[default]
    Propagated,
    /// The item's own concept query vector
    Query,
}

/// Label embeddings of the corpus and the forest built over them.
pub struct LabelIndex {
    pub labels: EmbeddingTable,
    pub forest: AngularForest,
}

/// Build label embeddings for every corpus item and index them.
pub fn build_label_index(
    corpus: &Corpus,
    space: &ConceptSpace,
    options: &RunOptions,
) -> Result<LabelIndex> {
    let mut labels = HashMap::new();
    let mut builder = ForestBuilder::new(space.dim());

    for (id, tags) in corpus {
        let Some(label) = space.label_vector(tags.iter().map(|(word, _)| word.as_str())) else {
            debug!(id = %id, "No keyword of this item resolves to a concept, not indexed");
            continue;
        };
        builder.add_item(id, label.clone())?;
        labels.insert(id.clone(), label);
    }

    info!(
        corpus = corpus.len(),
        labelled = labels.len(),
        "Generated label embeddings"
    );

    Ok(LabelIndex {
        labels,
        forest: builder.build(options.trees, options.seed),
    })
}

/// Keywords, query vector and neighbors of one unseen item.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub keywords: ExtractedKeywords,
    pub query: Vec<f64>,
    pub neighbors: Vec<Neighbor>,
}

pub fn resolve_unseen(
    item: &UnseenItem,
    sources: &KeywordSources,
    space: &ConceptSpace,
    forest: &AngularForest,
    k: usize,
) -> Result<Resolution> {
    let keywords = sources.extract(&item.title, &item.description)?;
    debug!(title = ?keywords.title, "Title keywords");
    debug!(description = ?keywords.description, "Description keywords");

    let query = space.query_vector(keywords.combined());
    let neighbors = forest.nearest(&query, k)?;
    debug!(neighbors = ?neighbors, "Nearest labelled items");

    Ok(Resolution {
        keywords,
        query,
        neighbors,
    })
}

/// Pick the table whose values are propagated. A missing mapping model
/// falls back to the trained embeddings.
pub fn source_table(
    source: PropagationSource,
    trained: EmbeddingTable,
    index: &LabelIndex,
    mapper: Option<&dyn EmbeddingMapper>,
) -> Result<EmbeddingTable> {
    Ok(match (source, mapper) {
        (PropagationSource::Trained, _) => trained,
        (PropagationSource::Label, _) => index.labels.clone(),
        (PropagationSource::Mapped, Some(mapper)) => transform(&index.labels, mapper)?,
        (PropagationSource::Mapped, None) => {
            warn!("Mapping model not available, propagating trained embeddings");
            trained
        }
    })
}

/// Resolve and propagate every unseen item, in input order.
///
/// Items whose neighbors all lack an embedding are skipped and reported in
/// the summary; any other failure aborts the run.
pub fn run(
    items: &[UnseenItem],
    sources: &KeywordSources,
    space: &ConceptSpace,
    index: &LabelIndex,
    table: &EmbeddingTable,
    emit: Emit,
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
        let resolution = resolve_unseen(item, sources, space, &index.forest, options.neighbors)?;
        pb.inc(1);

        if emit == Emit::Query {
            entries.push((item.id.clone(), resolution.query));
            continue;
        }

        match propagate(&resolution.neighbors, table, &weight) {
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
