// Propagation pipelines: the two entry points.
//
// concept: keyword concepts -> label embeddings -> neighbor search
// vsm:     corpus TF-IDF rows -> neighbor search
//
// Both finish the same way: the neighbors' trained embeddings are averaged
// with inverse-distance weights into the unseen item's embedding.

pub mod concept;
pub mod vsm;

/// Tunables shared by both pipelines.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Neighbors retrieved per unseen item
    pub neighbors: usize,
    /// Trees in the neighbor-search forest
    pub trees: usize,
    /// Seed for the forest's random hyperplanes
    pub seed: u64,
    /// Epsilon of the inverse-distance weight
    pub epsilon: f64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            neighbors: 10,
            trees: 10,
            seed: 42,
            epsilon: 1e-5,
        }
    }
}
