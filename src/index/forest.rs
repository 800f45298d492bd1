// Random-projection forest with an angular metric.
//
// Each tree recursively splits the items by a hyperplane through the origin
// whose normal is the difference of two randomly picked (unit-length) items,
// until a node holds at most MAX_LEAF_SIZE items. A query walks all trees
// best-first, ordered by how far the query sits on the "wrong" side of each
// split it passes, until it has gathered `trees * k` candidates; candidates
// are then ranked by exact angular distance.
//
// Building returns the forest itself. Phases hand the forest to each other
// in memory; `save`/`load` exist for inspection only.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::embedding::vector;

/// Largest number of items kept in a single leaf.
pub const MAX_LEAF_SIZE: usize = 32;

/// Hyperplane picks tried before a node is split in half at random.
const SPLIT_ATTEMPTS: usize = 3;

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: String,
    /// Angular distance, 0.0 (same direction) to 2.0 (opposite)
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf(Vec<usize>),
    Split {
        normal: Vec<f64>,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Collects items before the trees are built.
#[derive(Debug, Clone)]
pub struct ForestBuilder {
    dim: usize,
    ids: Vec<String>,
    vectors: Vec<Vec<f64>>,
    positions: HashMap<String, usize>,
}

impl ForestBuilder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            ids: Vec::new(),
            vectors: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Add an item. Adding an id twice replaces its vector but keeps its
    /// original insertion position.
    pub fn add_item(&mut self, id: &str, vector: Vec<f64>) -> Result<()> {
        if vector.len() != self.dim {
            anyhow::bail!(
                "Item {id} has {} components, index dimension is {}",
                vector.len(),
                self.dim
            );
        }

        match self.positions.get(id) {
            Some(&pos) => self.vectors[pos] = vector,
            None => {
                self.positions.insert(id.to_string(), self.ids.len());
                self.ids.push(id.to_string());
                self.vectors.push(vector);
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Build `n_trees` trees. The same seed and items give the same forest.
    pub fn build(self, n_trees: usize, seed: u64) -> AngularForest {
        let mut rng = StdRng::seed_from_u64(seed);
        let units: Vec<Vec<f64>> = self
            .vectors
            .iter()
            .map(|v| {
                let mut u = v.clone();
                vector::normalize(&mut u);
                u
            })
            .collect();

        let roots = if self.ids.is_empty() {
            Vec::new()
        } else {
            (0..n_trees.max(1))
                .map(|_| build_node((0..self.ids.len()).collect(), &units, &mut rng))
                .collect()
        };

        info!(
            items = self.ids.len(),
            trees = roots.len(),
            dim = self.dim,
            "Built nearest-neighbor forest"
        );

        AngularForest {
            dim: self.dim,
            ids: self.ids,
            vectors: self.vectors,
            positions: self.positions,
            roots,
        }
    }
}

fn build_node(indices: Vec<usize>, units: &[Vec<f64>], rng: &mut StdRng) -> Node {
    if indices.len() <= MAX_LEAF_SIZE {
        return Node::Leaf(indices);
    }

    for _ in 0..SPLIT_ATTEMPTS {
        let a = indices[rng.random_range(0..indices.len())];
        let b = indices[rng.random_range(0..indices.len())];
        let normal: Vec<f64> = units[a]
            .iter()
            .zip(&units[b])
            .map(|(x, y)| x - y)
            .collect();
        if vector::norm(&normal) < f64::EPSILON {
            continue;
        }

        let mut left = Vec::new();
        let mut right = Vec::new();
        for &i in &indices {
            let margin = vector::dot(&normal, &units[i]);
            let goes_right = if margin == 0.0 {
                rng.random_bool(0.5)
            } else {
                margin > 0.0
            };
            if goes_right {
                right.push(i);
            } else {
                left.push(i);
            }
        }

        if !left.is_empty() && !right.is_empty() {
            return Node::Split {
                left: Box::new(build_node(left, units, rng)),
                right: Box::new(build_node(right, units, rng)),
                normal,
            };
        }
    }

    // Every pick was degenerate (e.g. duplicated vectors): split in half.
    let mut shuffled = indices;
    shuffled.shuffle(rng);
    let right = shuffled.split_off(shuffled.len() / 2);
    let dim = units.first().map_or(0, Vec::len);
    Node::Split {
        normal: vec![0.0; dim],
        left: Box::new(build_node(shuffled, units, rng)),
        right: Box::new(build_node(right, units, rng)),
    }
}

/// Traversal frontier entry, max-heap ordered by priority.
struct Pending<'a> {
    priority: f64,
    node: &'a Node,
}

impl PartialEq for Pending<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.priority.total_cmp(&other.priority) == Ordering::Equal
    }
}

impl Eq for Pending<'_> {}

impl PartialOrd for Pending<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority.total_cmp(&other.priority)
    }
}

/// Built, query-only index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AngularForest {
    dim: usize,
    ids: Vec<String>,
    vectors: Vec<Vec<f64>>,
    positions: HashMap<String, usize>,
    roots: Vec<Node>,
}

impl AngularForest {
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn n_trees(&self) -> usize {
        self.roots.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Up to `k` nearest items to `query`, closest first. Equal distances
    /// keep insertion order.
    pub fn nearest(&self, query: &[f64], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dim {
            anyhow::bail!(
                "Query has {} components, index dimension is {}",
                query.len(),
                self.dim
            );
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let search_k = self.roots.len() * k;
        let mut heap: BinaryHeap<Pending<'_>> = self
            .roots
            .iter()
            .map(|node| Pending {
                priority: f64::INFINITY,
                node,
            })
            .collect();

        let mut candidates: Vec<usize> = Vec::new();
        while candidates.len() < search_k {
            let Some(Pending { priority, node }) = heap.pop() else {
                break;
            };
            match node {
                Node::Leaf(items) => candidates.extend_from_slice(items),
                Node::Split {
                    normal,
                    left,
                    right,
                } => {
                    let margin = vector::dot(normal, query);
                    heap.push(Pending {
                        priority: priority.min(margin),
                        node: right,
                    });
                    heap.push(Pending {
                        priority: priority.min(-margin),
                        node: left,
                    });
                }
            }
        }

        candidates.sort_unstable();
        candidates.dedup();

        let mut scored: Vec<(usize, f64)> = candidates
            .into_iter()
            .map(|i| (i, vector::angular_distance(query, &self.vectors[i])))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, distance)| Neighbor {
                id: self.ids[i].clone(),
                distance,
            })
            .collect())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self).context("Failed to serialize index")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write index to {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read index from {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Invalid index file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_forest() -> AngularForest {
        let mut builder = ForestBuilder::new(2);
        builder.add_item("east", vec![1.0, 0.0]).unwrap();
        builder.add_item("north", vec![0.0, 1.0]).unwrap();
        builder.add_item("west", vec![-1.0, 0.0]).unwrap();
        builder.add_item("north-east", vec![1.0, 1.0]).unwrap();
        builder.build(10, 7)
    }

    #[test]
    fn test_nearest_orders_by_angle() {
        let forest = small_forest();
        let hits = forest.nearest(&[2.0, 0.1], 3).unwrap();
        let ids: Vec<&str> = hits.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["east", "north-east", "north"]);
        assert!(hits[0].distance < hits[1].distance);
    }

    #[test]
    fn test_nearest_truncates_to_item_count() {
        let forest = small_forest();
        assert_eq!(forest.nearest(&[1.0, 0.0], 10).unwrap().len(), 4);
    }

    #[test]
    fn test_zero_query_ties_keep_insertion_order() {
        let forest = small_forest();
        let hits = forest.nearest(&[0.0, 0.0], 4).unwrap();
        let ids: Vec<&str> = hits.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["east", "north", "west", "north-east"]);
        assert!(hits
            .iter()
            .all(|n| (n.distance - 2.0_f64.sqrt()).abs() < 1e-12));
    }

    #[test]
    fn test_dimension_checks() {
        let mut builder = ForestBuilder::new(3);
        assert!(builder.add_item("a", vec![1.0, 2.0]).is_err());
        builder.add_item("a", vec![1.0, 2.0, 3.0]).unwrap();
        let forest = builder.build(2, 1);
        assert!(forest.nearest(&[1.0], 1).is_err());
    }

    #[test]
    fn test_re_adding_replaces_vector() {
        let mut builder = ForestBuilder::new(2);
        builder.add_item("a", vec![1.0, 0.0]).unwrap();
        builder.add_item("b", vec![0.0, 1.0]).unwrap();
        builder.add_item("a", vec![0.0, 2.0]).unwrap();
        assert_eq!(builder.len(), 2);
        let forest = builder.build(1, 1);
        let hits = forest.nearest(&[0.0, 1.0], 2).unwrap();
        assert_eq!(hits[0].id, "a");
        assert!(hits[0].distance < 1e-6);
    }

    #[test]
    fn test_empty_forest_returns_nothing() {
        let forest = ForestBuilder::new(4).build(10, 1);
        assert!(forest.is_empty());
        assert!(forest.nearest(&[0.0; 4], 10).unwrap().is_empty());
    }

    #[test]
    fn test_large_forest_finds_exact_duplicate() {
        // Enough items to force real splits
        let mut builder = ForestBuilder::new(8);
        let mut rng = StdRng::seed_from_u64(3);
        let mut target = Vec::new();
        for i in 0..500 {
            let v: Vec<f64> = (0..8).map(|_| rng.random_range(-1.0..1.0)).collect();
            if i == 321 {
                target = v.clone();
            }
            builder.add_item(&format!("item-{i}"), v).unwrap();
        }
        let forest = builder.build(10, 99);
        assert_eq!(forest.n_trees(), 10);

        let hits = forest.nearest(&target, 5).unwrap();
        assert_eq!(hits.len(), 5);
        assert_eq!(hits[0].id, "item-321");
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_duplicate_vectors_still_build() {
        let mut builder = ForestBuilder::new(2);
        for i in 0..100 {
            builder.add_item(&i.to_string(), vec![1.0, 1.0]).unwrap();
        }
        let forest = builder.build(3, 5);
        assert_eq!(forest.nearest(&[1.0, 1.0], 10).unwrap().len(), 10);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join("coldprop-forest-test.json");
        let forest = small_forest();
        forest.save(&path).unwrap();
        let loaded = AngularForest::load(&path).unwrap();
        assert_eq!(
            loaded.nearest(&[1.0, 0.2], 2).unwrap(),
            forest.nearest(&[1.0, 0.2], 2).unwrap()
        );
        assert!(loaded.contains("north-east"));
        assert!(!loaded.contains("missing"));
        std::fs::remove_file(&path).unwrap();
    }
}
