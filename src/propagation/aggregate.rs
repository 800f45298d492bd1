// Similarity-weighted averaging of neighbor embeddings.
//
// Neighbors are found in the label (concept) space but the values averaged
// here come from a different table, usually the trained item embeddings. A
// neighbor id missing from that table was dropped from training for lack of
// interactions; it is skipped and contributes neither weight nor vector.
//
//   result = sum(w_i * v_i) / sum(w_i)   over resolvable neighbors i

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, warn};

use super::weight::NeighborWeight;
use crate::index::Neighbor;

#[derive(Debug, Error, PartialEq)]
pub enum PropagationError {
    /// No neighbor had an embedding, or every weight was zero
    #[error("no resolvable neighbors among {candidates} candidates")]
    NoResolvableNeighbors { candidates: usize },

    #[error("embedding for {id} has {found} components, expected {expected}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        found: usize,
    },

    #[error("weight {weight} for neighbor {id} is negative or not finite")]
    InvalidWeight { id: String, weight: f64 },
}

/// Outcome of a successful propagation.
#[derive(Debug, Clone, PartialEq)]
pub struct Propagated {
    pub vector: Vec<f64>,
    /// Ids that contributed, in neighbor-list order
    pub contributors: Vec<String>,
    /// Each contributor's weight divided by the total weight
    pub weights: Vec<f64>,
}

/// Weighted average of the neighbors' embeddings.
pub fn propagate(
    neighbors: &[Neighbor],
    embeddings: &HashMap<String, Vec<f64>>,
    weight_fn: &dyn NeighborWeight,
) -> Result<Propagated, PropagationError> {
    let mut accumulated: Vec<f64> = Vec::new();
    let mut total_weight = 0.0;
    let mut contributors = Vec::new();
    let mut raw_weights = Vec::new();

    for neighbor in neighbors {
        let Some(vector) = embeddings.get(&neighbor.id) else {
            warn!(
                id = %neighbor.id,
                "Neighbor has no trained embedding, skipping"
            );
            continue;
        };

        let weight = weight_fn.weight(neighbor.distance);
        if !weight.is_finite() || weight < 0.0 {
            return Err(PropagationError::InvalidWeight {
                id: neighbor.id.clone(),
                weight,
            });
        }

        if contributors.is_empty() {
            accumulated = vec![0.0; vector.len()];
        } else if vector.len() != accumulated.len() {
            return Err(PropagationError::DimensionMismatch {
                id: neighbor.id.clone(),
                expected: accumulated.len(),
                found: vector.len(),
            });
        }

        for (acc, &value) in accumulated.iter_mut().zip(vector) {
            *acc += value * weight;
        }
        total_weight += weight;
        contributors.push(neighbor.id.clone());
        raw_weights.push(weight);
    }

    if contributors.is_empty() || total_weight <= 0.0 {
        return Err(PropagationError::NoResolvableNeighbors {
            candidates: neighbors.len(),
        });
    }

    for value in &mut accumulated {
        *value /= total_weight;
    }
    let weights: Vec<f64> = raw_weights.iter().map(|w| w / total_weight).collect();

    debug!(weights = ?weights, "Normalized neighbor weights");
    debug!(related = contributors.len(), "Propagated from related items");

    Ok(Propagated {
        vector: accumulated,
        contributors,
        weights,
    })
}
