// Embedding propagation: estimating an unseen item's embedding from the
// trained embeddings of its nearest known items.

pub mod aggregate;
pub mod weight;

pub use aggregate::{propagate, Propagated, PropagationError};
pub use weight::{InverseDistance, NeighborWeight, Uniform};
