// Approximate nearest-neighbor search over item vectors.

pub mod forest;

pub use forest::{AngularForest, ForestBuilder, Neighbor};
