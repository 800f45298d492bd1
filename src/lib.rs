// coldprop: cold-start item embedding propagation
//
// Estimates embeddings for items with no interaction history by finding
// similar known items through their keywords and averaging those items'
// trained embeddings. Each module is one stage of that pipeline.

pub mod concepts;
pub mod config;
pub mod data;
pub mod embedding;
pub mod export;
pub mod index;
pub mod keywords;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod propagation;
pub mod vsm;
