// Vector math, sentence encoders and embedding-space mapping.

pub mod mapping;
pub mod sentence;
pub mod vector;
