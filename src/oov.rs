//! Out-of-vocabulary token resolution: edit-distance candidate generation,
//! an embedding-similarity store, a bigram context model, and the resolver
//! that combines them.

pub mod bigram;
pub mod edit_distance;
pub mod embedding;
pub mod resolver;
