//! Core functionality: preprocessing, embedding and similarity scoring

/// Batching a reference with its candidates for a single inference call.
pub mod batch;
/// Pretrained classifier used as an embedding generator.
pub mod embeddings;
/// Image decoding and normalization to the network's input distribution.
pub mod preprocess;
/// Cosine similarity and threshold ranking.
pub mod similarity;
