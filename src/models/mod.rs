//! Data models exchanged between the service and its clients

/// Embedding payloads returned by `/upload_image`.
pub mod embedding;
