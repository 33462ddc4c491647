use serde::{Deserialize, Serialize};

/// Embedding of one candidate image, tagged with its upload filename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEmbedding {
    /// Filename the image was uploaded under
    pub id: String,
    /// Raw activations of the classifier's final layer
    pub embedding: Vec<f32>,
}

/// Successful response body of `POST /upload_image`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Embedding of the reference image
    pub reference_embedding: Vec<f32>,
    /// Candidate embeddings, in upload order
    pub other_embeddings: Vec<CandidateEmbedding>,
}
