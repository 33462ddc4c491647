//! Batch-then-split: the reference and its candidates share one inference call.

use bytes::Bytes;

use crate::core::{embeddings::Embedder, preprocess};
use crate::error::{AppError, Result};
use crate::models::embedding::CandidateEmbedding;

/// An uploaded file waiting to be embedded
#[derive(Debug, Clone)]
pub struct NamedImage {
    /// Identifier reported back with the embedding (the upload filename)
    pub id: String,
    /// Undecoded file contents
    pub bytes: Bytes,
}

/// Embeddings for one request, split back into reference and candidates
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEmbeddings {
    /// Embedding of the reference image
    pub reference: Vec<f32>,
    /// Candidate embeddings, in the order the candidates were given
    pub candidates: Vec<CandidateEmbedding>,
}

/// Decode, preprocess and embed a reference image with its candidates.
///
/// The batch is laid out as `[reference, candidates...]` and embedded with a
/// single call; index 0 of the result is the reference and indices `1..=N`
/// line up with `candidates`. Any failure aborts the whole batch.
pub fn embed_uploads(
    embedder: &dyn Embedder,
    reference: &[u8],
    candidates: Vec<NamedImage>,
) -> Result<BatchEmbeddings> {
    let mut batch = Vec::with_capacity(candidates.len() + 1);
    batch.push(preprocess::preprocess(&preprocess::decode_image(reference)?)?);
    for candidate in &candidates {
        let img = preprocess::decode_image(&candidate.bytes)?;
        batch.push(preprocess::preprocess(&img)?);
    }

    let embeddings = embedder.embed(&batch)?;
    if embeddings.len() != batch.len() {
        return Err(AppError::Processing(format!(
            "embedder returned {} vectors for {} images",
            embeddings.len(),
            batch.len()
        )));
    }

    let dimension = embedder.dimension();
    if let Some(bad) = embeddings.iter().find(|e| e.len() != dimension) {
        return Err(AppError::DimensionMismatch {
            expected: dimension,
            actual: bad.len(),
        });
    }

    // [0] is the reference, [1..=N] the candidates
    let mut embeddings = embeddings;
    let others = embeddings.split_off(1);
    let reference = embeddings
        .pop()
        .ok_or_else(|| AppError::Processing("empty embedding batch".to_string()))?;
    let candidates = candidates
        .into_iter()
        .zip(others)
        .map(|(image, embedding)| CandidateEmbedding {
            id: image.id,
            embedding,
        })
        .collect();

    Ok(BatchEmbeddings {
        reference,
        candidates,
    })
}
