use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::embedding::CandidateEmbedding;

/// A candidate together with its similarity to the reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    /// Candidate identifier (filename)
    pub id: String,
    /// Cosine similarity to the reference, in `[-1, 1]`
    pub score: f32,
}

/// Compute cosine similarity between two embeddings.
///
/// Equivalent to `1 - cosine_distance(a, b)`. Zero vectors have no direction,
/// so their similarity to anything is `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(AppError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let a = ArrayView1::from(a);
    let b = ArrayView1::from(b);
    let dot_product = a.dot(&b);
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();

    if norm_a > 0.0 && norm_b > 0.0 {
        Ok((dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0))
    } else {
        Ok(0.0)
    }
}

/// Drop scores below `threshold` and order the rest best-first.
///
/// The sort is stable, so equal scores keep their input order.
pub fn rank_scores(mut scores: Vec<ScoredCandidate>, threshold: f32) -> Result<Vec<ScoredCandidate>> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(AppError::InvalidInput(format!(
            "threshold must be within [0, 1], got {}",
            threshold
        )));
    }

    scores.retain(|s| s.score >= threshold);
    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(scores)
}

/// Score every candidate against `reference`, then filter and rank.
pub fn rank_by_similarity(
    reference: &[f32],
    candidates: &[CandidateEmbedding],
    threshold: f32,
) -> Result<Vec<ScoredCandidate>> {
    let scores = candidates
        .iter()
        .map(|candidate| {
            Ok(ScoredCandidate {
                id: candidate.id.clone(),
                score: cosine_similarity(reference, &candidate.embedding)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    rank_scores(scores, threshold)
}
