//! Client for the similarity service
//!
//! Uploads a reference image and a directory of candidates to
//! `/upload_image`, scores the returned embeddings against the reference and
//! renders the ranking.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use reqwest::{multipart, Client};

use crate::core::similarity::{rank_by_similarity, ScoredCandidate};
use crate::models::embedding::{CandidateEmbedding, UploadResponse};
use crate::utils;

/// Terminal and HTML rendering of ranked results.
pub mod report;

/// Default location of the service
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// HTTP client for the similarity service
#[derive(Debug, Clone)]
pub struct SimilarityClient {
    client: Client,
    base_url: String,
}

impl SimilarityClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Test connection with health check
    pub async fn health(&self) -> Result<bool> {
        let url = format!("{}/health_check", self.base_url);
        let resp = self.client.get(&url).send().await?;
        Ok(resp.status().is_success())
    }

    /// Upload a reference image and its candidates and return their embeddings
    pub async fn upload(&self, reference: &Path, candidates: &[PathBuf]) -> Result<UploadResponse> {
        let mut form = multipart::Form::new().part("reference_image", file_part(reference).await?);
        for candidate in candidates {
            form = form.part("images", file_part(candidate).await?);
        }

        let url = format!("{}/upload_image", self.base_url);
        log::debug!("Uploading {} candidate(s) to {}", candidates.len(), url);

        let resp = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("API request failed with status code {}: {}", status, body);
        }

        resp.json::<UploadResponse>()
            .await
            .context("malformed response from /upload_image")
    }
}

async fn file_part(path: &Path) -> Result<multipart::Part> {
    let file_name = file_name(path)?;
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    multipart::Part::bytes(data)
        .file_name(file_name.clone())
        .mime_str(&utils::mime_for(&file_name))
        .context("invalid MIME type")
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
        .with_context(|| format!("{} has no usable file name", path.display()))
}

/// List the candidate images in `dir`.
///
/// Only regular files with an image extension are returned, the file named
/// `reference_name` is skipped, and the result is sorted by file name.
pub fn collect_candidates(dir: &Path, reference_name: &str) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("cannot read directory {}", dir.display()))?;

    let mut candidates = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name == reference_name || !path.is_file() {
            continue;
        }
        if !utils::is_image_file(name) {
            log::debug!("Skipping non-image file {}", path.display());
            continue;
        }
        candidates.push(path);
    }

    candidates.sort();
    Ok(candidates)
}

/// Score the service's response against its reference embedding.
///
/// Candidate ids are reduced to their base file name before ranking.
pub fn score_response(response: &UploadResponse, threshold: f32) -> Result<Vec<ScoredCandidate>> {
    let candidates: Vec<CandidateEmbedding> = response
        .other_embeddings
        .iter()
        .map(|c| CandidateEmbedding {
            id: utils::base_name(&c.id).to_string(),
            embedding: c.embedding.clone(),
        })
        .collect();

    Ok(rank_by_similarity(
        &response.reference_embedding,
        &candidates,
        threshold,
    )?)
}
