use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use std::sync::Arc;

use crate::{
    core::batch::{embed_uploads, NamedImage},
    error::{AppError, Result},
    models::embedding::UploadResponse,
    AppState,
};

use super::responses::{HealthResponse, MessageResponse};

/// Multipart field carrying the reference image
pub const REFERENCE_FIELD: &str = "reference_image";
/// Multipart field carrying each candidate image
pub const CANDIDATES_FIELD: &str = "images";

/// `GET /`
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::hello())
}

/// `GET /health_check`
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// `POST /upload_image`
///
/// Accepts one `reference_image` part and one or more `images` parts, embeds
/// them all in a single batch and answers with the reference embedding plus
/// one `{id, embedding}` entry per candidate, in upload order.
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let mut multipart = multipart?;
    let mut reference = None;
    let mut candidates = Vec::new();

    // Fields are streamed off the connection; nothing here blocks the runtime.
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            REFERENCE_FIELD if reference.is_none() => {
                reference = Some(field.bytes().await?);
            }
            REFERENCE_FIELD => {
                log::debug!("Ignoring extra {} field", REFERENCE_FIELD);
            }
            CANDIDATES_FIELD => {
                let id = field.file_name().unwrap_or("").to_string();
                let bytes = field.bytes().await?;
                candidates.push(NamedImage { id, bytes });
            }
            other => {
                log::debug!("Ignoring unexpected multipart field {:?}", other);
            }
        }
    }

    let reference = reference.ok_or(AppError::MissingField(REFERENCE_FIELD))?;
    if candidates.is_empty() {
        return Err(AppError::MissingField(CANDIDATES_FIELD));
    }

    log::info!(
        "Embedding reference image and {} candidate(s)",
        candidates.len()
    );

    let embedder = Arc::clone(&state.embedder);
    let batch = tokio::task::spawn_blocking(move || {
        embed_uploads(embedder.as_ref(), &reference, candidates)
    })
    .await??;

    Ok(Json(UploadResponse {
        reference_embedding: batch.reference,
        other_embeddings: batch.candidates,
    }))
}
