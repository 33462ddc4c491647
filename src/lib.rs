#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

//! # Image Similarity
//!
//! Visual-similarity embeddings for a reference image against a set of
//! candidate images, using a pretrained ResNet-50 classifier as a feature
//! extractor, served over HTTP with a companion visualization client.
//!
//! ## Features
//!
//! - **Preprocessing**: decode any supported image and normalize it to the
//!   network's expected input distribution
//! - **Embeddings**: raw final-layer activations of a frozen ResNet-50
//! - **Similarity**: cosine similarity with threshold filtering and ranking
//! - **Web API**: `/upload_image` endpoint returning embeddings as JSON
//! - **Client**: CLI that ranks a directory against a reference and renders
//!   a table and an HTML chart
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use image_similarity::{cosine_similarity, preprocess, EmbeddingModel, Embedder, DevicePreference};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let model = EmbeddingModel::load("resnet50.ot", DevicePreference::Auto)?;
//!     let a = preprocess::preprocess(&image::open("cat.jpg")?)?;
//!     let b = preprocess::preprocess(&image::open("dog.jpg")?)?;
//!     let embeddings = model.embed(&[a, b])?;
//!     println!("similarity: {:.2}", cosine_similarity(&embeddings[0], &embeddings[1])?);
//!     Ok(())
//! }
//! ```

// Internal modules
pub mod api;
#[cfg(feature = "client")]
pub mod client;
pub mod core;
/// Defines the application's error types and result aliases.
pub mod error;
pub mod models;
mod state;
#[cfg(feature = "client")]
mod utils;

/// Build-time information generated by `build.rs`
#[allow(missing_docs, unreachable_pub, dead_code)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

// Public API exports
pub use crate::{
    core::{
        batch::{embed_uploads, BatchEmbeddings, NamedImage},
        embeddings::{Embedder, RESNET50_OUTPUT_DIM},
        preprocess,
        similarity::{cosine_similarity, rank_by_similarity, rank_scores, ScoredCandidate},
    },
    error::{AppError, Result, ResultExt},
    models::embedding::{CandidateEmbedding, UploadResponse},
    state::{AppState, Config, DevicePreference},
};

#[cfg(feature = "web")]
pub use crate::api::{create_router, health_check, root, upload_image};

#[cfg(feature = "embeddings")]
pub use crate::core::embeddings::EmbeddingModel;

/// Initialize the application with default settings
///
/// This function sets up logging. It should be called early in the
/// application startup process, and only once.
///
/// # Errors
///
/// Returns an error if a logger has already been installed.
///
/// # Example
///
/// ```no_run
/// use image_similarity::init;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     init()?;
///     // Application code here
///     Ok(())
/// }
/// ```
pub fn init() -> Result<()> {
    // Initialize logging with sensible defaults
    let env = env_logger::Env::default()
        .default_filter_or("info")
        .default_write_style_or("auto");

    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .format_module_path(false)
        .format_target(false)
        .try_init()
        .map_err(|e| AppError::Config(format!("logger already initialized: {}", e)))?;

    log::info!(
        "Initializing {} {} ({})",
        built_info::PKG_NAME,
        built_info::PKG_VERSION,
        built_info::PROFILE
    );

    Ok(())
}
