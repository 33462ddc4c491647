//! Similarity client - rank a directory of images against a reference
//!
//! Sends the images to the similarity service, scores the returned
//! embeddings and prints (or writes) the ranking.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use image_similarity::client::{
    collect_candidates, report, score_response, SimilarityClient, DEFAULT_API_URL,
};

#[derive(Parser)]
#[command(name = "similarity-client")]
#[command(about = "Rank images by visual similarity to a reference image", long_about = None)]
#[command(version)]
struct Cli {
    /// Base URL of the similarity service
    #[arg(long, env = "SIMILARITY_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Reference image
    #[arg(short, long)]
    reference: PathBuf,

    /// Directory containing the images to compare
    #[arg(short, long)]
    dir: PathBuf,

    /// Minimum similarity score to show, between 0 and 1
    #[arg(short, long, default_value_t = 0.5, value_parser = parse_threshold)]
    threshold: f32,

    /// Write an HTML report with thumbnails and a score chart
    #[arg(long)]
    html: Option<PathBuf>,

    /// Print the ranking as JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn parse_threshold(value: &str) -> Result<f32, String> {
    let threshold: f32 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(format!("{} is outside [0, 1]", threshold))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    image_similarity::init()?;
    let cli = Cli::parse();

    let reference_name = cli
        .reference
        .file_name()
        .and_then(|n| n.to_str())
        .context("reference path has no file name")?
        .to_string();

    let candidates = collect_candidates(&cli.dir, &reference_name)?;
    if candidates.is_empty() {
        bail!("no candidate images found in {}", cli.dir.display());
    }

    let client = SimilarityClient::new(&cli.api_url);
    if !client.health().await.unwrap_or(false) {
        log::warn!("Health check against {} failed, trying anyway", cli.api_url);
    }

    let response = client.upload(&cli.reference, &candidates).await?;
    let ranked = score_response(&response, cli.threshold)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
    } else if ranked.is_empty() {
        println!("{}", report::NO_MATCHES);
    } else {
        println!("{}", report::render_table(&ranked));
    }

    if let Some(path) = cli.html {
        let html = report::render_html(&cli.reference, &cli.dir, &ranked)?;
        std::fs::write(&path, html)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}
