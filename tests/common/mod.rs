#![allow(dead_code)]

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use image_similarity::{AppError, Embedder, Result};
use ndarray::Array3;

/// Embeds each tensor as its three per-channel means.
#[derive(Debug, Default)]
pub struct ChannelMeans;

impl Embedder for ChannelMeans {
    fn embed(&self, inputs: &[Array3<f32>]) -> Result<Vec<Vec<f32>>> {
        Ok(inputs
            .iter()
            .map(|t| {
                t.outer_iter()
                    .map(|channel| channel.mean().unwrap_or_default())
                    .collect()
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        3
    }
}

/// Always fails, as a model hitting a numerical error would.
#[derive(Debug, Default)]
pub struct Broken;

impl Embedder for Broken {
    fn embed(&self, _inputs: &[Array3<f32>]) -> Result<Vec<Vec<f32>>> {
        Err(AppError::Processing("model produced non-finite activations".to_string()))
    }

    fn dimension(&self) -> usize {
        3
    }
}

pub fn solid_image(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
}

pub fn png_bytes(color: [u8; 3]) -> Vec<u8> {
    let mut bytes = Vec::new();
    solid_image(40, 30, color)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Hand-built `multipart/form-data` body.
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: "----image-similarity-test-boundary".to_string(),
            body: Vec::new(),
        }
    }

    pub fn file(mut self, field: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, field, filename, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn text(mut self, field: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, field, value
            )
            .as_bytes(),
        );
        self
    }

    /// Content type header value and the finished body
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.body,
        )
    }
}
