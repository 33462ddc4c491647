use image::{imageops, imageops::FilterType, DynamicImage, RgbImage};
use ndarray::Array3;

use crate::error::{AppError, Result};

/// Length the shorter image edge is resized to before cropping
pub const RESIZE_SHORTER_EDGE: u32 = 232;
/// Side of the square center crop fed to the network
pub const CROP_SIZE: u32 = 224;
/// Per-channel mean of the ImageNet training set (R, G, B)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// Per-channel standard deviation of the ImageNet training set (R, G, B)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Decode raw upload bytes into an image.
///
/// Any decoder failure is reported as [`AppError::InvalidImage`] with the
/// decoder's own message.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    let img = image::load_from_memory(bytes).map_err(|e| AppError::InvalidImage(e.to_string()))?;
    if img.width() == 0 || img.height() == 0 {
        return Err(AppError::InvalidImage("image has no pixels".to_string()));
    }
    Ok(img)
}

/// Resized images whose longer edge exceeds this are cropped before resizing
const MAX_DIRECT_RESIZE_EDGE: u64 = 4096;

/// Dimensions after scaling so the shorter edge equals `shorter`.
///
/// The longer edge is truncated, not rounded.
pub fn resized_dimensions(width: u32, height: u32, shorter: u32) -> (u64, u64) {
    let scale = |long: u32, short: u32| u64::from(shorter) * u64::from(long) / u64::from(short);
    if width <= height {
        (u64::from(shorter), scale(height, width))
    } else {
        (scale(width, height), u64::from(shorter))
    }
}

/// Leading offset of a centered window of `crop` inside `len`.
///
/// Half-pixel offsets round to even.
pub fn center_crop_offset(len: u64, crop: u32) -> u64 {
    let margin = len.saturating_sub(u64::from(crop)) as f64 / 2.0;
    margin.round_ties_even() as u64
}

/// Resize the whole image, then take the center crop.
fn resize_then_crop(img: &RgbImage, width: u32, height: u32) -> RgbImage {
    let resized = imageops::resize(img, width, height, FilterType::Triangle);
    let left = center_crop_offset(u64::from(width), CROP_SIZE) as u32;
    let top = center_crop_offset(u64::from(height), CROP_SIZE) as u32;
    imageops::crop_imm(&resized, left, top, CROP_SIZE, CROP_SIZE).to_image()
}

/// Source span `[start, end)` along an axis of `source_len` pixels that lands
/// on the center crop of the same axis resized to `resized_len`.
fn source_window(source_len: u32, resized_len: u64) -> (u32, u32) {
    let offset = center_crop_offset(resized_len, CROP_SIZE);
    let scale = f64::from(source_len) / resized_len as f64;
    let start = (offset as f64 * scale).floor() as u32;
    let end = ((offset + u64::from(CROP_SIZE)) as f64 * scale).ceil() as u32;
    let start = start.min(source_len - 1);
    (start, end.clamp(start + 1, source_len))
}

/// Crop the long axis to the part that survives the center crop, then resize
/// only that strip. Keeps memory bounded for extreme aspect ratios.
fn crop_then_resize(img: &RgbImage, width: u64, height: u64) -> RgbImage {
    let short = RESIZE_SHORTER_EDGE;
    let inset = center_crop_offset(u64::from(short), CROP_SIZE) as u32;

    if width <= height {
        let (y0, y1) = source_window(img.height(), height);
        let strip = imageops::crop_imm(img, 0, y0, img.width(), y1 - y0).to_image();
        let strip = imageops::resize(&strip, short, CROP_SIZE, FilterType::Triangle);
        imageops::crop_imm(&strip, inset, 0, CROP_SIZE, CROP_SIZE).to_image()
    } else {
        let (x0, x1) = source_window(img.width(), width);
        let strip = imageops::crop_imm(img, x0, 0, x1 - x0, img.height()).to_image();
        let strip = imageops::resize(&strip, CROP_SIZE, short, FilterType::Triangle);
        imageops::crop_imm(&strip, 0, inset, CROP_SIZE, CROP_SIZE).to_image()
    }
}

/// Turn a decoded image into a normalized `(3, 224, 224)` tensor.
///
/// The image is converted to RGB, its shorter edge resized to 232 pixels,
/// center-cropped to 224×224, scaled to `[0, 1]` and normalized per channel
/// with the ImageNet statistics. Layout is channel-major (C, H, W).
pub fn preprocess(img: &DynamicImage) -> Result<Array3<f32>> {
    if img.width() == 0 || img.height() == 0 {
        return Err(AppError::InvalidImage("image has no pixels".to_string()));
    }

    let rgb = img.to_rgb8();
    let (width, height) = resized_dimensions(rgb.width(), rgb.height(), RESIZE_SHORTER_EDGE);
    let cropped = if width.max(height) <= MAX_DIRECT_RESIZE_EDGE {
        resize_then_crop(&rgb, width as u32, height as u32)
    } else {
        crop_then_resize(&rgb, width, height)
    };

    let side = CROP_SIZE as usize;
    let tensor = Array3::from_shape_fn((3, side, side), |(c, y, x)| {
        let value = f32::from(cropped.get_pixel(x as u32, y as u32)[c]) / 255.0;
        (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c]
    });

    Ok(tensor)
}
