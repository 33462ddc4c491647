//! Utility functions and helpers for the image similarity application

use std::path::Path;

/// Image file extensions the client will send to the service
pub(crate) const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp"];

/// Validate that a file has an allowed extension
pub(crate) fn validate_file_extension(filename: &str, allowed_extensions: &[&str]) -> bool {
    if let Some(ext) = Path::new(filename).extension() {
        if let Some(ext_str) = ext.to_str() {
            return allowed_extensions
                .iter()
                .any(|&e| e.eq_ignore_ascii_case(ext_str));
        }
    }
    false
}

/// Whether `filename` looks like an image the service can decode
pub(crate) fn is_image_file(filename: &str) -> bool {
    validate_file_extension(filename, IMAGE_EXTENSIONS)
}

/// Last path component of an upload id, accepting either separator
pub(crate) fn base_name(id: &str) -> &str {
    id.rsplit(['/', '\\']).next().unwrap_or(id)
}

/// MIME type to declare for an uploaded file
pub(crate) fn mime_for(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
