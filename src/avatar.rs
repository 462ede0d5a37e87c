//! Avatar uploads: multipart acceptance and image normalisation.

use std::io::Cursor;

use actix_multipart::Multipart;
use futures::TryStreamExt;
use image::{imageops::FilterType, ImageFormat};
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

/// Multipart field carrying the image.
pub const AVATAR_FIELD: &str = "avatar";
/// Largest accepted upload, in bytes.
pub const MAX_AVATAR_BYTES: usize = 2_000_000;
/// Stored avatars are square PNGs of this edge length.
pub const AVATAR_EDGE: u32 = 250;
pub const AVATAR_CONTENT_TYPE: &str = "image/png";

lazy_static! {
    static ref IMAGE_FILENAME: Regex = Regex::new(r"(?i)\.(jpg|jpeg|png)$").unwrap();
}

fn unsupported_file() -> AppError {
    AppError::BadRequest("Please upload an image. Only JPG/JPEG/PNG files supported".into())
}

/// Reads the `avatar` field from a multipart body, enforcing the filename and size rules.
pub async fn read_upload(mut payload: Multipart) -> Result<Vec<u8>, AppError> {
    while let Some(mut field) = payload.try_next().await? {
        let (name, filename) = {
            let disposition = field.content_disposition();
            (
                disposition.get_name().map(str::to_string),
                disposition.get_filename().map(str::to_string),
            )
        };
        if name.as_deref() != Some(AVATAR_FIELD) {
            continue;
        }
        match filename {
            Some(filename) if IMAGE_FILENAME.is_match(&filename) => {}
            _ => return Err(unsupported_file()),
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if bytes.len() + chunk.len() > MAX_AVATAR_BYTES {
                return Err(AppError::BadRequest("File too large".into()));
            }
            bytes.extend_from_slice(&chunk);
        }
        return Ok(bytes);
    }

    Err(unsupported_file())
}

/// Decodes an uploaded image, cover-resizes it to a square and re-encodes it as PNG.
/// CPU-bound: run it through `web::block`.
pub fn normalize(bytes: &[u8]) -> Result<Vec<u8>, AppError> {
    let image = image::load_from_memory(bytes)?;
    let resized = image.resize_to_fill(AVATAR_EDGE, AVATAR_EDGE, FilterType::Triangle);

    let mut encoded = Cursor::new(Vec::new());
    resized
        .write_to(&mut encoded, ImageFormat::Png)
        .map_err(|e| AppError::InternalServerError(format!("Failed to encode avatar: {}", e)))?;
    Ok(encoded.into_inner())
}
