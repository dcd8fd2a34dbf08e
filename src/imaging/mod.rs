//! Image loading and frame quality.

pub mod sharpness;

use std::path::Path;

use anyhow::{Context, Result, bail};
use opencv::core::{Mat, Size};
use opencv::prelude::*;
use opencv::{imgcodecs, imgproc};
use serde::{Deserialize, Serialize};

pub use sharpness::laplacian_variance;

/// File extensions treated as images when scanning directories.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Target size frames and map images are resized to before matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: i32,
    pub height: i32,
}

/// Read an image as 8-bit grayscale.
pub fn load_gray(path: &Path, size: Option<ImageSize>) -> Result<Mat> {
    load(path, imgcodecs::IMREAD_GRAYSCALE, size)
}

/// Read an image as 8-bit BGR.
pub fn load_color(path: &Path, size: Option<ImageSize>) -> Result<Mat> {
    load(path, imgcodecs::IMREAD_COLOR, size)
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn load(path: &Path, flags: i32, size: Option<ImageSize>) -> Result<Mat> {
    let path_str = path
        .to_str()
        .with_context(|| format!("Image path is not valid UTF-8: {:?}", path))?;
    let image = imgcodecs::imread(path_str, flags)
        .with_context(|| format!("Failed to read image {:?}", path))?;
    // imread signals a missing or undecodable file with an empty Mat
    if image.rows() == 0 || image.cols() == 0 {
        bail!("Image {:?} is empty or could not be decoded", path);
    }

    match size {
        Some(size) if size.width != image.cols() || size.height != image.rows() => {
            let mut resized = Mat::default();
            imgproc::resize(
                &image,
                &mut resized,
                Size::new(size.width, size.height),
                0.0,
                0.0,
                imgproc::INTER_AREA,
            )
            .with_context(|| format!("Failed to resize image {:?}", path))?;
            Ok(resized)
        }
        _ => Ok(image),
    }
}
