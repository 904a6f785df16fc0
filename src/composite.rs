use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{Rgb, RgbImage};
use rayon::prelude::*;
use tracing::warn;

pub static SUPPORTED_IMAGE_EXTS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp"];

fn has_extension(path: &Path, exts: &[&str]) -> bool {
    let Some(ext) = path.extension().map(|e| e.to_string_lossy()) else {
        return false;
    };
    exts.iter().any(|known| ext.eq_ignore_ascii_case(known))
}

/// Returns `true` if the path has an extension the composite builder accepts.
pub fn is_supported_image(path: &Path) -> bool {
    has_extension(path, SUPPORTED_IMAGE_EXTS)
}

/// Decode `path` into an RGB buffer.
pub fn open_image(path: &Path) -> anyhow::Result<RgbImage> {
    Ok(image::open(path)?.into_rgb8())
}

/// Height after scaling `width x height` to `target_width`, truncated.
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    if width == 0 {
        return 0;
    }
    ((height as u64 * target_width as u64) / width as u64) as u32
}

/// Resize to `target_width`, preserving aspect ratio.
pub fn resize_to_width(img: &RgbImage, target_width: u32, filter: FilterType) -> RgbImage {
    let new_h = scaled_height(img.width(), img.height(), target_width).max(1);
    if img.width() == target_width && img.height() == new_h {
        return img.clone();
    }
    image::imageops::resize(img, target_width, new_h, filter)
}

/// Stack same-width buffers top to bottom on a white canvas.
///
/// Returns `None` when there is nothing to stack.
pub fn stack(parts: &[RgbImage], width: u32) -> Option<RgbImage> {
    let total: u32 = parts.iter().map(|p| p.height()).sum();
    if total == 0 || width == 0 {
        return None;
    }
    let mut canvas = RgbImage::from_pixel(width, total, Rgb([255, 255, 255]));
    let mut y = 0i64;
    for part in parts {
        image::imageops::replace(&mut canvas, part, 0, y);
        y += part.height() as i64;
    }
    Some(canvas)
}

fn build_composite_with<F>(paths: &[PathBuf], width: u32, open: F) -> Option<RgbImage>
where
    F: Fn(&Path) -> anyhow::Result<RgbImage> + Sync,
{
    let parts: Vec<Option<RgbImage>> = paths
        .par_iter()
        .map(|path| match open(path) {
            Ok(img) if img.width() > 0 => Some(resize_to_width(&img, width, FilterType::Lanczos3)),
            Ok(_) => {
                warn!(path = %path.display(), "skipping zero-width image");
                None
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable image");
                None
            }
        })
        .collect();
    let parts: Vec<RgbImage> = parts.into_iter().flatten().collect();
    stack(&parts, width)
}

/// Decode, resize and stack `paths` in order. Unreadable files are skipped.
pub fn build_composite(paths: &[PathBuf], width: u32) -> Option<RgbImage> {
    build_composite_with(paths, width, open_image)
}
