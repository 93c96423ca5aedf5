//! Texture loading utilities

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView};
use std::path::Path;

/// Load an equirectangular Earth texture from a file path
pub fn load_texture(path: impl AsRef<Path>) -> Result<egui::ColorImage> {
    let path = path.as_ref();
    log::info!("Loading texture: {:?}", path);

    let img = image::open(path).with_context(|| format!("Failed to load texture: {:?}", path))?;

    Ok(color_image(img))
}

/// Convert a decoded image into egui's RGBA layout
pub fn color_image(img: DynamicImage) -> egui::ColorImage {
    let (width, height) = img.dimensions();
    let rgba = img.to_rgba8();
    egui::ColorImage::from_rgba_unmultiplied([width as usize, height as usize], rgba.as_raw())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_image_dimensions() {
        let img = DynamicImage::new_rgba8(4, 2);
        let color = color_image(img);
        assert_eq!(color.size, [4, 2]);
        assert_eq!(color.pixels.len(), 8);
    }

    #[test]
    fn test_missing_texture_is_error() {
        let err = load_texture("does/not/exist.png").unwrap_err();
        assert!(err.to_string().contains("Failed to load texture"));
    }
}
