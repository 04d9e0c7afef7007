//! Fonts and images loaded once per process and shared by every render.

use std::fs;
use std::path::Path;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use crate::error::ResourceLoadError;
use crate::models::config::ResourceConfig;

use super::font::{FontKind, FontProgram};

/// Decoded bitmap ready to be embedded as an image XObject.
#[derive(Debug, Clone)]
pub struct InlineImage {
    width: u32,
    height: u32,
    /// Interleaved 8-bit RGB samples.
    rgb: Vec<u8>,
    /// 8-bit alpha samples, present only when some pixel is not opaque.
    alpha: Option<Vec<u8>>,
}

impl InlineImage {
    /// Decode an image file (GIF, PNG, JPEG, ...).
    pub fn decode(name: &str, data: &[u8]) -> Result<Self, ResourceLoadError> {
        let image = image::load_from_memory(data).map_err(|e| ResourceLoadError::Image {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_image(&image))
    }

    /// Split a decoded image into color samples and an optional soft mask.
    pub fn from_image(image: &DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        let rgba = image.to_rgba8();

        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for pixel in rgba.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }

        let alpha = if alpha.iter().all(|&a| a == u8::MAX) {
            None
        } else {
            Some(alpha)
        };

        Self {
            width,
            height,
            rgb,
            alpha,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgb(&self) -> &[u8] {
        &self.rgb
    }

    pub fn alpha(&self) -> Option<&[u8]> {
        self.alpha.as_deref()
    }
}

/// Read-only rendering context: the three fonts and the amount-in-words mark.
#[derive(Debug, Clone)]
pub struct RenderResources {
    field_font: FontProgram,
    content_font: FontProgram,
    id_font: FontProgram,
    total_image: InlineImage,
}

impl RenderResources {
    /// Assemble resources that were loaded elsewhere.
    pub fn new(
        field_font: FontProgram,
        content_font: FontProgram,
        id_font: FontProgram,
        total_image: InlineImage,
    ) -> Self {
        Self {
            field_font,
            content_font,
            id_font,
            total_image,
        }
    }

    /// Load every asset named in `config` from `resource_dir`.
    ///
    /// Any missing or invalid asset fails the whole load.
    pub fn load(config: &ResourceConfig, resource_dir: &Path) -> Result<Self, ResourceLoadError> {
        info!("Loading rendering resources from {}", resource_dir.display());

        let field_font = load_font(resource_dir, &config.field_font)?;
        let content_font = load_font(resource_dir, &config.content_font)?;
        let id_font = load_font(resource_dir, &config.id_font)?;

        let image_path = resource_dir.join(&config.total_image);
        let image_data = read_asset(&image_path)?;
        let total_image = InlineImage::decode(&display_name(&image_path), &image_data)?;
        debug!(
            "Loaded image {} ({}x{})",
            image_path.display(),
            total_image.width(),
            total_image.height()
        );

        Ok(Self::new(field_font, content_font, id_font, total_image))
    }

    /// Font program for a font kind.
    pub fn font(&self, kind: FontKind) -> &FontProgram {
        match kind {
            FontKind::Field => &self.field_font,
            FontKind::Content => &self.content_font,
            FontKind::IdNumber => &self.id_font,
        }
    }

    /// Mark drawn before the amount in words.
    pub fn total_image(&self) -> &InlineImage {
        &self.total_image
    }

    /// Resources backed by synthetic fonts and a 4x4 bitmap with a transparent corner.
    #[cfg(test)]
    pub(crate) fn synthetic() -> Self {
        let mut bitmap = image::RgbaImage::from_pixel(4, 4, image::Rgba([200, 0, 0, 255]));
        bitmap.put_pixel(0, 0, image::Rgba([0, 0, 0, 0]));

        Self::new(
            FontProgram::synthetic("SyntheticKai"),
            FontProgram::synthetic("SyntheticSong"),
            FontProgram::synthetic("SyntheticMono"),
            InlineImage::from_image(&DynamicImage::ImageRgba8(bitmap)),
        )
    }
}

fn load_font(resource_dir: &Path, name: &Path) -> Result<FontProgram, ResourceLoadError> {
    let path = resource_dir.join(name);
    let data = read_asset(&path)?;
    let font = FontProgram::from_bytes(&display_name(&path), data)?;
    debug!("Loaded font {} from {}", font.name(), path.display());
    Ok(font)
}

fn read_asset(path: &Path) -> Result<Vec<u8>, ResourceLoadError> {
    if !path.is_file() {
        return Err(ResourceLoadError::NotFound(path.to_path_buf()));
    }
    fs::read(path).map_err(|source| ResourceLoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
