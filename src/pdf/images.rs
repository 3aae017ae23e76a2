//! Image lookup for markdown image links.
//!
//! Only uploaded media is embedded: links under `/media/`, either
//! root-relative or prefixed with the public base URL. Anything else,
//! and any file that cannot be read or decoded, falls back to alt text.

use std::path::{Component, Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage};

use crate::config::UploadConfig;

/// URL path prefix of served media.
const MEDIA_PATH: &str = "/media/";

/// Resolves image links to decoded images.
pub trait ImageSource {
    /// Load the image a link points at, or `None` to show its alt text.
    fn load(&self, src: &str) -> Option<DynamicImage>;
}

/// Never resolves anything; every image renders as alt text.
pub struct NoImages;

impl ImageSource for NoImages {
    fn load(&self, _src: &str) -> Option<DynamicImage> {
        None
    }
}

/// Reads uploaded files from the media directory.
#[derive(Clone, Debug)]
pub struct MediaImages {
    media_dir: PathBuf,
    public_base_url: Option<String>,
}

impl MediaImages {
    /// Resolve links the way uploads are published.
    #[must_use]
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            media_dir: config.media_dir.clone(),
            public_base_url: config
                .public_base_url
                .as_deref()
                .map(|base| base.trim_end_matches('/').to_string()),
        }
    }

    /// File path a link maps to, if it addresses the media directory.
    fn path_for(&self, src: &str) -> Option<PathBuf> {
        let src = src.trim();
        let path = self
            .public_base_url
            .as_deref()
            .filter(|base| !base.is_empty())
            .and_then(|base| src.strip_prefix(base))
            .unwrap_or(src);
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let relative = Path::new(path.strip_prefix(MEDIA_PATH)?);

        // Reject `..`, absolute and prefixed components.
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.media_dir.join(relative))
    }
}

impl ImageSource for MediaImages {
    fn load(&self, src: &str) -> Option<DynamicImage> {
        let path = self.path_for(src)?;
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Cannot read image {}: {e}", path.display());
                return None;
            }
        };
        match image::load_from_memory(&bytes) {
            Ok(img) => Some(flatten_alpha(&img)),
            Err(e) => {
                tracing::warn!("Cannot decode image {}: {e}", path.display());
                None
            }
        }
    }
}

/// Composite transparent pixels onto white; PDF image objects are drawn opaque.
#[must_use]
pub fn flatten_alpha(img: &DynamicImage) -> DynamicImage {
    if !img.color().has_alpha() {
        return DynamicImage::ImageRgb8(img.to_rgb8());
    }

    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    DynamicImage::ImageRgb8(out)
}
