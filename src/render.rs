//! Renders reply text onto templates.

mod fit;

pub use fit::{place, search, Fit, SIZE_STEP};

use crate::color::Color;
use crate::error::Result;
use crate::image::ImgBackend;
use crate::template::{Registry, Template};
use crate::text::{FontCache, TextPainter};

use base64::Engine;
use log::{debug, info};
use std::io::Cursor;
use std::sync::Arc;

/// An encoded PNG reply and how it was laid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub data: Vec<u8>,
    pub font_size: u32,
    pub lines: usize,
}

impl RenderedImage {
    /// Reader over the encoded image, positioned at its start.
    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(self.data.as_slice())
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// OneBot CQ code embedding the image inline.
    pub fn to_cq_code(&self) -> String {
        format!("[CQ:image,file=base64://{}]", self.to_base64())
    }
}

/// Owns the long lived state a render needs: templates, fonts and libvips.
pub struct Renderer {
    registry: Arc<Registry>,
    fonts: Arc<FontCache>,
    backend: ImgBackend,
}

impl Renderer {
    pub fn new(registry: Arc<Registry>, fonts: Arc<FontCache>) -> Result<Self> {
        Ok(Self {
            registry,
            fonts,
            backend: ImgBackend::new()?,
        })
    }

    /// Loads the registry in `root` and starts with an empty font cache.
    pub fn open(root: impl Into<std::path::PathBuf>) -> Result<Self> {
        let registry = Registry::open(root)?;
        info!("using assets in {}", registry.root().display());
        Self::new(Arc::new(registry), Arc::new(FontCache::new()))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn fonts(&self) -> &FontCache {
        &self.fonts
    }

    pub fn render_id(&self, id: &str, text: &str, color: Color) -> Result<RenderedImage> {
        let template = self.registry.lookup(id)?;
        self.render(template, text, color)
    }

    /// Fits `text` into the template's text area and draws it on the base image.
    ///
    /// Text that overflows even at the minimum size is still drawn.
    pub fn render(&self, template: &Template, text: &str, color: Color) -> Result<RenderedImage> {
        // registers the font file before the pango context is created
        self.fonts
            .get(&template.font_path, template.max_font_size)?;

        TextPainter::with_thread_local(|painter| {
            let fit = search(template, text, |size| {
                let font = self.fonts.get(&template.font_path, size)?;
                Ok(painter.layout(&font, template.align))
            })?;
            let origin = fit.origin(template);
            debug!(
                "template `{}`: {} line(s) at {}px, origin {origin:?}",
                template.id,
                fit.line_count(),
                fit.font_size
            );

            let data = self
                .backend
                .composite(&template.path, &fit.text, &fit.measure, origin, color)?;
            Ok(RenderedImage {
                data,
                font_size: fit.font_size,
                lines: fit.line_count(),
            })
        })
    }
}
