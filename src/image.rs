//! Image backend: opens template images, composites text and encodes the result.

use crate::color::Color;
use crate::error::{Error, Result};
use crate::text::{Measure, TextLayout};

use cairo::ImageSurface;
use libvips::{ops, VipsApp, VipsImage};
use log::debug;
use once_cell::sync::OnceCell;
use std::path::Path;

static VIPS_APP: OnceCell<VipsApp> = OnceCell::new();

/// Handle to the process wide libvips instance.
///
/// libvips is started the first time a backend is created and stays up for the
/// rest of the process; every backend shares it.
#[derive(Clone, Copy)]
pub struct ImgBackend {
    vips_app: &'static VipsApp,
}

impl ImgBackend {
    pub fn new() -> Result<Self> {
        let vips_app = VIPS_APP.get_or_try_init(|| {
            VipsApp::default("replycard").map_err(|e| Error::VipsError(e.to_string()))
        })?;
        Ok(Self { vips_app })
    }

    pub fn err(&self, e: libvips::error::Error) -> Error {
        Error::VipsError(format!(
            "{e}\n{}",
            self.vips_app.error_buffer().unwrap_or_default()
        ))
    }

    /// Converts any image to 8 bit sRGB with an alpha band.
    fn reinterpret(&self, img: &VipsImage) -> Result<VipsImage> {
        let img = if img.get_bands() < 3 {
            let srgb = ops::colourspace(img, ops::Interpretation::Srgb).map_err(|e| self.err(e))?;
            ops::cast(&srgb, ops::BandFormat::Uchar).map_err(|e| self.err(e))?
        } else {
            ops::cast(img, ops::BandFormat::Uchar).map_err(|e| self.err(e))?
        };
        let img = ops::copy_with_opts(
            &img,
            &ops::CopyOptions {
                interpretation: ops::Interpretation::Srgb,
                width: img.get_width(),
                height: img.get_height(),
                bands: img.get_bands(),
                format: ops::BandFormat::Uchar,
                ..Default::default()
            },
        )
        .map_err(|e| self.err(e))?;
        if img.get_bands() == 3 {
            ops::bandjoin_const(&img, &mut [255.0]).map_err(|e| self.err(e))
        } else {
            Ok(img)
        }
    }

    pub fn open(&self, fp: impl AsRef<Path>) -> Result<VipsImage> {
        let fp = fp.as_ref();
        if !fp.is_file() {
            return Err(Error::open_image(fp, "no such file"));
        }
        let img = VipsImage::new_from_file(&fp.to_string_lossy())
            .map_err(|e| Error::open_image(fp, self.err(e)))?;
        self.reinterpret(&img)
    }

    pub fn cairo_to_vips(&self, img: ImageSurface) -> Result<VipsImage> {
        let mut buffer = Vec::new();
        img.write_to_png(&mut buffer)
            .map_err(|_| Error::ImageConversionError("cairo", "vips"))?;
        let mut img = VipsImage::new_from_buffer(&buffer, "").map_err(|e| self.err(e))?;
        img.image_wio_input().map_err(|e| self.err(e))?;
        self.reinterpret(&img)
    }

    /// Blends `src` over `base` with its top left corner at `(x, y)`.
    pub fn overlay(&self, base: &VipsImage, src: &VipsImage, x: i32, y: i32) -> Result<VipsImage> {
        let (bw, bh) = (base.get_width(), base.get_height());
        let src = ops::embed(src, x, y, bw, bh).map_err(|e| self.err(e))?;
        ops::composite_2(base, &src, ops::BlendMode::Over).map_err(|e| self.err(e))
    }

    pub fn encode_png(&self, img: &VipsImage) -> Result<Vec<u8>> {
        ops::pngsave_buffer(img).map_err(|e| self.err(e))
    }

    /// Draws `text` with `layout` at `origin` on the image at `base` and returns it as PNG.
    ///
    /// Empty text leaves the base image untouched.
    pub fn composite(
        &self,
        base: impl AsRef<Path>,
        text: &str,
        layout: &TextLayout,
        origin: (f64, f64),
        color: Color,
    ) -> Result<Vec<u8>> {
        let base = self.open(base)?;
        let img = if text.is_empty() {
            base
        } else {
            let surface = layout.paint(text, color)?;
            let text_img = self.cairo_to_vips(surface)?;
            let (x, y) = (origin.0.round() as i32, origin.1.round() as i32);
            debug!(
                "compositing {:?} text block at ({x}, {y})",
                layout.size(text)
            );
            self.overlay(&base, &text_img, x, y)?
        };
        self.encode_png(&img)
    }
}
