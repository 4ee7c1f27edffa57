//! Text measurement and drawing through pango.

use crate::color::Color;
use crate::error::{Error, Result};
use crate::template::Align;
use crate::text::font::{FcFontLoader, Font};
use crate::text::wrap::Measure;

use cairo::ImageSurface;
use log::debug;
use pango::prelude::FontMapExt;
use std::cell::RefCell;
use std::thread;

/// Vertical gap between lines of a block, in pixels.
pub const LINE_SPACING: i32 = 4;

thread_local! {
    static PAINTER: RefCell<Reusable<TextPainter>> = const { RefCell::new(Reusable::new()) };
}

/// A value kept until the generation it was built for moves on.
struct Reusable<P> {
    generation: usize,
    value: Option<P>,
}

impl<P> Reusable<P> {
    const fn new() -> Self {
        Self {
            generation: 0,
            value: None,
        }
    }

    fn get_or_try_rebuild(
        &mut self,
        generation: usize,
        build: impl FnOnce() -> Result<P>,
    ) -> Result<&P> {
        if self.generation != generation {
            self.value = None;
        }
        let value = match self.value.take() {
            Some(value) => value,
            None => build()?,
        };
        self.generation = generation;
        Ok(self.value.insert(value))
    }
}

/// A pango context bound to the thread that created it.
///
/// Creating the context picks up every font registered with fontconfig so far,
/// so a painter should be created after the fonts it will use are loaded.
pub struct TextPainter {
    ctx: pango::Context,
}

impl TextPainter {
    /// Runs `f` with the painter of the current thread.
    ///
    /// The painter and its font map, with their loaded faces and glyph caches,
    /// live as long as the thread. A new one is made only after another font
    /// file has been registered.
    pub fn with_thread_local<T>(f: impl FnOnce(&TextPainter) -> Result<T>) -> Result<T> {
        PAINTER.with(|slot| {
            let mut slot = slot.borrow_mut();
            let painter = slot.get_or_try_rebuild(FcFontLoader::generation(), || {
                debug!("creating text painter on {:?}", thread::current().id());
                TextPainter::new()
            })?;
            f(painter)
        })
    }

    pub fn new() -> Result<Self> {
        let ctx = pangocairo::FontMap::new().create_context();
        let mut opt = cairo::FontOptions::new().map_err(Error::cairo)?;
        opt.set_antialias(cairo::Antialias::Good);
        pangocairo::functions::context_set_font_options(&ctx, Some(&opt));
        Ok(Self { ctx })
    }

    pub fn layout(&self, font: &Font, align: Align) -> TextLayout {
        let layout = pango::Layout::new(&self.ctx);
        layout.set_font_description(Some(&font.description()));
        layout.set_spacing(LINE_SPACING * pango::SCALE);
        layout.set_alignment(align.into());
        TextLayout { layout }
    }
}

/// A font at one size, ready to measure or draw text with.
pub struct TextLayout {
    layout: pango::Layout,
}

impl TextLayout {
    /// Draws `text` onto a transparent surface just large enough to hold it.
    pub fn paint(&self, text: &str, color: Color) -> Result<ImageSurface> {
        let (w, h) = self.size(text);
        let surface =
            ImageSurface::create(cairo::Format::ARgb32, w.max(1), h.max(1)).map_err(Error::cairo)?;
        {
            let cr = cairo::Context::new(&surface).map_err(Error::cairo)?;
            let (r, g, b, a) = color.rgba();
            cr.set_source_rgba(r, g, b, a);
            pangocairo::functions::show_layout(&cr, &self.layout);
        }
        surface.flush();
        Ok(surface)
    }
}

impl Measure for TextLayout {
    fn size(&self, text: &str) -> (i32, i32) {
        self.layout.set_text(text);
        self.layout.pixel_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    #[test]
    fn reuses_value_while_generation_holds() {
        let mut slot = Reusable::new();
        let mut builds = 0;
        let mut seen = Vec::new();
        for generation in [1, 1, 1, 2, 2, 5] {
            let value = slot
                .get_or_try_rebuild(generation, || {
                    builds += 1;
                    Ok(builds)
                })
                .unwrap();
            seen.push(*value);
        }
        assert_eq!(seen, vec![1, 1, 1, 2, 2, 3]);
    }

    #[test]
    fn failed_build_is_retried() {
        let mut slot: Reusable<u32> = Reusable::new();
        let err = slot
            .get_or_try_rebuild(0, || Err(Error::cairo(cairo::Error::NoMemory)))
            .unwrap_err();
        assert!(matches!(err, Error::CairoError(..)));
        assert_eq!(*slot.get_or_try_rebuild(0, || Ok(7)).unwrap(), 7);
    }
}
