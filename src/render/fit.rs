//! Shrink-to-fit font size search and text block placement.

use crate::error::Result;
use crate::template::{Template, TextArea};
use crate::text::{wrap, Measure};

use log::debug;

/// Font size decrement between two attempts.
pub const SIZE_STEP: u32 = 2;

/// Outcome of a fit search: the accepted size, the wrapped text and its extent.
#[derive(Debug)]
pub struct Fit<M> {
    pub font_size: u32,
    pub text: String,
    pub width: i32,
    pub height: i32,
    /// `false` when even the smallest attempted size overflows the text area.
    pub fits: bool,
    pub measure: M,
}

impl<M> Fit<M> {
    pub fn line_count(&self) -> usize {
        if self.text.is_empty() {
            0
        } else {
            self.text.split('\n').count()
        }
    }

    pub fn is_single_line(&self) -> bool {
        !self.text.contains('\n')
    }

    /// Top left corner of the text block, centered in the template's text area.
    ///
    /// The template offset is applied to single line blocks only.
    pub fn origin(&self, template: &Template) -> (f64, f64) {
        let offset = self.is_single_line().then_some(template.offset);
        place(&template.text_area, self.width, self.height, offset)
    }
}

/// Centers a `width` x `height` block inside `area`, then subtracts `offset`.
pub fn place(area: &TextArea, width: i32, height: i32, offset: Option<(i32, i32)>) -> (f64, f64) {
    let mut x = area.x as f64 + (area.width - width) as f64 / 2.0;
    let mut y = area.y as f64 + (area.height - height) as f64 / 2.0;
    if let Some((dx, dy)) = offset {
        x -= dx as f64;
        y -= dy as f64;
    }
    (x, y)
}

/// Tries font sizes from `max_font_size` down in steps of [`SIZE_STEP`] until
/// the wrapped text fits the template's text area.
///
/// `measure_at` provides a measurement for a font size. The search stops at the
/// last size not below `min_font_size`; if nothing fits, that last attempt is
/// returned with `fits` unset instead of an error.
pub fn search<M, F>(template: &Template, text: &str, mut measure_at: F) -> Result<Fit<M>>
where
    M: Measure,
    F: FnMut(u32) -> Result<M>,
{
    let area = template.text_area;
    let mut size = template.max_font_size;
    loop {
        let measure = measure_at(size)?;
        let wrapped = wrap(text, &measure, area.width);
        let (width, height) = measure.size(&wrapped);
        let fits = area.contains_size(width, height);
        let exhausted = size - template.min_font_size < SIZE_STEP;
        if fits || exhausted {
            if fits {
                debug!("template `{}`: text fits at {size}px", template.id);
            } else {
                debug!(
                    "template `{}`: text overflows at {size}px ({width}x{height} in {}x{})",
                    template.id, area.width, area.height
                );
            }
            return Ok(Fit {
                font_size: size,
                text: wrapped,
                width,
                height,
                fits,
                measure,
            });
        }
        size -= SIZE_STEP;
    }
}
