//! Fonts, line wrapping and text layout.

mod font;
mod layout;
mod wrap;

pub use font::{FaceStyle, FcFontLoader, Font, FontCache, FontLoader};
pub use layout::{TextLayout, TextPainter, LINE_SPACING};
pub use wrap::{wrap, Measure};

#[cfg(test)]
pub(crate) use wrap::tests::GridMeasure;
