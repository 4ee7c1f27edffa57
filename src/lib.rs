//! # Replycard
//!
//! Renders reply text onto image templates. The font shrinks until the wrapped
//! text fits the template's text area, and the result comes back as a PNG.

macro_rules! lock {
    (read $T:literal $lock:expr) => {
        $lock.read().map_err(|e| $crate::error::Error::read_lock($T, e))?
    };
    (write $T:literal $lock:expr) => {
        $lock.write().map_err(|e| $crate::error::Error::write_lock($T, e))?
    };
    ($T:literal $lock:expr) => {
        $lock.lock().map_err(|e| $crate::error::Error::mutex_lock($T, e))?
    };
}

#[cfg(feature = "cli")]
pub mod cli;
pub mod color;
pub mod command;
pub mod error;
pub mod image;
#[cfg(feature = "cli")]
pub mod logs;
pub mod pipeline;
pub mod render;
pub mod template;
pub mod text;

pub use color::Color;
pub use command::{Command, ReplyRequest};
pub use error::{Error, Result};
pub use pipeline::{RenderPool, RenderTicket};
pub use render::{RenderedImage, Renderer};
pub use template::{Registry, Template};
