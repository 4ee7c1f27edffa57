//! Chat commands that produce reply images.
//!
//! | Command         | Template   |
//! |-----------------|------------|
//! | `举牌`, `安安`   | `default`  |
//! | `赞同`          | `approve`  |
//! | `伪证`          | `false`    |
//! | `疑问`          | `question` |
//! | `反驳`          | `refute`   |
//!
//! `举牌` also accepts the `【魔法】` marker anywhere in its text, which is removed
//! and switches the fill to [`Color::MAGIC`].

use crate::color::Color;
use crate::error::{Error, Result};
use crate::pipeline::{Render, RenderPool, RenderTicket};
use crate::template::DEFAULT_TEMPLATE;

use std::fmt;
use std::str::FromStr;

pub const MAGIC_MARKER: &str = "【魔法】";

/// Reply sent back when a command has nothing to render.
pub const INVALID_ARGUMENT: &str = "参数无效";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Command {
    Sign,
    Approve,
    False,
    Question,
    Refute,
}

impl Command {
    pub const ALL: [Command; 5] = [
        Command::Sign,
        Command::Approve,
        Command::False,
        Command::Question,
        Command::Refute,
    ];

    /// Command name followed by its aliases.
    pub fn names(&self) -> &'static [&'static str] {
        match self {
            Command::Sign => &["举牌", "安安"],
            Command::Approve => &["赞同"],
            Command::False => &["伪证"],
            Command::Question => &["疑问"],
            Command::Refute => &["反驳"],
        }
    }

    pub fn template_id(&self) -> &'static str {
        match self {
            Command::Sign => DEFAULT_TEMPLATE,
            Command::Approve => "approve",
            Command::False => "false",
            Command::Question => "question",
            Command::Refute => "refute",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.names().contains(&name))
    }

    /// Turns the raw argument of the command into a render request.
    pub fn request(&self, raw: &str) -> Result<ReplyRequest> {
        let mut text = raw.trim().to_string();
        let mut color = Color::BLACK;
        let mut marked = false;
        if *self == Command::Sign && text.contains(MAGIC_MARKER) {
            text = text.replace(MAGIC_MARKER, "").trim().to_string();
            color = Color::MAGIC;
            marked = true;
        }
        if text.is_empty() && !marked {
            return Err(Error::invalid_argument(INVALID_ARGUMENT));
        }
        Ok(ReplyRequest {
            template_id: self.template_id().to_string(),
            text,
            color,
        })
    }
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s).ok_or_else(|| Error::invalid_argument(format!("unknown command `{s}`")))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.names()[0])
    }
}

/// A render ready to be queued: template, cleaned up text and fill.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyRequest {
    pub template_id: String,
    pub text: String,
    pub color: Color,
}

impl ReplyRequest {
    pub fn new(template_id: impl Into<String>, text: impl Into<String>, color: Color) -> Self {
        Self {
            template_id: template_id.into(),
            text: text.into(),
            color,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn submit<R: Render>(self, pool: &RenderPool<R>) -> Result<RenderTicket> {
        pool.submit(self.template_id, self.text, self.color)
    }
}

/// Parses and queues a chat command in one go.
pub fn dispatch<R: Render>(pool: &RenderPool<R>, name: &str, raw: &str) -> Result<RenderTicket> {
    name.parse::<Command>()?.request(raw)?.submit(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderedImage;
    use pretty_assertions::assert_eq;
    use std::num::NonZero;

    #[test]
    fn resolves_names_and_aliases() {
        assert_eq!(Command::from_name("举牌"), Some(Command::Sign));
        assert_eq!(Command::from_name("安安"), Some(Command::Sign));
        assert_eq!(Command::from_name("赞同"), Some(Command::Approve));
        assert_eq!(Command::from_name("伪证"), Some(Command::False));
        assert_eq!(Command::from_name("疑问"), Some(Command::Question));
        assert_eq!(Command::from_name("反驳"), Some(Command::Refute));
        assert_eq!(Command::from_name("hello"), None);
        assert!(matches!("hello".parse::<Command>(), Err(Error::InvalidArgument(_))));
        assert_eq!(Command::Sign.to_string(), "举牌");
    }

    #[test]
    fn marker_switches_color_and_is_removed() {
        let req = Command::Sign.request("【魔法】Nice").unwrap();
        assert_eq!(req, ReplyRequest::new("default", "Nice", Color::MAGIC));

        let req = Command::Sign.request("  so 【魔法】 nice ").unwrap();
        assert_eq!(req.text, "so  nice");
        assert_eq!(req.color, Color::MAGIC);
    }

    #[test]
    fn plain_text_uses_black() {
        let req = Command::Sign.request("  Hello \n").unwrap();
        assert_eq!(req, ReplyRequest::new("default", "Hello", Color::BLACK));
    }

    #[test]
    fn marker_is_only_special_for_signs() {
        let req = Command::Approve.request("【魔法】Nice").unwrap();
        assert_eq!(req, ReplyRequest::new("approve", "【魔法】Nice", Color::BLACK));
    }

    #[test]
    fn empty_text_is_rejected() {
        for cmd in Command::ALL {
            assert_eq!(
                cmd.request("   "),
                Err(Error::InvalidArgument(INVALID_ARGUMENT.into())),
                "{cmd}"
            );
        }
    }

    #[test]
    fn lone_marker_renders_blank_sign() {
        let req = Command::Sign.request("【魔法】").unwrap();
        assert_eq!(req, ReplyRequest::new("default", "", Color::MAGIC));
    }

    struct EchoRenderer;

    impl Render for EchoRenderer {
        fn render_id(&self, template_id: &str, text: &str, color: Color) -> Result<RenderedImage> {
            Ok(RenderedImage {
                data: format!("{template_id}|{text}|{color}").into_bytes(),
                font_size: 0,
                lines: 1,
            })
        }
    }

    #[test]
    fn dispatch_queues_the_parsed_request() {
        let pool = RenderPool::new(EchoRenderer, NonZero::new(1).unwrap());
        let img = dispatch(&pool, "举牌", "【魔法】Nice").unwrap().wait().unwrap();
        assert_eq!(img.data, b"default|Nice|#A08CF9".to_vec());
        let img = dispatch(&pool, "反驳", "no").unwrap().wait().unwrap();
        assert_eq!(img.data, b"refute|no|#000000".to_vec());
        assert!(dispatch(&pool, "疑问", "").is_err());
        assert!(dispatch(&pool, "unknown", "text").is_err());
    }
}
