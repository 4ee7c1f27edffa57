//! CLI implementation.

use crate::color::Color;
use crate::command::{Command, ReplyRequest};
use crate::error::{Error, Result};
use crate::pipeline::RenderPool;
use crate::render::{RenderedImage, Renderer};
use crate::template::Registry;

use clap::Parser;
use itertools::Itertools;
use log::info;
use std::fs;
use std::num::NonZero;
use std::path::PathBuf;

/// Render reply images by putting text on templates
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Chat command: 举牌 (安安), 赞同, 伪证, 疑问 or 反驳
    pub command: Option<String>,

    /// Reply text, joined with spaces
    pub text: Vec<String>,

    #[cfg(target_os = "windows")]
    /// Asset folder holding config.json, defaults to %APPDATA%/replycard
    #[arg(short, long)]
    pub assets: Option<PathBuf>,

    #[cfg(not(target_os = "windows"))]
    /// Asset folder holding config.json, defaults to ~/.replycard
    #[arg(short, long)]
    pub assets: Option<PathBuf>,

    /// Use this template id instead of the command's
    #[arg(short, long)]
    pub template: Option<String>,

    /// Fill color as #RRGGBB or #RRGGBBAA
    #[arg(short, long)]
    pub color: Option<Color>,

    /// Write the PNG to this file instead of printing a CQ image code
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of render worker threads
    #[arg(short, long, default_value_t = NonZero::new(2).unwrap())]
    pub workers: NonZero<usize>,

    /// List the available template ids and exit
    #[arg(long)]
    pub list: bool,
}

macro_rules! fatal {
    ($res:expr) => {
        $res.unwrap_or_else(|e| panic!("{e}"))
    };
}

impl Cli {
    pub fn run() {
        std::panic::set_hook(Box::new(|panic_info| {
            if let Some(s) = panic_info.payload().downcast_ref::<String>() {
                eprintln!("{s}");
            } else {
                eprintln!("{panic_info}");
            }
        }));
        crate::logs::init();

        let cli = Self::parse();
        let root = fatal!(cli.asset_root());
        let renderer = fatal!(Renderer::open(root));

        if cli.list {
            for id in fatal!(renderer.registry().ids()) {
                println!("{id}");
            }
            return;
        }

        let request = fatal!(cli.request());
        let pool = RenderPool::new(renderer, cli.workers);
        let image = fatal!(request.submit(&pool).and_then(|ticket| ticket.wait()));
        fatal!(cli.deliver(&image));
        fatal!(pool.shutdown());
    }

    fn asset_root(&self) -> Result<PathBuf> {
        match &self.assets {
            Some(path) => Ok(path.clone()),
            None => Registry::config_folder(),
        }
    }

    fn request(&self) -> Result<ReplyRequest> {
        let request = match (&self.template, &self.command) {
            // with an explicit template, the first positional word is text too
            (Some(id), _) => {
                let text = self.command.iter().chain(self.text.iter()).join(" ");
                let text = text.trim();
                if text.is_empty() {
                    return Err(Error::invalid_argument(crate::command::INVALID_ARGUMENT));
                }
                ReplyRequest::new(id.clone(), text, Color::BLACK)
            }
            (None, Some(name)) => name.parse::<Command>()?.request(&self.text.join(" "))?,
            (None, None) => return Err(Error::invalid_argument("no command given")),
        };
        Ok(match self.color {
            Some(color) => request.with_color(color),
            None => request,
        })
    }

    fn deliver(&self, image: &RenderedImage) -> Result<()> {
        match &self.output {
            Some(path) => {
                fs::write(path, &image.data).map_err(|e| Error::output_write(path, e))?;
                info!(
                    "wrote {} ({} line(s) at {}px)",
                    path.display(),
                    image.lines,
                    image.font_size
                );
            }
            None => println!("{}", image.to_cq_code()),
        }
        Ok(())
    }
}
