//! Template definitions and the registry that loads them.
//!
//! Templates are described by `config.json` inside the asset root:
//!
//! ```json
//! {
//!   "templates": [
//!     {
//!       "id": "default",
//!       "path": "images/default.png",
//!       "font_path": "fonts/font.ttf",
//!       "text_area": [120, 300, 420, 180],
//!       "max_font_size": 48,
//!       "min_font_size": 10,
//!       "offset": [0, 0],
//!       "align": "center"
//!     }
//!   ]
//! }
//! ```

use crate::error::{Error, Result};

use log::{info, warn};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Identifier used when the caller does not ask for a specific template.
pub const DEFAULT_TEMPLATE: &str = "default";
pub const CONFIG_FILE: &str = "config.json";

const DEFAULT_MAX_FONT_SIZE: u32 = 48;
const DEFAULT_MIN_FONT_SIZE: u32 = 10;

/// Horizontal alignment of the lines of a text block.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Align {
    Left,
    #[default]
    Center,
    Right,
}

impl From<Align> for pango::Alignment {
    fn from(align: Align) -> Self {
        match align {
            Align::Left => pango::Alignment::Left,
            Align::Center => pango::Alignment::Center,
            Align::Right => pango::Alignment::Right,
        }
    }
}

/// The box, in base image pixels, that rendered text must fit in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TextArea {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl TextArea {
    pub fn contains_size(&self, width: i32, height: i32) -> bool {
        width <= self.width && height <= self.height
    }
}

/// One reply image: a base image, a font and a text box with fit parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawTemplate")]
pub struct Template {
    pub id: String,
    pub path: PathBuf,
    pub font_path: PathBuf,
    pub text_area: TextArea,
    pub max_font_size: u32,
    pub min_font_size: u32,
    /// Subtracted from the draw origin of single line text only.
    pub offset: (i32, i32),
    pub align: Align,
}

impl Template {
    /// Resolves the image and font paths against the asset root.
    fn rooted(mut self, root: &Path) -> Self {
        self.path = root.join(&self.path);
        self.font_path = root.join(&self.font_path);
        self
    }
}

#[derive(Debug, Deserialize)]
struct RawTemplate {
    id: String,
    path: PathBuf,
    font_path: PathBuf,
    text_area: [i32; 4],
    #[serde(default = "default_max_font_size")]
    max_font_size: u32,
    #[serde(default = "default_min_font_size")]
    min_font_size: u32,
    #[serde(default)]
    offset: [i32; 2],
    #[serde(default)]
    align: Align,
}

const fn default_max_font_size() -> u32 {
    DEFAULT_MAX_FONT_SIZE
}

const fn default_min_font_size() -> u32 {
    DEFAULT_MIN_FONT_SIZE
}

impl TryFrom<RawTemplate> for Template {
    type Error = Error;

    fn try_from(raw: RawTemplate) -> Result<Self> {
        let [x, y, width, height] = raw.text_area;
        let invalid = |reason: &str| Err(Error::invalid_template(raw.id.clone(), reason));
        if raw.id.is_empty() {
            return invalid("id must not be empty");
        }
        if width <= 0 || height <= 0 {
            return invalid("text_area width and height must be positive");
        }
        if raw.min_font_size == 0 {
            return invalid("min_font_size must be positive");
        }
        if raw.max_font_size < raw.min_font_size {
            return invalid("max_font_size must not be smaller than min_font_size");
        }
        let [dx, dy] = raw.offset;
        Ok(Self {
            id: raw.id,
            path: raw.path,
            font_path: raw.font_path,
            text_area: TextArea { x, y, width, height },
            max_font_size: raw.max_font_size,
            min_font_size: raw.min_font_size,
            offset: (dx, dy),
            align: raw.align,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Config {
    templates: Vec<Template>,
}

/// Ordered set of templates read from `<root>/config.json`.
///
/// The config file is read at most once; every later call reuses the parsed list.
/// A failed read is not cached, but callers are expected to treat it as fatal.
#[derive(Debug)]
pub struct Registry {
    root: PathBuf,
    templates: OnceCell<Vec<Template>>,
}

impl Registry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            templates: OnceCell::new(),
        }
    }

    /// Creates a registry and loads it right away.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let registry = Self::new(root);
        registry.load()?;
        Ok(registry)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn load(&self) -> Result<&[Template]> {
        self.templates
            .get_or_try_init(|| self.read_config())
            .map(Vec::as_slice)
    }

    fn read_config(&self) -> Result<Vec<Template>> {
        let path = self.config_path();
        let content = fs::read_to_string(&path).map_err(|e| Error::config_open(&path, e))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| Error::config_deser(&path, e))?;

        {
            let mut seen = HashSet::new();
            for t in config.templates.iter() {
                if !seen.insert(t.id.as_str()) {
                    warn!("duplicate template id `{}`, only the first one is used", t.id);
                }
            }
        }
        let templates: Vec<Template> = config
            .templates
            .into_iter()
            .map(|t| t.rooted(&self.root))
            .collect();
        info!("loaded {} templates from {}", templates.len(), path.display());
        Ok(templates)
    }

    /// Finds the first template with the given identifier.
    pub fn lookup(&self, id: &str) -> Result<&Template> {
        self.load()?
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::template_not_found(id))
    }

    pub fn lookup_default(&self) -> Result<&Template> {
        self.lookup(DEFAULT_TEMPLATE)
    }

    pub fn ids(&self) -> Result<Vec<&str>> {
        Ok(self.load()?.iter().map(|t| t.id.as_str()).collect())
    }

    #[cfg(target_os = "windows")]
    pub fn config_folder() -> Result<PathBuf> {
        let home = std::env::var("APPDATA").map_err(|_| Error::no_env_variable("APPDATA"))?;
        let mut home = PathBuf::from(home);
        home.push("replycard");
        Ok(home)
    }

    #[cfg(not(target_os = "windows"))]
    pub fn config_folder() -> Result<PathBuf> {
        let home = std::env::var("HOME").map_err(|_| Error::no_env_variable("HOME"))?;
        let mut home = PathBuf::from(home);
        home.push(".replycard");
        Ok(home)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::TempDir;

    fn registry_with(config: &str) -> (TempDir, Registry) {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join(CONFIG_FILE)).unwrap();
        f.write_all(config.as_bytes()).unwrap();
        let registry = Registry::new(dir.path());
        (dir, registry)
    }

    const CONFIG: &str = r#"{
        "templates": [
            {
                "id": "default",
                "path": "base.png",
                "font_path": "fonts/a.ttf",
                "text_area": [10, 10, 200, 80]
            },
            {
                "id": "approve",
                "path": "approve.png",
                "font_path": "fonts/b.ttf",
                "text_area": [0, 5, 100, 50],
                "max_font_size": 36,
                "min_font_size": 12,
                "offset": [4, -2],
                "align": "left"
            }
        ]
    }"#;

    #[test]
    fn applies_defaults_and_resolves_paths() {
        let (dir, registry) = registry_with(CONFIG);
        let t = registry.lookup("default").unwrap();
        assert_eq!(
            t,
            &Template {
                id: "default".into(),
                path: dir.path().join("base.png"),
                font_path: dir.path().join("fonts/a.ttf"),
                text_area: TextArea { x: 10, y: 10, width: 200, height: 80 },
                max_font_size: 48,
                min_font_size: 10,
                offset: (0, 0),
                align: Align::Center,
            }
        );
        assert_eq!(registry.lookup_default().unwrap().id, "default");
    }

    #[test]
    fn reads_optional_fields() {
        let (_dir, registry) = registry_with(CONFIG);
        let t = registry.lookup("approve").unwrap();
        assert_eq!(t.max_font_size, 36);
        assert_eq!(t.min_font_size, 12);
        assert_eq!(t.offset, (4, -2));
        assert_eq!(t.align, Align::Left);
        assert_eq!(registry.ids().unwrap(), vec!["default", "approve"]);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let (_dir, registry) = registry_with(CONFIG);
        assert_eq!(
            registry.lookup("nonexistent"),
            Err(Error::TemplateNotFound("nonexistent".into()))
        );
    }

    #[test]
    fn loads_only_once() {
        let (dir, registry) = registry_with(CONFIG);
        assert_eq!(registry.load().unwrap().len(), 2);
        fs::remove_file(dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(registry.load().unwrap().len(), 2);
        assert!(registry.lookup("approve").is_ok());
    }

    #[test]
    fn first_duplicate_wins() {
        let (_dir, registry) = registry_with(
            r#"{"templates": [
                {"id": "x", "path": "1.png", "font_path": "f.ttf", "text_area": [0, 0, 1, 1]},
                {"id": "x", "path": "2.png", "font_path": "f.ttf", "text_area": [0, 0, 1, 1]}
            ]}"#,
        );
        let t = registry.lookup("x").unwrap();
        assert!(t.path.ends_with("1.png"));
    }

    #[test]
    fn missing_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = Registry::open(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigOpen(..)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn rejects_malformed_records() {
        let cases = [
            r#"{"templates": [{"id": "a", "path": "a.png", "font_path": "f.ttf", "text_area": [0, 0, 0, 10]}]}"#,
            r#"{"templates": [{"id": "a", "path": "a.png", "font_path": "f.ttf", "text_area": [0, 0, 10, 10], "max_font_size": 8}]}"#,
            r#"{"templates": [{"id": "a", "path": "a.png", "text_area": [0, 0, 10, 10]}]}"#,
            r#"{"templates": [{"id": "a", "path": "a.png", "font_path": "f.ttf", "text_area": [0, 0, 10]}]}"#,
            r#"{"templates": [{"id": "a", "path": "a.png", "font_path": "f.ttf", "text_area": [0, 0, 10, 10], "align": "justify"}]}"#,
            r#"{"templates": [{"id": "", "path": "a.png", "font_path": "f.ttf", "text_area": [0, 0, 10, 10]}]}"#,
            "not json",
        ];
        for config in cases {
            let (_dir, registry) = registry_with(config);
            let err = registry.load().unwrap_err();
            assert!(matches!(err, Error::ConfigDeser(..)), "{config}: {err}");
        }
    }

    #[test]
    fn absolute_paths_are_kept() {
        let (_dir, registry) = registry_with(
            r#"{"templates": [
                {"id": "a", "path": "/srv/a.png", "font_path": "/usr/share/fonts/f.ttf", "text_area": [0, 0, 1, 1]}
            ]}"#,
        );
        let t = registry.lookup("a").unwrap();
        assert_eq!(t.path, PathBuf::from("/srv/a.png"));
        assert_eq!(t.font_path, PathBuf::from("/usr/share/fonts/f.ttf"));
    }
}
