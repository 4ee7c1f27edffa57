//! Management of font files and the process wide font cache.

use crate::error::{Error, Result};

use fontconfig::{Fontconfig, Pattern};
use fontconfig_sys::fontconfig as sys;
use log::debug;
use std::collections::HashMap;
use once_cell::sync::Lazy;
use std::ffi::CString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// Opens a font resource from a file at a given pixel size.
pub trait FontLoader: Send + Sync {
    type Font: Send + Sync;

    fn load(&self, path: &Path, size: u32) -> Result<Self::Font>;
}

/// The face a font file contains, as fontconfig describes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceStyle {
    pub weight: pango::Weight,
    pub style: pango::Style,
    pub stretch: pango::Stretch,
}

impl Default for FaceStyle {
    fn default() -> Self {
        Self {
            weight: pango::Weight::Normal,
            style: pango::Style::Normal,
            stretch: pango::Stretch::Normal,
        }
    }
}

impl FaceStyle {
    /// Reads `FC_WEIGHT`, `FC_SLANT` and `FC_WIDTH`, falling back to a regular face.
    fn from_pattern(pat: &Pattern) -> Self {
        let weight = pat.get_int(sys::constants::FC_WEIGHT.as_cstr());
        let slant = pat.get_int(sys::constants::FC_SLANT.as_cstr());
        let width = pat.get_int(sys::constants::FC_WIDTH.as_cstr());
        Self {
            weight: weight.map_or(pango::Weight::Normal, fc_weight),
            style: slant.map_or(pango::Style::Normal, fc_slant),
            stretch: width.map_or(pango::Stretch::Normal, fc_width),
        }
    }
}

fn fc_weight(weight: i32) -> pango::Weight {
    match weight {
        i32::MIN..=0 => pango::Weight::Thin,
        1..=40 => pango::Weight::Ultralight,
        41..=50 => pango::Weight::Light,
        51..=55 => pango::Weight::Semilight,
        56..=75 => pango::Weight::Book,
        76..=80 => pango::Weight::Normal,
        81..=100 => pango::Weight::Medium,
        101..=180 => pango::Weight::Semibold,
        181..=200 => pango::Weight::Bold,
        201..=205 => pango::Weight::Ultrabold,
        206..=210 => pango::Weight::Heavy,
        _ => pango::Weight::Ultraheavy,
    }
}

fn fc_slant(slant: i32) -> pango::Style {
    match slant {
        100 => pango::Style::Italic,
        110 => pango::Style::Oblique,
        _ => pango::Style::Normal,
    }
}

fn fc_width(width: i32) -> pango::Stretch {
    match width {
        i32::MIN..=56 => pango::Stretch::UltraCondensed,
        57..=69 => pango::Stretch::ExtraCondensed,
        70..=81 => pango::Stretch::Condensed,
        82..=93 => pango::Stretch::SemiCondensed,
        94..=106 => pango::Stretch::Normal,
        107..=119 => pango::Stretch::SemiExpanded,
        120..=137 => pango::Stretch::Expanded,
        138..=175 => pango::Stretch::ExtraExpanded,
        _ => pango::Stretch::UltraExpanded,
    }
}

/// A font file registered with fontconfig, at a fixed pixel size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Font {
    pub family: String,
    pub face: FaceStyle,
    pub path: PathBuf,
    pub size: u32,
}

impl Font {
    /// Description that makes fontconfig pick the face in `path` rather than
    /// the regular member of its family.
    pub fn description(&self) -> pango::FontDescription {
        let mut desc = pango::FontDescription::new();
        desc.set_family(&self.family);
        desc.set_weight(self.face.weight);
        desc.set_style(self.face.style);
        desc.set_stretch(self.face.stretch);
        desc.set_absolute_size(self.size as f64 * pango::SCALE as f64);
        desc
    }
}

/// Font files added to the fontconfig application font set, which is shared by
/// the whole process.
static REGISTERED: Lazy<Mutex<HashMap<PathBuf, (String, FaceStyle)>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));
static GENERATION: AtomicUsize = AtomicUsize::new(0);

/// Loads font files by adding them to the application font set of fontconfig,
/// so pango can select them by family and face.
#[derive(Debug, Default, Clone, Copy)]
pub struct FcFontLoader;

impl FcFontLoader {
    /// Changes every time a new font file is registered.
    ///
    /// Pango font maps only see the files registered before they were made.
    pub fn generation() -> usize {
        GENERATION.load(Ordering::Acquire)
    }

    fn register(&self, path: &Path) -> Result<(String, FaceStyle)> {
        let mut registered = lock!("font registry" REGISTERED);
        if let Some(face) = registered.get(path) {
            return Ok(face.clone());
        }
        if !path.is_file() {
            return Err(Error::load_font(path, "no such file"));
        }

        let fc = Fontconfig::new().ok_or_else(|| Error::load_font(path, "fontconfig init failed"))?;
        let c_fp = CString::new(path.to_string_lossy().to_string())
            .map_err(|_| Error::InvalidCString(path.to_string_lossy().to_string()))?;
        let (family, face) = Self::scan(&fc, &c_fp)
            .ok_or_else(|| Error::load_font(path, "not a readable font file"))?;

        let status = unsafe {
            sys::FcConfigAppFontAddFile(std::ptr::null_mut(), c_fp.as_ptr() as *const sys::FcChar8)
        };
        if status == 0 {
            return Err(Error::load_font(path, "fontconfig refused the file"));
        }
        debug!("registered font `{family}` {face:?} from {}", path.display());
        registered.insert(path.to_path_buf(), (family.clone(), face));
        GENERATION.fetch_add(1, Ordering::AcqRel);
        Ok((family, face))
    }

    fn scan(fc: &Fontconfig, c_fp: &CString) -> Option<(String, FaceStyle)> {
        unsafe {
            let set = sys::FcFontSetCreate();
            let status = sys::FcFileScan(
                set,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                c_fp.as_ptr() as *const sys::FcChar8,
                1,
            );
            let scanned = if status == 0 || (*set).nfont < 1 {
                None
            } else {
                let pat = Pattern::from_pattern(fc, *(*set).fonts);
                pat.get_string(sys::constants::FC_FAMILY.as_cstr())
                    .map(|family| (family.to_string(), FaceStyle::from_pattern(&pat)))
            };
            sys::FcFontSetDestroy(set);
            scanned
        }
    }
}

impl FontLoader for FcFontLoader {
    type Font = Font;

    fn load(&self, path: &Path, size: u32) -> Result<Font> {
        let (family, face) = self.register(path)?;
        Ok(Font {
            family,
            face,
            path: path.to_path_buf(),
            size,
        })
    }
}

/// Memoizes fonts by `(path, size)`.
///
/// Entries live as long as the cache. Failed loads are not stored, so a later
/// request for the same key tries again.
pub struct FontCache<L: FontLoader = FcFontLoader> {
    loader: L,
    fonts: RwLock<HashMap<(PathBuf, u32), Arc<L::Font>>>,
}

impl FontCache<FcFontLoader> {
    pub fn new() -> Self {
        Self::with_loader(FcFontLoader)
    }
}

impl Default for FontCache<FcFontLoader> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: FontLoader> FontCache<L> {
    pub fn with_loader(loader: L) -> Self {
        Self {
            loader,
            fonts: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, path: &Path, size: u32) -> Result<Arc<L::Font>> {
        let key = (path.to_path_buf(), size);
        if let Some(font) = lock!(read "font cache" self.fonts).get(&key) {
            return Ok(font.clone());
        }

        let mut fonts = lock!(write "font cache" self.fonts);
        if let Some(font) = fonts.get(&key) {
            return Ok(font.clone());
        }
        let font = Arc::new(self.loader.load(path, size)?);
        debug!("cached font {} at {size}px", path.display());
        fonts.insert(key, font.clone());
        Ok(font)
    }

    pub fn len(&self) -> usize {
        self.fonts.read().map(|f| f.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
