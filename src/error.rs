//! Common error types.

use std::fmt::Display;
use std::path::Path;

/// A shortcut type equivalent to `Result<T, replycard::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error that occurs within the crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    ConfigOpen(String, String),
    ConfigDeser(String, String),
    InvalidTemplate(String, String),
    TemplateNotFound(String),
    LoadFont(String, String),
    InvalidCString(String),
    OpenImage(String, String),
    VipsError(String),
    CairoError(String),
    ImageConversionError(&'static str, &'static str),
    ReadLockError(&'static str, String),
    WriteLockError(&'static str, String),
    MutexLockError(&'static str, String),
    ThreadJoin(usize),
    PoolClosed,
    RenderAborted(usize),
    InvalidArgument(String),
    OutputWrite(String, String),
    MissingVariable(&'static str),
}

impl Error {
    pub fn config_open(path: impl AsRef<Path>, e: impl Display) -> Self {
        Self::ConfigOpen(path.as_ref().display().to_string(), e.to_string())
    }

    pub fn config_deser(path: impl AsRef<Path>, e: impl Display) -> Self {
        Self::ConfigDeser(path.as_ref().display().to_string(), e.to_string())
    }

    pub fn invalid_template(id: impl Into<String>, reason: impl Display) -> Self {
        Self::InvalidTemplate(id.into(), reason.to_string())
    }

    pub fn template_not_found(id: impl Into<String>) -> Self {
        Self::TemplateNotFound(id.into())
    }

    pub fn load_font(path: impl AsRef<Path>, reason: impl Display) -> Self {
        Self::LoadFont(path.as_ref().display().to_string(), reason.to_string())
    }

    pub fn open_image(path: impl AsRef<Path>, reason: impl Display) -> Self {
        Self::OpenImage(path.as_ref().display().to_string(), reason.to_string())
    }

    pub fn cairo(e: impl Display) -> Self {
        Self::CairoError(e.to_string())
    }

    pub fn read_lock(name: &'static str, e: impl Display) -> Self {
        Self::ReadLockError(name, e.to_string())
    }

    pub fn write_lock(name: &'static str, e: impl Display) -> Self {
        Self::WriteLockError(name, e.to_string())
    }

    pub fn mutex_lock(name: &'static str, e: impl Display) -> Self {
        Self::MutexLockError(name, e.to_string())
    }

    pub fn thread_join(id: usize) -> Self {
        Self::ThreadJoin(id)
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn output_write(path: impl AsRef<Path>, e: impl Display) -> Self {
        Self::OutputWrite(path.as_ref().display().to_string(), e.to_string())
    }

    pub fn no_env_variable(name: &'static str) -> Self {
        Self::MissingVariable(name)
    }

    /// Whether the error only concerns a single request, leaving the service usable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::ConfigOpen(..) | Self::ConfigDeser(..) | Self::InvalidTemplate(..)
        )
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ConfigOpen(path, e) => write!(f, "failed to open template config {path}: {e}"),
            Error::ConfigDeser(path, e) => write!(f, "failed to parse template config {path}: {e}"),
            Error::InvalidTemplate(id, e) => write!(f, "invalid template `{id}`: {e}"),
            Error::TemplateNotFound(id) => write!(f, "template `{id}` not found"),
            Error::LoadFont(path, e) => write!(f, "failed to load font {path}: {e}"),
            Error::InvalidCString(s) => write!(f, "string contains a nul byte: {s:?}"),
            Error::OpenImage(path, e) => write!(f, "failed to open image {path}: {e}"),
            Error::VipsError(e) => write!(f, "libvips error: {e}"),
            Error::CairoError(e) => write!(f, "cairo error: {e}"),
            Error::ImageConversionError(from, to) => {
                write!(f, "failed to convert image from {from} to {to}")
            }
            Error::ReadLockError(name, e) => write!(f, "failed to read-lock {name}: {e}"),
            Error::WriteLockError(name, e) => write!(f, "failed to write-lock {name}: {e}"),
            Error::MutexLockError(name, e) => write!(f, "failed to lock {name}: {e}"),
            Error::ThreadJoin(id) => write!(f, "failed to join render worker {id}"),
            Error::PoolClosed => write!(f, "render pool is closed"),
            Error::RenderAborted(id) => write!(f, "render job {id} was dropped before finishing"),
            Error::InvalidArgument(msg) => write!(f, "{msg}"),
            Error::OutputWrite(path, e) => write!(f, "failed to write {path}: {e}"),
            Error::MissingVariable(name) => write!(f, "missing environment variable: {name}"),
        }
    }
}

impl std::error::Error for Error {}
