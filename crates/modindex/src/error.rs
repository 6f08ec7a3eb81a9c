use std::path::PathBuf;

use serde::Serialize;

/// Fatal, operation-level failures.
///
/// File-level problems found while cooking are not reported through this
/// type; they are collected on the cooked package as a [`CookError`].
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("module index format error: {0}")]
    Format(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("{file}: parsing //go:build line: {message}")]
    Constraint { file: String, message: String },

    #[error("build context error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, IndexError>;

impl IndexError {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }
}

/// The single error value carried by a cooked package.
///
/// Only the first problem encountered while cooking is kept here; the full
/// list of offending files lives in `CookedPackage::invalid_go_files`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CookError {
    /// Error recorded on the raw package when it was scanned.
    #[error("{0}")]
    Package(String),

    /// A file-level problem: unreadable file, syntax error, bad import
    /// comment, malformed cgo directive, cgo in a test file.
    #[error("{0}")]
    File(String),

    #[error("{0}")]
    MultiplePackages(MultiplePackageError),

    #[error("no buildable Go source files in {dir}")]
    NoBuildableSources { dir: String },

    #[error("import \".\": unknown compiler {compiler:?}")]
    UnknownCompiler { compiler: String },
}

/// Two files in one directory declare different package names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultiplePackageError {
    pub dir: String,
    /// The first-seen package name, then the conflicting one.
    pub packages: [String; 2],
    /// The files declaring `packages[0]` and `packages[1]`.
    pub files: [String; 2],
}

impl std::fmt::Display for MultiplePackageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "found packages {} ({}) and {} ({}) in {}",
            self.packages[0], self.files[0], self.packages[1], self.files[1], self.dir
        )
    }
}
