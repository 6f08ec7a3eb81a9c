//! Raw, build-context-independent scanning of package directories.

mod dir;
mod header;
mod walk;

pub(crate) use dir::file_ext;
pub use dir::scan_dir;
pub use header::{synopsis, unquote, FileHeader, GoHeaderScanner, HeaderScanner};
pub use walk::index_module;
