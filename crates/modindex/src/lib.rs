//! Go module index library.
//!
//! This crate splits package discovery into two phases:
//! - A raw scan of every directory in a module tree, independent of any
//!   build configuration
//! - A random-access binary index of the scan, decoded lazily
//! - Cooking: resolving raw package data against a build context

pub mod constraint;
pub mod cook;
pub mod error;
pub mod index;
pub mod scan;
pub mod types;


// Re-export main types
pub use cook::{cook, BuildContext, CgoFlags, CookedPackage, Decls, ImportMode};
pub use error::{CookError, IndexError, MultiplePackageError, Result};
pub use index::{write_module_index, IndexedPackage, ModuleIndex};
pub use scan::{index_module, scan_dir, GoHeaderScanner, HeaderScanner};
pub use types::{Embed, FileImport, Position, RawModule, RawPackage, TaggedFile};
