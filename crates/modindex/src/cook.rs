//! Build-context resolution of raw packages.

mod cgo;
mod classify;
mod context;
mod package;
mod source;

pub use cgo::CgoFlags;
pub use classify::cook;
pub use context::{BuildContext, ImportMode, TagMatcher};
pub use package::{CookedPackage, Decls};
pub use source::{FileSource, PackageSource};
