//! Binary module index: encoding, lazy decoding and persistence.

mod decode;
mod encode;
pub mod format;
mod persistence;
mod strtab;

pub use decode::{IndexedPackage, ModuleIndex, SourceFile};
pub use encode::encode_module;
pub use persistence::write_module_index;
