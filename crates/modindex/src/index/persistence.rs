//! Writing module indexes to disk.

use std::fs;
use std::io::Write;
use std::path::Path;

use super::encode::encode_module;
use crate::error::{IndexError, Result};
use crate::types::RawModule;

/// Encodes `module` and writes it to `index_path`.
///
/// The bytes go to a temporary file in the destination directory which is
/// then renamed over `index_path`, so readers never see a partial index.
pub fn write_module_index(index_path: &Path, module: RawModule, module_dir: &Path) -> Result<()> {
    let mut packages = module.into_packages();
    let bytes = encode_module(&mut packages, module_dir)?;

    let parent = match index_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(index_path)
        .map_err(|error| IndexError::Io(error.error))?;

    log::debug!(
        "wrote module index {} ({} packages, {} bytes)",
        index_path.display(),
        packages.len(),
        bytes.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ModuleIndex;
    use crate::types::RawPackage;
    use tempfile::TempDir;

    #[test]
    fn writes_and_replaces_index() {
        let temp = TempDir::new().unwrap();
        let index_path = temp.path().join("cache").join("modindex");

        let mut module = RawModule::default();
        module.dirs.insert(
            "p".to_string(),
            RawPackage {
                path: ".".to_string(),
                dir: "/m/p".to_string(),
                src_dir: "/m/p".to_string(),
                ..RawPackage::default()
            },
        );
        write_module_index(&index_path, module.clone(), Path::new("/m")).unwrap();
        let index = ModuleIndex::open(&index_path, "/m").unwrap();
        assert_eq!(index.dirs(), &["p".to_string()]);
        index.close();

        module.dirs.insert(
            "q".to_string(),
            RawPackage {
                dir: "/m/q".to_string(),
                ..RawPackage::default()
            },
        );
        write_module_index(&index_path, module, Path::new("/m")).unwrap();
        let index = ModuleIndex::open(&index_path, "/m").unwrap();
        assert_eq!(index.len(), 2);

        let leftovers = fs::read_dir(temp.path().join("cache")).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn encode_errors_leave_no_file() {
        let temp = TempDir::new().unwrap();
        let index_path = temp.path().join("modindex");
        let mut module = RawModule::default();
        module.dirs.insert(
            "x".to_string(),
            RawPackage {
                dir: "/elsewhere/x".to_string(),
                ..RawPackage::default()
            },
        );
        assert!(write_module_index(&index_path, module, Path::new("/m")).is_err());
        assert!(!index_path.exists());
    }
}
