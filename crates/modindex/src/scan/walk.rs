//! Module tree walk.
//!
//! Directories are collected in pre-order with children sorted by name,
//! then every directory is scanned independently. Both phases run on the
//! rayon pool; results are keyed by module-relative path so the output does
//! not depend on scheduling.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use super::dir::scan_dir;
use super::header::HeaderScanner;
use crate::error::{IndexError, Result};
use crate::types::{RawModule, RawPackage};

/// Counters shared by the walkers.
#[derive(Debug, Default)]
struct WalkStats {
    num_dirs: AtomicUsize,
    num_files: AtomicUsize,
    num_errors: AtomicUsize,
}

/// Scans every directory under `module_dir`, including the root itself
/// (keyed by `""`).
///
/// Nothing is filtered here: `vendor`, `testdata` and hidden directories are
/// all recorded. Symlinked directories are not followed. An unreadable
/// subdirectory becomes a package carrying only its error.
pub fn index_module(module_dir: &Path, scanner: &dyn HeaderScanner) -> Result<RawModule> {
    if !fs::metadata(module_dir)?.is_dir() {
        return Err(IndexError::PathNotFound(module_dir.to_path_buf()));
    }

    let stats = WalkStats::default();
    let dirs = walk(module_dir.to_path_buf(), String::new(), &stats);

    let packages: Vec<(String, RawPackage)> = dirs
        .into_par_iter()
        .map(|(rel_dir, abs_dir)| {
            let package = scan_dir(&abs_dir, scanner);
            stats
                .num_files
                .fetch_add(package.source_files.len(), Ordering::Relaxed);
            if !package.error.is_empty() {
                stats.num_errors.fetch_add(1, Ordering::Relaxed);
            }
            (rel_dir, package)
        })
        .collect();

    log::debug!(
        "indexed {}: {} dirs, {} files, {} unreadable dirs",
        module_dir.display(),
        stats.num_dirs.load(Ordering::Relaxed),
        stats.num_files.load(Ordering::Relaxed),
        stats.num_errors.load(Ordering::Relaxed),
    );

    Ok(RawModule {
        dirs: packages.into_iter().collect(),
    })
}

/// Returns `path` and its subdirectories in pre-order.
fn walk(path: PathBuf, rel_dir: String, stats: &WalkStats) -> Vec<(String, PathBuf)> {
    stats.num_dirs.fetch_add(1, Ordering::Relaxed);

    let mut children: Vec<String> = match fs::read_dir(&path) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect(),
        // the directory scan records the error
        Err(_) => Vec::new(),
    };
    children.sort_unstable();

    let nested: Vec<Vec<(String, PathBuf)>> = children
        .into_par_iter()
        .map(|name| {
            let child_rel = if rel_dir.is_empty() {
                name.clone()
            } else {
                format!("{rel_dir}/{name}")
            };
            walk(path.join(&name), child_rel, stats)
        })
        .collect();

    let mut out = Vec::with_capacity(1 + nested.iter().map(Vec::len).sum::<usize>());
    out.push((rel_dir, path));
    out.extend(nested.into_iter().flatten());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::GoHeaderScanner;
    use tempfile::TempDir;

    #[test]
    fn keys_are_slash_relative() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("root.go"), "package root\n").unwrap();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::create_dir_all(root.join("vendor/x")).unwrap();
        fs::create_dir_all(root.join("testdata")).unwrap();
        fs::write(root.join("a/b/b.go"), "package b\n").unwrap();

        let module = index_module(root, &GoHeaderScanner).unwrap();
        let keys: Vec<_> = module.dirs.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["", "a", "a/b", "testdata", "vendor", "vendor/x"]);

        let root_package = module.get("").unwrap();
        assert_eq!(root_package.dir, root.to_string_lossy());
        assert_eq!(root_package.source_files[0].pkg_name, "root");
        assert_eq!(module.get("a/b").unwrap().source_files[0].name, "b.go");
    }

    #[test]
    fn walk_is_pre_order() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        for dir in ["b", "a/z", "a/c"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        let stats = WalkStats::default();
        let order: Vec<_> = walk(root.to_path_buf(), String::new(), &stats)
            .into_iter()
            .map(|(rel, _)| rel)
            .collect();
        assert_eq!(order, vec!["", "a", "a/c", "a/z", "b"]);
        assert_eq!(stats.num_dirs.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn missing_root_is_an_error() {
        let temp = TempDir::new().unwrap();
        assert!(index_module(&temp.path().join("missing"), &GoHeaderScanner).is_err());

        let file = temp.path().join("file.go");
        fs::write(&file, "package p\n").unwrap();
        assert!(matches!(
            index_module(&file, &GoHeaderScanner),
            Err(IndexError::PathNotFound(_))
        ));
    }
}
