//! Raw scan of a single package directory.

use std::fs;
use std::path::Path;

use super::header::HeaderScanner;
use crate::types::{group_embeds, RawPackage, TaggedFile};

/// Extensions, other than `.go`, that can belong to a package.
pub(crate) const KNOWN_EXTENSIONS: &[&str] = &[
    ".c", ".cc", ".cpp", ".cxx", ".m", ".h", ".hh", ".hpp", ".hxx", ".f", ".F", ".for",
    ".f90", ".s", ".S", ".sx", ".swig", ".swigcxx", ".syso",
];

/// Extension of `name` including the dot, or `""`.
pub(crate) fn file_ext(name: &str) -> &str {
    name.rfind('.').map_or("", |i| &name[i..])
}

/// Scans `dir` into a [`RawPackage`].
///
/// Every non-directory entry yields one [`TaggedFile`], in the order the
/// filesystem lists them. Problems with single files are recorded on their
/// records; only an unreadable directory sets the package error.
pub fn scan_dir(dir: &Path, scanner: &dyn HeaderScanner) -> RawPackage {
    let dir_name = dir.to_string_lossy().into_owned();
    let mut package = RawPackage {
        path: ".".to_string(),
        src_dir: dir_name.clone(),
        dir: dir_name.clone(),
        ..RawPackage::default()
    };

    if !is_dir(dir) {
        package.error = format!("cannot find package \".\" in:\n\t{dir_name}");
        return package;
    }
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            package.error = format!("open {dir_name}: {error}");
            return package;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                log::warn!("skipping unreadable entry in {dir_name}: {error}");
                continue;
            }
        };
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(error) => {
                log::warn!("skipping {}: {error}", entry.path().display());
                continue;
            }
        };
        if file_type.is_dir() || (file_type.is_symlink() && is_dir(&entry.path())) {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        package.source_files.push(scan_file(dir, name, scanner));
    }

    log::trace!("scanned {dir_name}: {} entries", package.source_files.len());
    package
}

fn scan_file(dir: &Path, name: String, scanner: &dyn HeaderScanner) -> TaggedFile {
    let mut file = TaggedFile::new(name);
    if file.name.starts_with('_') || file.name.starts_with('.') {
        file.ignore_file = true;
        return file;
    }
    let ext = file_ext(&file.name);
    let is_go = ext == ".go";
    if !is_go && !KNOWN_EXTENSIONS.contains(&ext) {
        file.ignore_file = true;
        return file;
    }
    if ext == ".syso" {
        return file;
    }

    let path = dir.join(&file.name);
    let content = match fs::read(&path) {
        Ok(content) => content,
        Err(error) => {
            file.error = format!("read {}: {error}", path.display());
            return file;
        }
    };

    let header = match scanner.scan_header(&file.name, &path, &content) {
        Ok(header) => header,
        Err(message) => {
            file.error = message;
            return file;
        }
    };

    file.go_build_constraint = header.go_build_constraint;
    file.plus_build_constraints = header.plus_build_constraints;
    // binary-only markers only count in non-test Go files
    file.binary_only = header.binary_only && is_go && !file.name.ends_with("_test.go");
    if !is_go {
        return file;
    }

    file.pkg_name = header.package_name;
    file.synopsis = header.synopsis;
    file.parse_error = header.parse_error.unwrap_or_default();
    if header.quoted_import_comment_line != 0 {
        file.quoted_import_comment = header.quoted_import_comment;
        file.quoted_import_comment_line = header.quoted_import_comment_line;
    }
    file.imports = header.imports;
    file.embeds = group_embeds(header.embeds);
    file
}

fn is_dir(path: &Path) -> bool {
    fs::metadata(path).map(|metadata| metadata.is_dir()).unwrap_or(false)
}
