//! Raw, build-context-independent scan results.
//!
//! These records are what the raw scanner produces for a directory and what
//! the binary index stores. Nothing here depends on the target platform or
//! enabled tags; resolving them is the cooker's job.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A source position, as reported for imports and embed patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub filename: String,
    /// Byte offset from the start of the file.
    pub offset: u32,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column, in bytes.
    pub column: u32,
}

/// One import spec of a source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileImport {
    pub path: String,
    /// Text of the doc comment attached to the import (the cgo preamble for
    /// `import "C"`).
    pub doc: String,
    pub position: Position,
}

/// One `//go:embed` pattern occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub pattern: String,
    pub position: Position,
}

/// One filesystem entry of a candidate package directory.
///
/// Every regular file (or symlink to a non-directory) produces exactly one
/// record, including ignored and unreadable ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedFile {
    pub name: String,
    /// Synopsis of the package doc comment.
    pub synopsis: String,
    pub pkg_name: String,
    /// Starts with `_` or `.`, or should otherwise always be ignored.
    pub ignore_file: bool,
    /// Carries a `//go:binary-only-package` comment.
    pub binary_only: bool,
    /// The full `//go:build` line, if any.
    pub go_build_constraint: String,
    /// Legacy `// +build` lines. Only collected when there is no
    /// `//go:build` line.
    pub plus_build_constraints: Vec<String>,
    /// Still-quoted path from a `// import "path"` comment.
    pub quoted_import_comment: String,
    pub quoted_import_comment_line: u32,
    pub imports: Vec<FileImport>,
    /// Embed pattern to the positions it appears at.
    pub embeds: BTreeMap<String, Vec<Position>>,
    /// I/O failure while reading the file.
    pub error: String,
    /// Malformed source. Partial facts are still recorded.
    pub parse_error: String,
}

impl TaggedFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Embeds flattened into `(pattern, position)` pairs, ordered by pattern.
    pub fn embed_list(&self) -> Vec<Embed> {
        self.embeds
            .iter()
            .flat_map(|(pattern, positions)| {
                positions.iter().map(move |position| Embed {
                    pattern: pattern.clone(),
                    position: position.clone(),
                })
            })
            .collect()
    }
}

/// Groups a flat embed list back into the pattern multimap.
pub fn group_embeds(embeds: Vec<Embed>) -> BTreeMap<String, Vec<Position>> {
    let mut grouped: BTreeMap<String, Vec<Position>> = BTreeMap::new();
    for embed in embeds {
        grouped.entry(embed.pattern).or_default().push(embed.position);
    }
    grouped
}

/// One candidate package directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPackage {
    /// Directory-level error (unreadable directory, bad import path).
    pub error: String,
    /// Import path the directory was scanned under; always `.` for
    /// directory scans.
    pub path: String,
    /// Absolute source directory.
    pub src_dir: String,
    /// Directory containing the sources. Absolute after a scan, relative to
    /// the module root once the package has been encoded into an index.
    pub dir: String,
    /// Files in filesystem order.
    pub source_files: Vec<TaggedFile>,
}

/// A full module tree scan: module-relative directory to package.
///
/// The root directory is keyed by the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawModule {
    pub dirs: BTreeMap<String, RawPackage>,
}

impl RawModule {
    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn get(&self, rel_dir: &str) -> Option<&RawPackage> {
        self.dirs.get(rel_dir)
    }

    /// Consumes the module into the package list the encoder expects.
    pub fn into_packages(self) -> Vec<RawPackage> {
        self.dirs.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: u32) -> Position {
        Position {
            filename: "/m/a.go".to_string(),
            offset: line * 10,
            line,
            column: 1,
        }
    }

    #[test]
    fn embed_list_round_trips_through_grouping() {
        let mut file = TaggedFile::new("a.go");
        file.embeds
            .insert("static/*".to_string(), vec![pos(3), pos(9)]);
        file.embeds.insert("a.txt".to_string(), vec![pos(5)]);

        let flat = file.embed_list();
        assert_eq!(flat.len(), 3);
        assert_eq!(flat[0].pattern, "a.txt");
        assert_eq!(flat[1].position.line, 3);
        assert_eq!(flat[2].position.line, 9);

        assert_eq!(group_embeds(flat), file.embeds);
    }

    #[test]
    fn into_packages_follows_key_order() {
        let mut module = RawModule::default();
        for dir in ["b", "", "a"] {
            module.dirs.insert(
                dir.to_string(),
                RawPackage {
                    dir: dir.to_string(),
                    ..RawPackage::default()
                },
            );
        }
        let dirs: Vec<_> = module.into_packages().into_iter().map(|p| p.dir).collect();
        assert_eq!(dirs, vec!["", "a", "b"]);
    }
}
