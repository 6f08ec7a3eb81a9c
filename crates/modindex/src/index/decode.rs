//! Lazy reader for module index files.
//!
//! Opening an index loads the string table and the package tables only.
//! Package lookups read the package record; file records stay on disk and
//! each [`SourceFile`] accessor reads just the words it needs, computing
//! field addresses from the fixed record layout.

use std::cell::OnceCell;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fnv::FnvHashMap;
use parking_lot::Mutex;

use super::format::{
    EMBED_WORDS, FILE_BINARY_ONLY, FILE_ERROR, FILE_GO_BUILD, FILE_IGNORE, FILE_NAME,
    FILE_PARSE_ERROR, FILE_PKG_NAME, FILE_PLUS_BUILD_COUNT, FILE_QUOTED_IMPORT_COMMENT,
    FILE_QUOTED_IMPORT_COMMENT_LINE, FILE_SYNOPSIS, IMPORT_WORDS, MAGIC, PACKAGE_FIELDS,
    PACKAGE_TABLE_POS, POSITION_WORDS, WORD,
};
use super::strtab::StringTable;
use crate::cook::{cook, BuildContext, CookedPackage, ImportMode};
use crate::error::{IndexError, Result};
use crate::types::{group_embeds, Embed, FileImport, Position, RawPackage, TaggedFile};

/// An open module index.
///
/// Safe to share between threads; reads of the underlying file are
/// serialized by a lock.
pub struct ModuleIndex {
    path: PathBuf,
    module_dir: PathBuf,
    file: Mutex<File>,
    string_table_offset: u32,
    strings: StringTable,
    /// Module-relative directories in index order.
    dirs: Vec<String>,
    packages: FnvHashMap<String, u32>,
}

impl std::fmt::Debug for ModuleIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleIndex")
            .field("path", &self.path)
            .field("module_dir", &self.module_dir)
            .field("packages", &self.dirs.len())
            .field("strings", &self.strings)
            .finish()
    }
}

impl ModuleIndex {
    /// Opens an index written for the module rooted at `module_dir`.
    pub fn open(index_path: impl AsRef<Path>, module_dir: impl AsRef<Path>) -> Result<Self> {
        let path = index_path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let size = file.metadata()?.len();

        let mut magic = vec![0u8; MAGIC.len()];
        read_exact(&mut file, &mut magic, "index header")?;
        if magic != MAGIC {
            return Err(IndexError::format(format!(
                "bad index version string: {:?}",
                String::from_utf8_lossy(&magic)
            )));
        }

        let mut header = [0u8; 8];
        read_exact(&mut file, &mut header, "index header")?;
        let header = words(&header);
        let (string_table_offset, count) = (header[0], header[1]);

        if string_table_offset < PACKAGE_TABLE_POS || u64::from(string_table_offset) >= size {
            return Err(IndexError::format(format!(
                "string table offset {string_table_offset} out of range for {size} byte index"
            )));
        }
        let table_end = u64::from(PACKAGE_TABLE_POS) + 2 * u64::from(WORD) * u64::from(count);
        if table_end > u64::from(string_table_offset) {
            return Err(IndexError::format(format!(
                "package table for {count} packages overruns the string table"
            )));
        }

        let mut tables = vec![0u8; (table_end - u64::from(PACKAGE_TABLE_POS)) as usize];
        read_exact(&mut file, &mut tables, "package table")?;
        let tables = words(&tables);
        let (dir_refs, offsets) = tables.split_at(count as usize);

        file.seek(SeekFrom::Start(u64::from(string_table_offset)))?;
        let mut table = Vec::new();
        file.read_to_end(&mut table)?;
        let strings = StringTable::new(table)?;

        let mut dirs = Vec::with_capacity(dir_refs.len());
        let mut packages = FnvHashMap::default();
        for (dir_ref, offset) in dir_refs.iter().zip(offsets) {
            let dir = strings.get(*dir_ref)?.to_string();
            packages.insert(dir.clone(), *offset);
            dirs.push(dir);
        }

        log::debug!(
            "opened module index {} ({} packages, string table at {})",
            path.display(),
            dirs.len(),
            string_table_offset
        );

        Ok(Self {
            path,
            module_dir: module_dir.as_ref().to_path_buf(),
            file: Mutex::new(file),
            string_table_offset,
            strings,
            dirs,
            packages,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn module_dir(&self) -> &Path {
        &self.module_dir
    }

    /// Module-relative package directories, sorted.
    pub fn dirs(&self) -> &[String] {
        &self.dirs
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn contains(&self, rel_dir: &str) -> bool {
        self.packages.contains_key(rel_dir)
    }

    /// Reads the package record for a module-relative directory.
    pub fn package(&self, rel_dir: &str) -> Result<Option<IndexedPackage<'_>>> {
        let Some(&offset) = self.packages.get(rel_dir) else {
            return Ok(None);
        };

        let fields = self.read_words_at(offset, PACKAGE_FIELDS)?;
        let file_offsets = self.read_words_at(offset + PACKAGE_FIELDS * WORD, fields[4])?;
        let fixed_end = u64::from(FILE_PLUS_BUILD_COUNT + WORD);
        let files = file_offsets
            .into_iter()
            .map(|offset| {
                if u64::from(offset) + fixed_end > u64::from(self.string_table_offset) {
                    return Err(IndexError::format(format!(
                        "file record at offset {offset} runs past the record area ({} bytes)",
                        self.string_table_offset
                    )));
                }
                Ok(SourceFile {
                    index: self,
                    offset,
                    imports_offset: OnceCell::new(),
                    embeds_offset: OnceCell::new(),
                })
            })
            .collect::<Result<_>>()?;

        Ok(Some(IndexedPackage {
            error: self.strings.get(fields[0])?.to_string(),
            path: self.strings.get(fields[1])?.to_string(),
            src_dir: self.strings.get(fields[2])?.to_string(),
            dir: self.strings.get(fields[3])?.to_string(),
            files,
        }))
    }

    /// Looks up a package and cooks it under `ctx`.
    pub fn import_package(
        &self,
        ctx: &BuildContext,
        rel_dir: &str,
        mode: ImportMode,
    ) -> Result<CookedPackage> {
        let package = self
            .package(rel_dir)?
            .ok_or_else(|| IndexError::PathNotFound(self.module_dir.join(rel_dir)))?;
        cook(&package, ctx, mode)
    }

    /// Releases the index file.
    pub fn close(self) {
        log::debug!("closed module index {}", self.path.display());
    }

    // -----------------------------------------------------------------------
    // Bounds-checked reads
    // -----------------------------------------------------------------------

    fn read_words_at(&self, offset: u32, count: u32) -> Result<Vec<u32>> {
        let len = u64::from(count) * u64::from(WORD);
        if u64::from(offset) + len > u64::from(self.string_table_offset) {
            return Err(IndexError::format(format!(
                "read of {count} words at offset {offset} runs past the record area ({} bytes)",
                self.string_table_offset
            )));
        }

        let mut buf = vec![0u8; len as usize];
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(u64::from(offset)))?;
        read_exact(&mut *file, &mut buf, "record")?;
        Ok(words(&buf))
    }

    fn u32_at(&self, offset: u32) -> Result<u32> {
        Ok(self.read_words_at(offset, 1)?[0])
    }

    fn bool_at(&self, offset: u32) -> Result<bool> {
        match self.u32_at(offset)? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(IndexError::format(format!(
                "invalid bool value {value} at offset {offset}"
            ))),
        }
    }

    fn string_at(&self, offset: u32) -> Result<Arc<str>> {
        self.strings.get(self.u32_at(offset)?)
    }

    fn position(&self, words: &[u32]) -> Result<Position> {
        Ok(Position {
            filename: self.strings.get(words[0])?.to_string(),
            offset: words[1],
            line: words[2],
            column: words[3],
        })
    }
}

fn read_exact(reader: &mut impl Read, buf: &mut [u8], what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|error| match error.kind() {
        io::ErrorKind::UnexpectedEof => IndexError::format(format!("truncated {what}")),
        _ => IndexError::Io(error),
    })
}

fn words(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(WORD as usize)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

// ---------------------------------------------------------------------------
// Indexed package and file views
// ---------------------------------------------------------------------------

/// Package-level fields of an index entry. File records are read on demand.
#[derive(Debug)]
pub struct IndexedPackage<'a> {
    pub error: String,
    pub path: String,
    pub src_dir: String,
    /// Module-relative directory.
    pub dir: String,
    pub files: Vec<SourceFile<'a>>,
}

impl IndexedPackage<'_> {
    /// Decodes every file record into an owned [`RawPackage`].
    pub fn materialize(&self) -> Result<RawPackage> {
        Ok(RawPackage {
            error: self.error.clone(),
            path: self.path.clone(),
            src_dir: self.src_dir.clone(),
            dir: self.dir.clone(),
            source_files: self
                .files
                .iter()
                .map(SourceFile::materialize)
                .collect::<Result<_>>()?,
        })
    }
}

/// A file record inside an open index.
#[derive(Debug)]
pub struct SourceFile<'a> {
    index: &'a ModuleIndex,
    offset: u32,
    imports_offset: OnceCell<u32>,
    embeds_offset: OnceCell<u32>,
}

impl SourceFile<'_> {
    pub fn error(&self) -> Result<Arc<str>> {
        self.index.string_at(self.field(FILE_ERROR)?)
    }

    pub fn parse_error(&self) -> Result<Arc<str>> {
        self.index.string_at(self.field(FILE_PARSE_ERROR)?)
    }

    pub fn synopsis(&self) -> Result<Arc<str>> {
        self.index.string_at(self.field(FILE_SYNOPSIS)?)
    }

    pub fn name(&self) -> Result<Arc<str>> {
        self.index.string_at(self.field(FILE_NAME)?)
    }

    pub fn pkg_name(&self) -> Result<Arc<str>> {
        self.index.string_at(self.field(FILE_PKG_NAME)?)
    }

    pub fn ignore_file(&self) -> Result<bool> {
        self.index.bool_at(self.field(FILE_IGNORE)?)
    }

    pub fn binary_only(&self) -> Result<bool> {
        self.index.bool_at(self.field(FILE_BINARY_ONLY)?)
    }

    pub fn quoted_import_comment(&self) -> Result<Arc<str>> {
        self.index.string_at(self.field(FILE_QUOTED_IMPORT_COMMENT)?)
    }

    pub fn quoted_import_comment_line(&self) -> Result<u32> {
        self.index.u32_at(self.field(FILE_QUOTED_IMPORT_COMMENT_LINE)?)
    }

    pub fn go_build_constraint(&self) -> Result<Arc<str>> {
        self.index.string_at(self.field(FILE_GO_BUILD)?)
    }

    pub fn plus_build_constraints(&self) -> Result<Vec<String>> {
        let start = self.field(FILE_PLUS_BUILD_COUNT)?;
        let count = self.index.u32_at(start)?;
        self.index
            .read_words_at(after_count(start)?, count)?
            .into_iter()
            .map(|offset| self.index.strings.get(offset).map(|line| line.to_string()))
            .collect()
    }

    pub fn imports(&self) -> Result<Vec<FileImport>> {
        let start = self.imports_offset()?;
        let count = self.index.u32_at(start)?;
        let words = self
            .index
            .read_words_at(after_count(start)?, checked_words(count, IMPORT_WORDS)?)?;
        words
            .chunks_exact(IMPORT_WORDS as usize)
            .map(|import| {
                Ok(FileImport {
                    path: self.index.strings.get(import[0])?.to_string(),
                    doc: self.index.strings.get(import[1])?.to_string(),
                    position: self.index.position(&import[2..])?,
                })
            })
            .collect()
    }

    pub fn embeds(&self) -> Result<Vec<Embed>> {
        let start = self.embeds_offset()?;
        let count = self.index.u32_at(start)?;
        let words = self
            .index
            .read_words_at(after_count(start)?, checked_words(count, EMBED_WORDS)?)?;
        words
            .chunks_exact(EMBED_WORDS as usize)
            .map(|embed| {
                Ok(Embed {
                    pattern: self.index.strings.get(embed[0])?.to_string(),
                    position: self.index.position(&embed[1..1 + POSITION_WORDS as usize])?,
                })
            })
            .collect()
    }

    /// Decodes the whole record.
    pub fn materialize(&self) -> Result<TaggedFile> {
        Ok(TaggedFile {
            name: self.name()?.to_string(),
            synopsis: self.synopsis()?.to_string(),
            pkg_name: self.pkg_name()?.to_string(),
            ignore_file: self.ignore_file()?,
            binary_only: self.binary_only()?,
            go_build_constraint: self.go_build_constraint()?.to_string(),
            plus_build_constraints: self.plus_build_constraints()?,
            quoted_import_comment: self.quoted_import_comment()?.to_string(),
            quoted_import_comment_line: self.quoted_import_comment_line()?,
            imports: self.imports()?,
            embeds: group_embeds(self.embeds()?),
            error: self.error()?.to_string(),
            parse_error: self.parse_error()?.to_string(),
        })
    }

    /// Absolute address of a fixed field of this record.
    fn field(&self, relative: u32) -> Result<u32> {
        self.offset.checked_add(relative).ok_or_else(|| {
            IndexError::format(format!(
                "field {relative} of file record at offset {} is out of range",
                self.offset
            ))
        })
    }

    /// Address of the import count: just past the `+build` list.
    fn imports_offset(&self) -> Result<u32> {
        if let Some(&offset) = self.imports_offset.get() {
            return Ok(offset);
        }
        let start = self.field(FILE_PLUS_BUILD_COUNT)?;
        let count = self.index.u32_at(start)?;
        let offset = self.advance(start, count, 1)?;
        let _ = self.imports_offset.set(offset);
        Ok(offset)
    }

    /// Address of the embed count: just past the import list.
    fn embeds_offset(&self) -> Result<u32> {
        if let Some(&offset) = self.embeds_offset.get() {
            return Ok(offset);
        }
        let start = self.imports_offset()?;
        let count = self.index.u32_at(start)?;
        let offset = self.advance(start, count, IMPORT_WORDS)?;
        let _ = self.embeds_offset.set(offset);
        Ok(offset)
    }

    /// Skips a counted list of `count` entries of `entry_words` words.
    fn advance(&self, start: u32, count: u32, entry_words: u32) -> Result<u32> {
        let words = checked_words(count, entry_words)?;
        let end = u64::from(start) + u64::from(WORD) * (1 + u64::from(words));
        u32::try_from(end)
            .ok()
            .filter(|end| *end <= self.index.string_table_offset)
            .ok_or_else(|| {
                IndexError::format(format!(
                    "list of {count} entries at offset {start} runs past the record area"
                ))
            })
    }
}

/// Address of the first entry of a counted list starting at `start`.
fn after_count(start: u32) -> Result<u32> {
    start
        .checked_add(WORD)
        .ok_or_else(|| IndexError::format(format!("list at offset {start} is out of range")))
}

fn checked_words(count: u32, entry_words: u32) -> Result<u32> {
    count.checked_mul(entry_words).ok_or_else(|| {
        IndexError::format(format!("list length {count} is out of range"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::encode_module;
    use tempfile::TempDir;

    fn position(line: u32, column: u32) -> Position {
        Position {
            filename: "/m/a/x.go".to_string(),
            offset: line * 20 + column,
            line,
            column,
        }
    }

    fn sample_package() -> RawPackage {
        let mut file = TaggedFile::new("x.go");
        file.pkg_name = "a".to_string();
        file.synopsis = "Package a does things.".to_string();
        file.plus_build_constraints = vec!["// +build linux".to_string(), "// +build amd64".to_string()];
        file.imports = vec![
            FileImport {
                path: "fmt".to_string(),
                doc: String::new(),
                position: position(3, 8),
            },
            FileImport {
                path: "embed".to_string(),
                doc: "blank import\n".to_string(),
                position: position(4, 8),
            },
        ];
        file.embeds
            .insert("static/*".to_string(), vec![position(6, 12), position(9, 12)]);

        let mut ignored = TaggedFile::new("_skip.go");
        ignored.ignore_file = true;

        let mut broken = TaggedFile::new("y.go");
        broken.error = "read /m/a/y.go: permission denied".to_string();

        RawPackage {
            error: String::new(),
            path: ".".to_string(),
            src_dir: "/m/a".to_string(),
            dir: "/m/a".to_string(),
            source_files: vec![file, ignored, broken],
        }
    }

    fn write_index(temp: &TempDir, packages: &mut [RawPackage]) -> PathBuf {
        let bytes = encode_module(packages, Path::new("/m")).unwrap();
        let path = temp.path().join("index");
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn reads_back_package_and_files() {
        let temp = TempDir::new().unwrap();
        let mut packages = vec![sample_package()];
        let path = write_index(&temp, &mut packages);

        let index = ModuleIndex::open(&path, "/m").unwrap();
        assert_eq!(index.dirs(), &["a".to_string()]);
        let package = index.package("a").unwrap().unwrap();
        assert_eq!(package.dir, "a");
        assert_eq!(package.src_dir, "/m/a");
        assert_eq!(package.files.len(), 3);
        assert_eq!(package.materialize().unwrap(), packages[0]);
        assert!(index.package("missing").unwrap().is_none());
        index.close();
    }

    #[test]
    fn accessors_compute_list_offsets() {
        let temp = TempDir::new().unwrap();
        let mut packages = vec![sample_package()];
        let path = write_index(&temp, &mut packages);
        let index = ModuleIndex::open(&path, "/m").unwrap();
        let package = index.package("a").unwrap().unwrap();
        let file = &package.files[0];

        // embeds first, so their offset is computed without reading +build lines
        let embeds = file.embeds().unwrap();
        assert_eq!(embeds.len(), 2);
        assert_eq!(embeds[1].position.line, 9);
        let imports = file.imports().unwrap();
        assert_eq!(imports[1].path, "embed");
        assert_eq!(imports[1].doc, "blank import\n");
        assert_eq!(&*file.go_build_constraint().unwrap(), "");
        assert_eq!(file.plus_build_constraints().unwrap().len(), 2);
        assert!(package.files[1].ignore_file().unwrap());
        assert_eq!(
            &*package.files[2].error().unwrap(),
            "read /m/a/y.go: permission denied"
        );
    }

    #[test]
    fn rejects_bad_magic() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index");
        std::fs::write(&path, b"go index v9\n\0\0\0\0\0\0\0\0\0").unwrap();
        let err = ModuleIndex::open(&path, "/m").unwrap_err();
        assert!(err.to_string().contains("bad index version string"));

        std::fs::write(&path, b"go ind").unwrap();
        assert!(matches!(
            ModuleIndex::open(&path, "/m"),
            Err(IndexError::Format(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_string_table() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index");
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&1000u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.push(0);
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(
            ModuleIndex::open(&path, "/m"),
            Err(IndexError::Format(_))
        ));
    }

    #[test]
    fn invalid_bool_is_a_format_error() {
        let temp = TempDir::new().unwrap();
        let mut packages = vec![sample_package()];
        let path = write_index(&temp, &mut packages);

        let offset = {
            let index = ModuleIndex::open(&path, "/m").unwrap();
            let package = index.package("a").unwrap().unwrap();
            package.files[0].offset
        };
        let mut bytes = std::fs::read(&path).unwrap();
        let at = (offset + FILE_IGNORE) as usize;
        bytes[at..at + 4].copy_from_slice(&7u32.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();

        let index = ModuleIndex::open(&path, "/m").unwrap();
        let package = index.package("a").unwrap().unwrap();
        let err = package.files[0].ignore_file().unwrap_err();
        assert!(err.to_string().contains("invalid bool value 7"));
        assert!(package.files[0].materialize().is_err());
    }

    #[test]
    fn oversized_list_count_is_a_format_error() {
        let temp = TempDir::new().unwrap();
        let mut packages = vec![sample_package()];
        let path = write_index(&temp, &mut packages);

        let offset = {
            let index = ModuleIndex::open(&path, "/m").unwrap();
            let package = index.package("a").unwrap().unwrap();
            package.files[0].offset
        };
        let mut bytes = std::fs::read(&path).unwrap();
        let at = (offset + FILE_PLUS_BUILD_COUNT) as usize;
        bytes[at..at + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();

        let index = ModuleIndex::open(&path, "/m").unwrap();
        let package = index.package("a").unwrap().unwrap();
        assert!(matches!(
            package.files[0].imports(),
            Err(IndexError::Format(_))
        ));
        // fixed fields stay readable
        assert_eq!(&*package.files[0].name().unwrap(), "x.go");
    }

    #[test]
    fn corrupt_file_offset_is_a_format_error() {
        let temp = TempDir::new().unwrap();
        let mut packages = vec![sample_package()];
        let path = write_index(&temp, &mut packages);

        let (package_offset, file_offset) = {
            let index = ModuleIndex::open(&path, "/m").unwrap();
            let package_offset = index.packages["a"];
            let file_offset = index.package("a").unwrap().unwrap().files[0].offset;
            (package_offset, file_offset)
        };
        let mut bytes = std::fs::read(&path).unwrap();
        let at = (package_offset + PACKAGE_FIELDS * WORD) as usize;
        assert_eq!(&bytes[at..at + 4], &file_offset.to_le_bytes());
        bytes[at..at + 4].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();

        let index = ModuleIndex::open(&path, "/m").unwrap();
        let err = index.package("a").unwrap_err();
        assert!(matches!(err, IndexError::Format(_)));
        assert!(err.to_string().contains("runs past the record area"));
        assert!(index
            .import_package(&BuildContext::for_target("linux", "amd64"), "a", ImportMode::empty())
            .is_err());
    }

    #[test]
    fn field_addresses_are_checked() {
        let temp = TempDir::new().unwrap();
        let mut packages = vec![sample_package()];
        let path = write_index(&temp, &mut packages);
        let index = ModuleIndex::open(&path, "/m").unwrap();

        let file = SourceFile {
            index: &index,
            offset: u32::MAX - 8,
            imports_offset: OnceCell::new(),
            embeds_offset: OnceCell::new(),
        };
        assert!(matches!(file.go_build_constraint(), Err(IndexError::Format(_))));
        assert!(matches!(file.plus_build_constraints(), Err(IndexError::Format(_))));
        assert!(matches!(file.embeds(), Err(IndexError::Format(_))));
        assert!(matches!(file.name(), Err(IndexError::Format(_))));
    }

    #[test]
    fn shared_between_threads() {
        let temp = TempDir::new().unwrap();
        let mut packages = vec![sample_package()];
        let path = write_index(&temp, &mut packages);
        let index = ModuleIndex::open(&path, "/m").unwrap();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let package = index.package("a").unwrap().unwrap();
                    assert_eq!(&*package.files[0].pkg_name().unwrap(), "a");
                });
            }
        });
    }
}
