//! Serializes scanned packages into the module index format.

use std::path::{Component, Path};

use super::format::{MAGIC, WORD};
use super::strtab::StringTableBuilder;
use crate::error::{IndexError, Result};
use crate::types::{Position, RawPackage, TaggedFile};

/// Encodes `packages` into index bytes.
///
/// Each package's `dir` is rewritten in place to its slash-separated path
/// relative to `module_dir` (the root becomes `""`; already relative dirs
/// are kept), and the slice is sorted by that path so the output only
/// depends on the set of packages.
pub fn encode_module(packages: &mut [RawPackage], module_dir: &Path) -> Result<Vec<u8>> {
    for package in packages.iter_mut() {
        package.dir = relative_dir(module_dir, &package.dir)?;
    }
    packages.sort_by(|a, b| a.dir.cmp(&b.dir));

    let mut encoder = Encoder::new();
    encoder.bytes(MAGIC);
    let string_table_offset_pos = encoder.reserve()?;
    encoder.count(packages.len())?;
    for package in packages.iter() {
        encoder.string(&package.dir)?;
    }
    let package_offsets_pos = encoder.reserve_n(packages.len())?;
    for (i, package) in packages.iter().enumerate() {
        let here = encoder.pos()?;
        encoder.patch(package_offsets_pos + WORD * i as u32, here);
        encoder.package(package)?;
    }

    let string_table_offset = encoder.pos()?;
    encoder.patch(string_table_offset_pos, string_table_offset);
    let bytes = encoder.finish()?;
    log::debug!(
        "encoded {} packages into {} bytes (string table at {})",
        packages.len(),
        bytes.len(),
        string_table_offset
    );
    Ok(bytes)
}

/// Slash-separated path of `dir` relative to `module_dir`.
fn relative_dir(module_dir: &Path, dir: &str) -> Result<String> {
    let path = Path::new(dir);
    let relative = if path.is_absolute() {
        path.strip_prefix(module_dir).map_err(|_| {
            IndexError::InvalidPath(format!(
                "{dir} is not inside module root {}",
                module_dir.display()
            ))
        })?
    } else {
        path
    };

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => {
                return Err(IndexError::InvalidPath(format!(
                    "{dir} is not inside module root {}",
                    module_dir.display()
                )))
            }
        }
    }
    Ok(parts.join("/"))
}

struct Encoder {
    buf: Vec<u8>,
    strings: StringTableBuilder,
}

impl Encoder {
    fn new() -> Self {
        Self {
            buf: Vec::new(),
            strings: StringTableBuilder::new(),
        }
    }

    fn pos(&self) -> Result<u32> {
        u32::try_from(self.buf.len()).map_err(|_| IndexError::format("index exceeds 4 GiB"))
    }

    fn bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn count(&mut self, len: usize) -> Result<()> {
        let len = u32::try_from(len).map_err(|_| IndexError::format("list too long"))?;
        self.u32(len);
        Ok(())
    }

    fn bool(&mut self, value: bool) {
        self.u32(u32::from(value));
    }

    fn string(&mut self, value: &str) -> Result<()> {
        let offset = self.strings.intern(value)?;
        self.u32(offset);
        Ok(())
    }

    fn position(&mut self, position: &Position) -> Result<()> {
        self.string(&position.filename)?;
        self.u32(position.offset);
        self.u32(position.line);
        self.u32(position.column);
        Ok(())
    }

    /// Writes a zero word to be patched later and returns its position.
    fn reserve(&mut self) -> Result<u32> {
        self.reserve_n(1)
    }

    fn reserve_n(&mut self, count: usize) -> Result<u32> {
        let start = self.pos()?;
        self.buf.resize(self.buf.len() + count * WORD as usize, 0);
        Ok(start)
    }

    fn patch(&mut self, at: u32, value: u32) {
        let at = at as usize;
        self.buf[at..at + WORD as usize].copy_from_slice(&value.to_le_bytes());
    }

    fn package(&mut self, package: &RawPackage) -> Result<()> {
        self.string(&package.error)?;
        self.string(&package.path)?;
        self.string(&package.src_dir)?;
        self.string(&package.dir)?;
        self.count(package.source_files.len())?;
        let file_offsets_pos = self.reserve_n(package.source_files.len())?;
        for (i, file) in package.source_files.iter().enumerate() {
            let here = self.pos()?;
            self.patch(file_offsets_pos + WORD * i as u32, here);
            self.file(file)?;
        }
        Ok(())
    }

    fn file(&mut self, file: &TaggedFile) -> Result<()> {
        self.string(&file.error)?;
        self.string(&file.parse_error)?;
        self.string(&file.synopsis)?;
        self.string(&file.name)?;
        self.string(&file.pkg_name)?;
        self.bool(file.ignore_file);
        self.bool(file.binary_only);
        self.string(&file.quoted_import_comment)?;
        self.u32(file.quoted_import_comment_line);
        self.string(&file.go_build_constraint)?;

        self.count(file.plus_build_constraints.len())?;
        for line in &file.plus_build_constraints {
            self.string(line)?;
        }

        self.count(file.imports.len())?;
        for import in &file.imports {
            self.string(&import.path)?;
            self.string(&import.doc)?;
            self.position(&import.position)?;
        }

        let embeds = file.embed_list();
        self.count(embeds.len())?;
        for embed in &embeds {
            self.string(&embed.pattern)?;
            self.position(&embed.position)?;
        }
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>> {
        let mut buf = self.buf;
        u32::try_from(buf.len() + self.strings.len())
            .map_err(|_| IndexError::format("index exceeds 4 GiB"))?;
        buf.extend_from_slice(&self.strings.into_bytes());
        Ok(buf)
    }
}
