//! Read access to raw package data, from a scan or from an index.
//!
//! The cooker is generic over these traits so the same algorithm runs on an
//! in-memory [`RawPackage`] and on a lazily decoded [`IndexedPackage`].

use std::borrow::Cow;

use crate::error::Result;
use crate::index::{IndexedPackage, SourceFile};
use crate::types::{Embed, FileImport, RawPackage, TaggedFile};

pub trait FileSource {
    fn name(&self) -> Result<Cow<'_, str>>;
    fn error(&self) -> Result<Cow<'_, str>>;
    fn parse_error(&self) -> Result<Cow<'_, str>>;
    fn synopsis(&self) -> Result<Cow<'_, str>>;
    fn pkg_name(&self) -> Result<Cow<'_, str>>;
    fn ignore_file(&self) -> Result<bool>;
    fn binary_only(&self) -> Result<bool>;
    fn quoted_import_comment(&self) -> Result<Cow<'_, str>>;
    fn quoted_import_comment_line(&self) -> Result<u32>;
    fn go_build_constraint(&self) -> Result<Cow<'_, str>>;
    fn plus_build_constraints(&self) -> Result<Vec<String>>;
    fn imports(&self) -> Result<Vec<FileImport>>;
    fn embeds(&self) -> Result<Vec<Embed>>;
}

pub trait PackageSource {
    type File: FileSource;

    fn error(&self) -> &str;
    fn path(&self) -> &str;
    /// Directory the package is cooked in; cgo paths are made absolute
    /// against it.
    fn src_dir(&self) -> &str;
    fn files(&self) -> &[Self::File];
}

// ---------------------------------------------------------------------------
// In-memory scan results
// ---------------------------------------------------------------------------

impl FileSource for TaggedFile {
    fn name(&self) -> Result<Cow<'_, str>> {
        Ok(Cow::Borrowed(&self.name))
    }

    fn error(&self) -> Result<Cow<'_, str>> {
        Ok(Cow::Borrowed(&self.error))
    }

    fn parse_error(&self) -> Result<Cow<'_, str>> {
        Ok(Cow::Borrowed(&self.parse_error))
    }

    fn synopsis(&self) -> Result<Cow<'_, str>> {
        Ok(Cow::Borrowed(&self.synopsis))
    }

    fn pkg_name(&self) -> Result<Cow<'_, str>> {
        Ok(Cow::Borrowed(&self.pkg_name))
    }

    fn ignore_file(&self) -> Result<bool> {
        Ok(self.ignore_file)
    }

    fn binary_only(&self) -> Result<bool> {
        Ok(self.binary_only)
    }

    fn quoted_import_comment(&self) -> Result<Cow<'_, str>> {
        Ok(Cow::Borrowed(&self.quoted_import_comment))
    }

    fn quoted_import_comment_line(&self) -> Result<u32> {
        Ok(self.quoted_import_comment_line)
    }

    fn go_build_constraint(&self) -> Result<Cow<'_, str>> {
        Ok(Cow::Borrowed(&self.go_build_constraint))
    }

    fn plus_build_constraints(&self) -> Result<Vec<String>> {
        Ok(self.plus_build_constraints.clone())
    }

    fn imports(&self) -> Result<Vec<FileImport>> {
        Ok(self.imports.clone())
    }

    fn embeds(&self) -> Result<Vec<Embed>> {
        Ok(self.embed_list())
    }
}

impl PackageSource for RawPackage {
    type File = TaggedFile;

    fn error(&self) -> &str {
        &self.error
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn src_dir(&self) -> &str {
        &self.src_dir
    }

    fn files(&self) -> &[TaggedFile] {
        &self.source_files
    }
}

// ---------------------------------------------------------------------------
// Index-backed data
// ---------------------------------------------------------------------------

impl FileSource for SourceFile<'_> {
    fn name(&self) -> Result<Cow<'_, str>> {
        Ok(Cow::Owned(SourceFile::name(self)?.to_string()))
    }

    fn error(&self) -> Result<Cow<'_, str>> {
        Ok(Cow::Owned(SourceFile::error(self)?.to_string()))
    }

    fn parse_error(&self) -> Result<Cow<'_, str>> {
        Ok(Cow::Owned(SourceFile::parse_error(self)?.to_string()))
    }

    fn synopsis(&self) -> Result<Cow<'_, str>> {
        Ok(Cow::Owned(SourceFile::synopsis(self)?.to_string()))
    }

    fn pkg_name(&self) -> Result<Cow<'_, str>> {
        Ok(Cow::Owned(SourceFile::pkg_name(self)?.to_string()))
    }

    fn ignore_file(&self) -> Result<bool> {
        SourceFile::ignore_file(self)
    }

    fn binary_only(&self) -> Result<bool> {
        SourceFile::binary_only(self)
    }

    fn quoted_import_comment(&self) -> Result<Cow<'_, str>> {
        Ok(Cow::Owned(SourceFile::quoted_import_comment(self)?.to_string()))
    }

    fn quoted_import_comment_line(&self) -> Result<u32> {
        SourceFile::quoted_import_comment_line(self)
    }

    fn go_build_constraint(&self) -> Result<Cow<'_, str>> {
        Ok(Cow::Owned(SourceFile::go_build_constraint(self)?.to_string()))
    }

    fn plus_build_constraints(&self) -> Result<Vec<String>> {
        SourceFile::plus_build_constraints(self)
    }

    fn imports(&self) -> Result<Vec<FileImport>> {
        SourceFile::imports(self)
    }

    fn embeds(&self) -> Result<Vec<Embed>> {
        SourceFile::embeds(self)
    }
}

impl<'a> PackageSource for IndexedPackage<'a> {
    type File = SourceFile<'a>;

    fn error(&self) -> &str {
        &self.error
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn src_dir(&self) -> &str {
        &self.src_dir
    }

    fn files(&self) -> &[SourceFile<'a>] {
        &self.files
    }
}
