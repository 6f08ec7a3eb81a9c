//! On-disk layout of the module index.
//!
//! All integers are little-endian `u32`. Strings are stored as offsets into
//! the trailing string table, where offset 0 is the empty string.
//!
//! ```text
//! header   magic, string table offset, package count
//!          package dir refs [count], package offsets [count]
//! package  error, path, src_dir, dir, file count, file offsets [count]
//! file     error, parse_error, synopsis, name, pkg_name, ignore,
//!          binary_only, quoted_import_comment, import_comment_line,
//!          go_build, +build count, +build lines,
//!          import count, (path, doc, position) per import,
//!          embed count, (pattern, position) per embed
//! position filename, offset, line, column
//! ```

pub const MAGIC: &[u8] = b"go index v0\n";

pub(crate) const WORD: u32 = 4;

pub(crate) const STRING_TABLE_OFFSET_POS: u32 = MAGIC.len() as u32;
pub(crate) const PACKAGE_COUNT_POS: u32 = STRING_TABLE_OFFSET_POS + WORD;
pub(crate) const PACKAGE_TABLE_POS: u32 = PACKAGE_COUNT_POS + WORD;

// Package record fields.
pub(crate) const PACKAGE_FIELDS: u32 = 5;

// File record fields, as byte offsets from the start of the record.
pub(crate) const FILE_ERROR: u32 = 0;
pub(crate) const FILE_PARSE_ERROR: u32 = 4;
pub(crate) const FILE_SYNOPSIS: u32 = 8;
pub(crate) const FILE_NAME: u32 = 12;
pub(crate) const FILE_PKG_NAME: u32 = 16;
pub(crate) const FILE_IGNORE: u32 = 20;
pub(crate) const FILE_BINARY_ONLY: u32 = 24;
pub(crate) const FILE_QUOTED_IMPORT_COMMENT: u32 = 28;
pub(crate) const FILE_QUOTED_IMPORT_COMMENT_LINE: u32 = 32;
pub(crate) const FILE_GO_BUILD: u32 = 36;
pub(crate) const FILE_PLUS_BUILD_COUNT: u32 = 40;

pub(crate) const POSITION_WORDS: u32 = 4;
pub(crate) const IMPORT_WORDS: u32 = 2 + POSITION_WORDS;
pub(crate) const EMBED_WORDS: u32 = 1 + POSITION_WORDS;
