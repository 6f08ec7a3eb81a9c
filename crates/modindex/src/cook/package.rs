use std::collections::BTreeMap;

use serde::Serialize;

use super::cgo::CgoFlags;
use crate::error::CookError;
use crate::types::Position;

/// A set of import paths or embed patterns with every position they were
/// declared at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Decls {
    /// Distinct entries, sorted.
    pub list: Vec<String>,
    pub positions: BTreeMap<String, Vec<Position>>,
}

impl Decls {
    pub(crate) fn from_map(positions: BTreeMap<String, Vec<Position>>) -> Self {
        Self {
            list: positions.keys().cloned().collect(),
            positions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.positions.contains_key(entry)
    }
}

/// A package resolved against one build context.
///
/// File lists keep the order files were stored in, except for assembly
/// files which are sorted once it is known whether they build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CookedPackage {
    pub dir: String,
    pub import_path: String,
    pub name: String,
    /// Synopsis of the package doc comment.
    pub doc: String,
    pub import_comment: String,
    pub binary_only: bool,

    pub go_files: Vec<String>,
    pub cgo_files: Vec<String>,
    pub ignored_go_files: Vec<String>,
    pub ignored_other_files: Vec<String>,
    pub invalid_go_files: Vec<String>,
    pub c_files: Vec<String>,
    pub cxx_files: Vec<String>,
    pub m_files: Vec<String>,
    pub h_files: Vec<String>,
    pub f_files: Vec<String>,
    pub s_files: Vec<String>,
    pub swig_files: Vec<String>,
    pub swig_cxx_files: Vec<String>,
    pub syso_files: Vec<String>,
    pub test_go_files: Vec<String>,
    pub xtest_go_files: Vec<String>,

    pub cgo: CgoFlags,

    pub imports: Decls,
    pub test_imports: Decls,
    pub xtest_imports: Decls,
    pub embeds: Decls,
    pub test_embeds: Decls,
    pub xtest_embeds: Decls,

    /// Every tag consulted while cooking, sorted.
    pub all_tags: Vec<String>,
    pub error: Option<CookError>,
}

impl CookedPackage {
    /// Whether the package has any Go source that builds under the context.
    pub fn has_go_sources(&self) -> bool {
        !(self.go_files.is_empty()
            && self.cgo_files.is_empty()
            && self.test_go_files.is_empty()
            && self.xtest_go_files.is_empty())
    }

    /// The list a non-Go source with extension `ext` is filed under.
    pub(crate) fn file_list_for_ext(&mut self, ext: &str) -> Option<&mut Vec<String>> {
        match ext {
            ".c" => Some(&mut self.c_files),
            ".cc" | ".cpp" | ".cxx" => Some(&mut self.cxx_files),
            ".m" => Some(&mut self.m_files),
            ".h" | ".hh" | ".hpp" | ".hxx" => Some(&mut self.h_files),
            ".f" | ".F" | ".for" | ".f90" => Some(&mut self.f_files),
            ".s" | ".S" | ".sx" => Some(&mut self.s_files),
            ".swig" => Some(&mut self.swig_files),
            ".swigcxx" => Some(&mut self.swig_cxx_files),
            ".syso" => Some(&mut self.syso_files),
            _ => None,
        }
    }
}
