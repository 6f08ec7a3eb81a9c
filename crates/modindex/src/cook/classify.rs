//! Cooking: resolve a raw package against a build context.
//!
//! Files are visited in stored order. Each one is checked against the
//! file-name platform convention and its build constraints, then sorted into
//! exactly one bucket of the [`CookedPackage`]. File-level problems are
//! collected and do not stop the walk; only the first one is reported as the
//! package error.

use std::collections::{BTreeMap, HashSet};

use super::context::{BuildContext, ImportMode, TagMatcher};
use super::package::{CookedPackage, Decls};
use super::source::{FileSource, PackageSource};
use crate::constraint::ConstraintParser;
use crate::error::{CookError, IndexError, MultiplePackageError, Result};
use crate::scan::{file_ext, unquote};
use crate::types::Position;

const DOCUMENTATION_PACKAGE: &str = "documentation";
const TEST_SUFFIX: &str = "_test.go";
const XTEST_PACKAGE_SUFFIX: &str = "_test";
const CGO_IMPORT: &str = "C";

type PositionMap = BTreeMap<String, Vec<Position>>;

/// Tracks files with problems. The first error wins; every offending file
/// is listed once.
#[derive(Default)]
struct BadFiles {
    first: Option<CookError>,
    seen: HashSet<String>,
}

impl BadFiles {
    fn report(&mut self, package: &mut CookedPackage, name: &str, error: CookError) {
        if self.first.is_none() {
            self.first = Some(error);
        }
        if self.seen.insert(name.to_string()) {
            package.invalid_go_files.push(name.to_string());
        }
    }
}

#[derive(Clone, Copy)]
enum Bucket {
    Go,
    Cgo,
    Test,
    XTest,
    IgnoredCgo,
}

/// Resolves `package` under `ctx`.
///
/// Problems with the package or its files end up in
/// [`CookedPackage::error`]. The returned `Err` is reserved for failures that
/// make the result meaningless: an unparsable `//go:build` line or a
/// corrupt index record.
pub fn cook<P: PackageSource>(
    package: &P,
    ctx: &BuildContext,
    mode: ImportMode,
) -> Result<CookedPackage> {
    let mut cooked = CookedPackage {
        dir: package.src_dir().to_string(),
        import_path: package.path().to_string(),
        ..CookedPackage::default()
    };

    if !package.error().is_empty() {
        cooked.error = Some(CookError::Package(package.error().to_string()));
        return Ok(cooked);
    }

    let compiler_error = match ctx.compiler.as_str() {
        "gc" | "gccgo" => None,
        other => Some(CookError::UnknownCompiler {
            compiler: other.to_string(),
        }),
    };

    if cooked.dir.is_empty() {
        cooked.error = Some(CookError::Package(format!(
            "import {:?}: import relative to unknown directory",
            cooked.import_path
        )));
        return Ok(cooked);
    }

    if mode.contains(ImportMode::FIND_ONLY) {
        cooked.error = compiler_error;
        return Ok(cooked);
    }

    if mode.contains(ImportMode::ALLOW_BINARY) && builds_binary_only(package, ctx)? {
        cooked.binary_only = true;
        cooked.error = compiler_error;
        return Ok(cooked);
    }

    let mut tags = TagMatcher::new(ctx);
    let mut bad = BadFiles::default();
    let mut deferred_asm: Vec<String> = Vec::new();
    let mut first_file = String::new();
    let mut first_comment_file = String::new();

    let mut import_pos = PositionMap::new();
    let mut test_import_pos = PositionMap::new();
    let mut xtest_import_pos = PositionMap::new();
    let mut embed_pos = PositionMap::new();
    let mut test_embed_pos = PositionMap::new();
    let mut xtest_embed_pos = PositionMap::new();

    for file in package.files() {
        let name = file.name()?.into_owned();
        let ext = file_ext(&name);

        let error = file.error()?;
        if !error.is_empty() {
            bad.report(&mut cooked, &name, CookError::File(error.into_owned()));
            continue;
        }
        let parse_error = file.parse_error()?;
        if !parse_error.is_empty() {
            // still listed below with whatever was recovered
            bad.report(&mut cooked, &name, CookError::File(parse_error.into_owned()));
        }

        if file.ignore_file()? {
            if name.starts_with('_') || name.starts_with('.') {
                continue;
            }
            if ext == ".go" {
                cooked.ignored_go_files.push(name);
            } else if cooked.file_list_for_ext(ext).is_some() {
                cooked.ignored_other_files.push(name);
            }
            continue;
        }

        if !should_build(file, &name, ctx, &mut tags)? {
            if ext == ".go" {
                cooked.ignored_go_files.push(name);
            } else if cooked.file_list_for_ext(ext).is_some() {
                cooked.ignored_other_files.push(name);
            }
            continue;
        }

        if file.binary_only()? {
            cooked.binary_only = true;
        }

        match ext {
            ".go" => {}
            ".S" | ".sx" => {
                deferred_asm.push(name);
                continue;
            }
            _ => {
                if let Some(list) = cooked.file_list_for_ext(ext) {
                    list.push(name);
                }
                continue;
            }
        }

        let mut pkg = file.pkg_name()?.into_owned();
        if pkg == DOCUMENTATION_PACKAGE {
            cooked.ignored_go_files.push(name);
            continue;
        }

        let is_test = name.ends_with(TEST_SUFFIX);
        let mut is_xtest = false;
        if is_test && pkg.ends_with(XTEST_PACKAGE_SUFFIX) && cooked.name != pkg {
            is_xtest = true;
            pkg.truncate(pkg.len() - XTEST_PACKAGE_SUFFIX.len());
        }

        if cooked.name.is_empty() {
            cooked.name = pkg;
            first_file = name.clone();
        } else if pkg != cooked.name {
            let error = CookError::MultiplePackages(MultiplePackageError {
                dir: cooked.dir.clone(),
                packages: [cooked.name.clone(), pkg],
                files: [first_file.clone(), name.clone()],
            });
            bad.report(&mut cooked, &name, error);
        }

        if cooked.doc.is_empty() && !is_test && !is_xtest {
            let synopsis = file.synopsis()?;
            if !synopsis.is_empty() {
                cooked.doc = synopsis.into_owned();
            }
        }

        if mode.contains(ImportMode::IMPORT_COMMENT) {
            let line = file.quoted_import_comment_line()?;
            if line != 0 {
                let quoted = file.quoted_import_comment()?;
                match unquote(&quoted) {
                    None => bad.report(
                        &mut cooked,
                        &name,
                        CookError::File(format!("{name}:{line}: cannot parse import comment")),
                    ),
                    Some(comment) if cooked.import_comment.is_empty() => {
                        cooked.import_comment = comment;
                        first_comment_file = name.clone();
                    }
                    Some(comment) if comment != cooked.import_comment => {
                        let error = CookError::File(format!(
                            "found import comments {:?} ({}) and {:?} ({}) in {}",
                            cooked.import_comment, first_comment_file, comment, name, cooked.dir
                        ));
                        bad.report(&mut cooked, &name, error);
                    }
                    Some(_) => {}
                }
            }
        }

        let imports = file.imports()?;
        let mut is_cgo = false;
        for import in imports.iter().filter(|import| import.path == CGO_IMPORT) {
            if is_test {
                let error = CookError::File(format!("use of cgo in test {name} not supported"));
                bad.report(&mut cooked, &name, error);
                continue;
            }
            is_cgo = true;
            if !import.doc.is_empty() {
                if let Err(message) = cooked.cgo.apply(ctx, &name, &cooked.dir, &import.doc) {
                    bad.report(&mut cooked, &name, CookError::File(message));
                }
            }
        }

        let bucket = if is_cgo {
            if tags.matches("cgo") && ctx.cgo_enabled {
                Bucket::Cgo
            } else {
                Bucket::IgnoredCgo
            }
        } else if is_xtest {
            Bucket::XTest
        } else if is_test {
            Bucket::Test
        } else {
            Bucket::Go
        };

        let (list, maps) = match bucket {
            Bucket::Go => (&mut cooked.go_files, Some((&mut import_pos, &mut embed_pos))),
            Bucket::Cgo => (&mut cooked.cgo_files, Some((&mut import_pos, &mut embed_pos))),
            Bucket::Test => (
                &mut cooked.test_go_files,
                Some((&mut test_import_pos, &mut test_embed_pos)),
            ),
            Bucket::XTest => (
                &mut cooked.xtest_go_files,
                Some((&mut xtest_import_pos, &mut xtest_embed_pos)),
            ),
            // imports and embeds of a cgo file do not count without cgo
            Bucket::IgnoredCgo => (&mut cooked.ignored_go_files, None),
        };
        list.push(name);

        if let Some((import_map, embed_map)) = maps {
            for import in imports {
                import_map.entry(import.path).or_default().push(import.position);
            }
            for embed in file.embeds()? {
                embed_map.entry(embed.pattern).or_default().push(embed.position);
            }
        }
    }

    cooked.all_tags = tags.into_tags();
    cooked.imports = Decls::from_map(import_pos);
    cooked.test_imports = Decls::from_map(test_import_pos);
    cooked.xtest_imports = Decls::from_map(xtest_import_pos);
    cooked.embeds = Decls::from_map(embed_pos);
    cooked.test_embeds = Decls::from_map(test_embed_pos);
    cooked.xtest_embeds = Decls::from_map(xtest_embed_pos);

    if cooked.cgo_files.is_empty() {
        cooked.ignored_other_files.extend(deferred_asm);
        cooked.ignored_other_files.sort();
    } else {
        cooked.s_files.extend(deferred_asm);
        cooked.s_files.sort();
    }

    cooked.error = if let Some(error) = bad.first {
        Some(error)
    } else if !cooked.has_go_sources() {
        Some(CookError::NoBuildableSources {
            dir: cooked.dir.clone(),
        })
    } else {
        compiler_error
    };

    log::trace!(
        "cooked {} for {}/{}: {} go files, {} tags",
        cooked.dir,
        ctx.goos,
        ctx.goarch,
        cooked.go_files.len(),
        cooked.all_tags.len()
    );

    Ok(cooked)
}

/// Whether a file that would be built carries a binary-only marker.
/// Tags consulted here are not recorded.
fn builds_binary_only<P: PackageSource>(package: &P, ctx: &BuildContext) -> Result<bool> {
    let mut scratch = TagMatcher::new(ctx);
    for file in package.files() {
        if !file.binary_only()? || !file.error()?.is_empty() || file.ignore_file()? {
            continue;
        }
        let name = file.name()?;
        if should_build(file, &name, ctx, &mut scratch)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Evaluates the file-name convention, then either the `//go:build` line or
/// every `// +build` line. Every tag consulted is recorded in `tags`.
fn should_build<F: FileSource>(
    file: &F,
    name: &str,
    ctx: &BuildContext,
    tags: &mut TagMatcher<'_>,
) -> Result<bool> {
    let good_name = tags.good_os_arch_file(name);
    if !good_name && !ctx.use_all_files {
        return Ok(false);
    }

    let go_build = file.go_build_constraint()?;
    let matched = if !go_build.is_empty() {
        let expr = ConstraintParser::parse(&go_build).map_err(|error| IndexError::Constraint {
            file: name.to_string(),
            message: error.to_string(),
        })?;
        expr.eval(&mut |tag: &str| tags.matches(tag))
    } else {
        let mut matched = true;
        for line in file.plus_build_constraints()? {
            // malformed legacy lines are skipped
            if let Ok(expr) = ConstraintParser::parse(&line) {
                if !expr.eval(&mut |tag: &str| tags.matches(tag)) {
                    matched = false;
                }
            }
        }
        matched
    };

    Ok(matched || ctx.use_all_files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileImport, RawPackage, TaggedFile};

    fn go_file(name: &str, pkg: &str) -> TaggedFile {
        TaggedFile {
            pkg_name: pkg.to_string(),
            ..TaggedFile::new(name)
        }
    }

    fn import(path: &str, filename: &str, line: u32) -> FileImport {
        FileImport {
            path: path.to_string(),
            doc: String::new(),
            position: Position {
                filename: filename.to_string(),
                offset: 0,
                line,
                column: 8,
            },
        }
    }

    fn raw(files: Vec<TaggedFile>) -> RawPackage {
        RawPackage {
            error: String::new(),
            path: ".".to_string(),
            src_dir: "/src/p".to_string(),
            dir: "/src/p".to_string(),
            source_files: files,
        }
    }

    fn linux() -> BuildContext {
        BuildContext::for_target("linux", "amd64")
    }

    fn cook_linux(files: Vec<TaggedFile>) -> CookedPackage {
        cook(&raw(files), &linux(), ImportMode::empty()).unwrap()
    }

    #[test]
    fn buckets_by_test_suffix_and_package() {
        let mut a = go_file("a.go", "p");
        a.synopsis = "Package p does things.".to_string();
        a.imports = vec![import("fmt", "a.go", 3), import("os", "a.go", 4)];
        let mut a_test = go_file("a_test.go", "p");
        a_test.imports = vec![import("testing", "a_test.go", 3)];
        let mut x_test = go_file("x_test.go", "p_test");
        x_test.imports = vec![import("p", "x_test.go", 3), import("fmt", "x_test.go", 4)];

        let cooked = cook_linux(vec![a, a_test, x_test]);
        assert_eq!(cooked.error, None);
        assert_eq!(cooked.name, "p");
        assert_eq!(cooked.doc, "Package p does things.");
        assert_eq!(cooked.go_files, vec!["a.go"]);
        assert_eq!(cooked.test_go_files, vec!["a_test.go"]);
        assert_eq!(cooked.xtest_go_files, vec!["x_test.go"]);
        assert_eq!(cooked.imports.list, vec!["fmt", "os"]);
        assert_eq!(cooked.test_imports.list, vec!["testing"]);
        assert_eq!(cooked.xtest_imports.list, vec!["fmt", "p"]);
    }

    #[test]
    fn first_package_name_wins() {
        let cooked = cook_linux(vec![go_file("x.go", "p"), go_file("y.go", "q")]);
        assert_eq!(cooked.name, "p");
        assert_eq!(cooked.go_files, vec!["x.go", "y.go"]);
        assert_eq!(cooked.invalid_go_files, vec!["y.go"]);
        assert_eq!(
            cooked.error,
            Some(CookError::MultiplePackages(MultiplePackageError {
                dir: "/src/p".to_string(),
                packages: ["p".to_string(), "q".to_string()],
                files: ["x.go".to_string(), "y.go".to_string()],
            }))
        );
    }

    #[test]
    fn first_file_error_is_reported_and_others_listed() {
        let mut broken = go_file("a.go", "p");
        broken.parse_error = "a.go:3:1: expected declaration".to_string();
        broken.imports = vec![import("fmt", "a.go", 2)];
        let mut unreadable = TaggedFile::new("b.go");
        unreadable.error = "read /src/p/b.go: permission denied".to_string();

        let cooked = cook_linux(vec![broken, unreadable, go_file("c.go", "p")]);
        assert_eq!(
            cooked.error,
            Some(CookError::File("a.go:3:1: expected declaration".to_string()))
        );
        assert_eq!(cooked.invalid_go_files, vec!["a.go", "b.go"]);
        // parse errors keep whatever was recovered
        assert_eq!(cooked.go_files, vec!["a.go", "c.go"]);
        assert!(cooked.imports.contains("fmt"));
    }

    #[test]
    fn constraints_and_file_names_exclude() {
        let mut tagged = go_file("tagged.go", "p");
        tagged.go_build_constraint = "//go:build darwin || (linux && !cgo)".to_string();
        let mut legacy = go_file("legacy.go", "p");
        legacy.plus_build_constraints = vec![
            "// +build linux".to_string(),
            "// +build amd64,!foo".to_string(),
        ];
        let other = go_file("x_windows.go", "p");

        let cooked = cook_linux(vec![go_file("a.go", "p"), tagged, legacy, other]);
        assert_eq!(cooked.go_files, vec!["a.go", "legacy.go"]);
        assert_eq!(cooked.ignored_go_files, vec!["tagged.go", "x_windows.go"]);
        assert_eq!(
            cooked.all_tags,
            vec!["amd64", "cgo", "darwin", "foo", "linux", "windows"]
        );
    }

    #[test]
    fn use_all_files_keeps_excluded_files() {
        let mut tagged = go_file("tagged.go", "p");
        tagged.go_build_constraint = "//go:build ignore".to_string();
        let mut ctx = linux();
        ctx.use_all_files = true;
        let cooked = cook(
            &raw(vec![tagged, go_file("x_windows.go", "p")]),
            &ctx,
            ImportMode::empty(),
        )
        .unwrap();
        assert_eq!(cooked.go_files, vec!["tagged.go", "x_windows.go"]);
    }

    #[test]
    fn bad_go_build_line_is_fatal() {
        let mut broken = go_file("a.go", "p");
        broken.go_build_constraint = "//go:build linux &&".to_string();
        let err = cook(&raw(vec![broken]), &linux(), ImportMode::empty()).unwrap_err();
        assert!(matches!(err, IndexError::Constraint { ref file, .. } if file == "a.go"));
    }

    #[test]
    fn ignored_and_non_go_files() {
        let mut hidden = TaggedFile::new("_hidden.go");
        hidden.ignore_file = true;
        let mut readme = TaggedFile::new("README.md");
        readme.ignore_file = true;
        let mut doc = go_file("doc.go", DOCUMENTATION_PACKAGE);
        doc.synopsis = "Ignored.".to_string();

        let cooked = cook_linux(vec![
            hidden,
            readme,
            doc,
            go_file("a.go", "p"),
            TaggedFile::new("b.c"),
            TaggedFile::new("c_windows.h"),
            TaggedFile::new("z.S"),
            TaggedFile::new("a.s"),
            TaggedFile::new("blob.syso"),
        ]);
        assert_eq!(cooked.ignored_go_files, vec!["doc.go"]);
        assert_eq!(cooked.c_files, vec!["b.c"]);
        assert_eq!(cooked.s_files, vec!["a.s"]);
        assert_eq!(cooked.syso_files, vec!["blob.syso"]);
        // .S without cgo files is ignored, and the list is sorted
        assert_eq!(cooked.ignored_other_files, vec!["c_windows.h", "z.S"]);
        assert!(cooked.doc.is_empty());
    }

    #[test]
    fn cgo_files_and_directives() {
        let mut cgo = go_file("c.go", "p");
        cgo.imports = vec![FileImport {
            doc: "#cgo linux LDFLAGS: -lm\n#cgo CFLAGS: -Iinclude\n".to_string(),
            ..import(CGO_IMPORT, "c.go", 5)
        }];
        cgo.embeds.insert(
            "static".to_string(),
            vec![Position {
                filename: "c.go".to_string(),
                offset: 40,
                line: 8,
                column: 3,
            }],
        );
        let files = vec![go_file("a.go", "p"), cgo, TaggedFile::new("asm.S")];

        let cooked = cook_linux(files.clone());
        assert_eq!(cooked.cgo_files, vec!["c.go"]);
        assert_eq!(cooked.cgo.ldflags, vec!["-lm"]);
        assert_eq!(cooked.cgo.cflags, vec!["-I/src/p/include"]);
        assert_eq!(cooked.s_files, vec!["asm.S"]);
        assert!(cooked.imports.contains(CGO_IMPORT));
        assert_eq!(cooked.embeds.list, vec!["static"]);
        assert!(cooked.all_tags.contains(&"cgo".to_string()));

        let mut no_cgo = linux();
        no_cgo.cgo_enabled = false;
        let cooked = cook(&raw(files), &no_cgo, ImportMode::empty()).unwrap();
        assert!(cooked.cgo_files.is_empty());
        assert_eq!(cooked.ignored_go_files, vec!["c.go"]);
        assert!(!cooked.imports.contains(CGO_IMPORT));
        assert!(cooked.embeds.is_empty());
        assert_eq!(cooked.ignored_other_files, vec!["asm.S"]);
        assert!(cooked.all_tags.contains(&"cgo".to_string()));
    }

    #[test]
    fn cgo_in_test_and_bad_directive() {
        let mut test = go_file("a_test.go", "p");
        test.imports = vec![import(CGO_IMPORT, "a_test.go", 3)];
        let mut bad = go_file("b.go", "p");
        bad.imports = vec![FileImport {
            doc: "#cgo BOGUS: -x".to_string(),
            ..import(CGO_IMPORT, "b.go", 3)
        }];

        let cooked = cook_linux(vec![test, bad]);
        assert_eq!(
            cooked.error,
            Some(CookError::File(
                "use of cgo in test a_test.go not supported".to_string()
            ))
        );
        assert_eq!(cooked.invalid_go_files, vec!["a_test.go", "b.go"]);
        assert_eq!(cooked.test_go_files, vec!["a_test.go"]);
        assert_eq!(cooked.cgo_files, vec!["b.go"]);
    }

    #[test]
    fn import_comments() {
        let mut a = go_file("a.go", "p");
        a.quoted_import_comment = "\"example.com/p\"".to_string();
        a.quoted_import_comment_line = 1;
        let mut b = go_file("b.go", "p");
        b.quoted_import_comment = "\"example.com/q\"".to_string();
        b.quoted_import_comment_line = 1;
        let mut c = go_file("c.go", "p");
        c.quoted_import_comment = "\"unterminated".to_string();
        c.quoted_import_comment_line = 2;

        let files = vec![a, b, c];
        let cooked = cook(&raw(files.clone()), &linux(), ImportMode::IMPORT_COMMENT).unwrap();
        assert_eq!(cooked.import_comment, "example.com/p");
        assert_eq!(
            cooked.error,
            Some(CookError::File(
                "found import comments \"example.com/p\" (a.go) and \"example.com/q\" (b.go) in /src/p"
                    .to_string()
            ))
        );
        assert_eq!(cooked.invalid_go_files, vec!["b.go", "c.go"]);

        let unchecked = cook_linux(files);
        assert!(unchecked.import_comment.is_empty());
        assert_eq!(unchecked.error, None);
    }

    #[test]
    fn package_level_short_circuits() {
        let mut failed = raw(vec![go_file("a.go", "p")]);
        failed.error = "cannot find package \".\" in:\n\t/src/p".to_string();
        let cooked = cook(&failed, &linux(), ImportMode::empty()).unwrap();
        assert_eq!(cooked.error, Some(CookError::Package(failed.error.clone())));
        assert!(cooked.go_files.is_empty());

        let found = cook(&raw(vec![go_file("a.go", "p")]), &linux(), ImportMode::FIND_ONLY).unwrap();
        assert_eq!(found.dir, "/src/p");
        assert!(found.go_files.is_empty());
        assert_eq!(found.error, None);

        let mut binary = go_file("a.go", "p");
        binary.binary_only = true;
        let cooked = cook(&raw(vec![binary.clone()]), &linux(), ImportMode::ALLOW_BINARY).unwrap();
        assert!(cooked.binary_only);
        assert!(cooked.go_files.is_empty());
        let cooked = cook_linux(vec![binary]);
        assert!(cooked.binary_only);
        assert_eq!(cooked.go_files, vec!["a.go"]);
    }

    #[test]
    fn binary_only_marker_needs_a_built_file() {
        let mut excluded = go_file("stub.go", "p");
        excluded.binary_only = true;
        excluded.go_build_constraint = "//go:build ignore".to_string();
        let files = vec![excluded, go_file("a.go", "p")];

        let cooked = cook(&raw(files.clone()), &linux(), ImportMode::ALLOW_BINARY).unwrap();
        assert!(!cooked.binary_only);
        assert_eq!(cooked.go_files, vec!["a.go"]);
        assert_eq!(cooked.ignored_go_files, vec!["stub.go"]);

        let cooked = cook_linux(files);
        assert!(!cooked.binary_only);

        let mut windows_only = go_file("stub_windows.go", "p");
        windows_only.binary_only = true;
        let cooked = cook(&raw(vec![windows_only.clone()]), &linux(), ImportMode::ALLOW_BINARY).unwrap();
        assert!(!cooked.binary_only);
        let windows = BuildContext::for_target("windows", "amd64");
        let cooked = cook(&raw(vec![windows_only]), &windows, ImportMode::ALLOW_BINARY).unwrap();
        assert!(cooked.binary_only);
        assert!(cooked.go_files.is_empty());
        assert!(cooked.all_tags.is_empty());
    }

    #[test]
    fn unknown_compiler_is_reported_last() {
        let mut ctx = linux();
        ctx.compiler = "tinygo".to_string();
        let cooked = cook(&raw(vec![go_file("a.go", "p")]), &ctx, ImportMode::empty()).unwrap();
        assert_eq!(
            cooked.error,
            Some(CookError::UnknownCompiler {
                compiler: "tinygo".to_string()
            })
        );

        let cooked = cook(&raw(Vec::new()), &ctx, ImportMode::empty()).unwrap();
        assert!(matches!(cooked.error, Some(CookError::NoBuildableSources { .. })));
    }

    #[test]
    fn excluded_test_only_directory_has_no_sources() {
        let mut test = go_file("a_test.go", "p");
        test.go_build_constraint = "//go:build windows".to_string();
        let cooked = cook_linux(vec![test]);
        assert_eq!(cooked.ignored_go_files, vec!["a_test.go"]);
        assert_eq!(
            cooked.error,
            Some(CookError::NoBuildableSources {
                dir: "/src/p".to_string()
            })
        );
    }
}
