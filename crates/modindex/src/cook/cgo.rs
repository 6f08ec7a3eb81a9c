//! `#cgo` directive parsing.
//!
//! A directive line in the preamble of `import "C"` looks like
//!
//! ```text
//! #cgo [GOOS/GOARCH conditions...] VERB: arguments...
//! ```

use std::path::Path;

use serde::Serialize;

use super::context::BuildContext;

const SRCDIR_PLACEHOLDER: &str = "${SRCDIR}";
const SAFE_BYTES: &[u8] =
    b"+-.,/0123456789=ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz:$@%! ~^";

/// Compiler and linker flags collected from `#cgo` directives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CgoFlags {
    pub cflags: Vec<String>,
    pub cppflags: Vec<String>,
    pub cxxflags: Vec<String>,
    pub fflags: Vec<String>,
    pub ldflags: Vec<String>,
    pub pkg_config: Vec<String>,
}

impl CgoFlags {
    /// Applies every directive in `preamble`, the doc text of `import "C"`.
    ///
    /// Stops at the first malformed line and returns its message.
    pub fn apply(
        &mut self,
        ctx: &BuildContext,
        filename: &str,
        dir: &str,
        preamble: &str,
    ) -> std::result::Result<(), String> {
        for orig in preamble.split('\n') {
            let line = orig.trim();
            let Some(rest) = line.strip_prefix("#cgo") else {
                continue;
            };
            if !rest.starts_with([' ', '\t']) {
                continue;
            }

            let invalid_line = || format!("{filename}: invalid #cgo line: {orig}");
            let (head, argstr) = rest.trim().split_once(':').ok_or_else(invalid_line)?;
            let fields: Vec<&str> = head.split_whitespace().collect();
            let Some((verb, conditions)) = fields.split_last() else {
                return Err(invalid_line());
            };
            if !conditions.is_empty() && !conditions.iter().any(|cond| ctx.match_auto(cond)) {
                continue;
            }

            let mut args = split_quoted(argstr).map_err(|_| invalid_line())?;
            for arg in args.iter_mut() {
                let (expanded, ok) = expand_src_dir(arg, dir);
                if !ok {
                    return Err(format!("{filename}: malformed #cgo argument: {expanded}"));
                }
                *arg = expanded;
            }

            let bucket = match *verb {
                "CFLAGS" => &mut self.cflags,
                "CPPFLAGS" => &mut self.cppflags,
                "CXXFLAGS" => &mut self.cxxflags,
                "FFLAGS" => &mut self.fflags,
                "LDFLAGS" => &mut self.ldflags,
                "pkg-config" => &mut self.pkg_config,
                _ => return Err(format!("{filename}: invalid #cgo verb: {orig}")),
            };
            if *verb != "pkg-config" {
                make_paths_absolute(&mut args, dir);
            }
            bucket.extend(args);
        }
        Ok(())
    }
}

/// Splits `s` into shell-like words: white space separates, single and
/// double quotes group, backslash escapes the next character.
pub(crate) fn split_quoted(s: &str) -> std::result::Result<Vec<String>, &'static str> {
    let mut args = Vec::new();
    let mut arg = String::new();
    let mut escaped = false;
    let mut quoted = false;
    let mut quote: Option<char> = None;

    for c in s.chars() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
            continue;
        } else if let Some(open) = quote {
            if c == open {
                quote = None;
                continue;
            }
        } else if c == '"' || c == '\'' {
            quoted = true;
            quote = Some(c);
            continue;
        } else if c.is_whitespace() {
            if quoted || !arg.is_empty() {
                quoted = false;
                args.push(std::mem::take(&mut arg));
            }
            continue;
        }
        arg.push(c);
    }
    if quoted || !arg.is_empty() {
        args.push(arg);
    }

    if quote.is_some() {
        return Err("unclosed quote");
    }
    if escaped {
        return Err("unfinished escaping");
    }
    Ok(args)
}

/// Replaces `${SRCDIR}` with `dir` and checks the result only contains
/// characters that are safe to hand to the C toolchain.
pub(crate) fn expand_src_dir(arg: &str, dir: &str) -> (String, bool) {
    let dir = dir.replace('\\', "/");
    let chunks: Vec<&str> = arg.split(SRCDIR_PLACEHOLDER).collect();
    if chunks.len() < 2 {
        return (arg.to_string(), safe_cgo_name(arg));
    }
    let ok = chunks.iter().all(|chunk| chunk.is_empty() || safe_cgo_name(chunk))
        && (dir.is_empty() || safe_cgo_name(&dir));
    let expanded = chunks.join(&dir);
    let ok = ok && !expanded.is_empty();
    (expanded, ok)
}

fn safe_cgo_name(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| !b.is_ascii() || SAFE_BYTES.contains(&b))
}

/// Rewrites relative `-I`/`-L` paths (joined or separate) against `dir`.
pub(crate) fn make_paths_absolute(args: &mut [String], dir: &str) {
    let mut next_is_path = false;
    for arg in args.iter_mut() {
        if next_is_path {
            if !Path::new(arg.as_str()).is_absolute() {
                *arg = Path::new(dir).join(arg.as_str()).to_string_lossy().into_owned();
            }
            next_is_path = false;
        } else if arg.starts_with("-I") || arg.starts_with("-L") {
            if arg.len() == 2 {
                next_is_path = true;
            } else if !Path::new(&arg[2..]).is_absolute() {
                let joined = Path::new(dir).join(&arg[2..]);
                *arg = format!("{}{}", &arg[..2], joined.to_string_lossy());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(goos: &str, goarch: &str) -> BuildContext {
        BuildContext::for_target(goos, goarch)
    }

    #[test]
    fn conditional_ldflags() {
        let preamble = "#cgo linux,amd64 LDFLAGS: -lm\n#include <math.h>\n";

        let mut flags = CgoFlags::default();
        flags.apply(&ctx("linux", "amd64"), "a.go", "/src/p", preamble).unwrap();
        assert_eq!(flags.ldflags, vec!["-lm"]);

        let mut flags = CgoFlags::default();
        flags.apply(&ctx("darwin", "amd64"), "a.go", "/src/p", preamble).unwrap();
        assert!(flags.ldflags.is_empty());
    }

    #[test]
    fn any_condition_may_match() {
        let preamble = "#cgo darwin linux CFLAGS: -DX=1";
        let mut flags = CgoFlags::default();
        flags.apply(&ctx("linux", "arm64"), "a.go", "/src/p", preamble).unwrap();
        assert_eq!(flags.cflags, vec!["-DX=1"]);
    }

    #[test]
    fn srcdir_and_relative_paths() {
        let preamble = "#cgo CFLAGS: -I${SRCDIR}/include -Iinc -I rel\n#cgo pkg-config: libpng";
        let mut flags = CgoFlags::default();
        flags.apply(&ctx("linux", "amd64"), "a.go", "/src/p", preamble).unwrap();
        assert_eq!(
            flags.cflags,
            vec!["-I/src/p/include", "-I/src/p/inc", "-I", "/src/p/rel"]
        );
        assert_eq!(flags.pkg_config, vec!["libpng"]);
    }

    #[test]
    fn malformed_lines() {
        let linux = ctx("linux", "amd64");
        let mut flags = CgoFlags::default();
        assert_eq!(
            flags.apply(&linux, "a.go", "/src/p", "#cgo LDFLAGS -lm").unwrap_err(),
            "a.go: invalid #cgo line: #cgo LDFLAGS -lm"
        );
        assert_eq!(
            flags.apply(&linux, "a.go", "/src/p", "#cgo FOOFLAGS: -x").unwrap_err(),
            "a.go: invalid #cgo verb: #cgo FOOFLAGS: -x"
        );
        assert_eq!(
            flags.apply(&linux, "a.go", "/src/p", "#cgo LDFLAGS: -l`rm`").unwrap_err(),
            "a.go: malformed #cgo argument: -l`rm`"
        );
        assert!(flags.apply(&linux, "a.go", "/src/p", "#cgo CFLAGS: \"-DX").is_err());
        // not a directive at all
        assert!(flags.apply(&linux, "a.go", "/src/p", "#cgoLDFLAGS: -lm").is_ok());
        assert!(flags.ldflags.is_empty());
    }

    #[test]
    fn split_quoted_words() {
        assert_eq!(
            split_quoted(r#"a "b c" 'd' e\ f"#).unwrap(),
            vec!["a", "b c", "d", "e f"]
        );
        assert_eq!(split_quoted("\"\"").unwrap(), vec![""]);
        assert!(split_quoted("'open").is_err());
        assert!(split_quoted("trail\\").is_err());
    }

    #[test]
    fn expand_rejects_unsafe_names() {
        assert_eq!(expand_src_dir("-lfoo", "/x"), ("-lfoo".to_string(), true));
        assert_eq!(
            expand_src_dir("${SRCDIR}/lib", "/x"),
            ("/x/lib".to_string(), true)
        );
        assert!(!expand_src_dir("${SRCDIR}", "/x y;z").1);
        assert!(!expand_src_dir("${SRCDIR}", "").1);
        assert!(!expand_src_dir("", "/x").1);
    }
}
