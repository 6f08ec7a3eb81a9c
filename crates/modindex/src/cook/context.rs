//! Build context, import mode, and tag matching.

use std::collections::BTreeSet;
use std::env;
use std::path::Path;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::constraint::ConstraintParser;
use crate::error::{IndexError, Result};

const DEFAULT_COMPILER: &str = "gc";
const LATEST_RELEASE_MINOR: u32 = 22;

const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js", "linux",
    "nacl", "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows", "zos",
];

const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "amd64p32", "arm", "armbe", "arm64", "arm64be", "loong64", "mips", "mipsle",
    "mips64", "mips64le", "mips64p32", "mips64p32le", "ppc", "ppc64", "ppc64le", "riscv",
    "riscv64", "s390", "s390x", "sparc", "sparc64", "wasm",
];

/// Target platforms that also satisfy an older platform tag.
const PLATFORM_ALIASES: &[(&str, &str)] = &[
    ("android", "linux"),
    ("illumos", "solaris"),
    ("ios", "darwin"),
];

// ---------------------------------------------------------------------------
// Import mode
// ---------------------------------------------------------------------------

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ImportMode: u32 {
        /// Stop after the package-level fields; no file is classified.
        const FIND_ONLY      = 0b0001;
        /// Stop early for binary-only packages.
        const ALLOW_BINARY   = 0b0010;
        /// Check `// import "path"` comments on package clauses.
        const IMPORT_COMMENT = 0b0100;
        /// Accepted for parity with directory imports; a local cook never
        /// searches vendor trees.
        const IGNORE_VENDOR  = 0b1000;
    }
}

// ---------------------------------------------------------------------------
// Build context
// ---------------------------------------------------------------------------

/// Target description a raw package is cooked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildContext {
    pub goos: String,
    pub goarch: String,
    pub compiler: String,
    pub install_suffix: String,
    pub cgo_enabled: bool,
    /// Include files regardless of build constraints and file names.
    pub use_all_files: bool,
    pub build_tags: Vec<String>,
    pub tool_tags: Vec<String>,
    pub release_tags: Vec<String>,
}

impl Default for BuildContext {
    fn default() -> Self {
        let goos = host_os().to_string();
        let goarch = host_arch().to_string();
        Self {
            cgo_enabled: default_cgo(&goos, &goarch),
            goos,
            goarch,
            compiler: DEFAULT_COMPILER.to_string(),
            install_suffix: String::new(),
            use_all_files: false,
            build_tags: Vec::new(),
            tool_tags: Vec::new(),
            release_tags: (1..=LATEST_RELEASE_MINOR).map(|minor| format!("go1.{minor}")).collect(),
        }
    }
}

impl BuildContext {
    /// Context for an explicit platform with the default release tags.
    pub fn for_target(goos: impl Into<String>, goarch: impl Into<String>) -> Self {
        let goos = goos.into();
        let goarch = goarch.into();
        Self {
            cgo_enabled: default_cgo(&goos, &goarch),
            goos,
            goarch,
            ..Self::default()
        }
    }

    /// The host context overlaid with `GOOS`, `GOARCH`, `CGO_ENABLED` and
    /// `MODINDEX_TAGS` (comma separated) from the environment.
    pub fn from_env() -> Result<Self> {
        let mut ctx = Self::default();
        if let Some(goos) = env::var("GOOS").ok().filter(|value| !value.is_empty()) {
            ctx.goos = goos;
        }
        if let Some(goarch) = env::var("GOARCH").ok().filter(|value| !value.is_empty()) {
            ctx.goarch = goarch;
        }
        ctx.cgo_enabled = match env::var("CGO_ENABLED").ok().as_deref() {
            None | Some("") => default_cgo(&ctx.goos, &ctx.goarch),
            Some("1") => true,
            Some("0") => false,
            Some(other) => {
                return Err(IndexError::Config(format!(
                    "invalid CGO_ENABLED value {other:?}: must be 0 or 1"
                )))
            }
        };
        if let Ok(tags) = env::var("MODINDEX_TAGS") {
            ctx.build_tags = tags
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect();
        }
        Ok(ctx)
    }

    /// Reads a JSON context file. Missing fields take host defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|error| {
            IndexError::Config(format!("failed to read {}: {error}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|error| {
            IndexError::Config(format!("failed to parse {}: {error}", path.display()))
        })
    }

    /// Whether `name` is satisfied by this context.
    pub fn match_tag(&self, name: &str) -> bool {
        if self.cgo_enabled && name == "cgo" {
            return true;
        }
        if name == self.goos || name == self.goarch || name == self.compiler {
            return true;
        }
        if PLATFORM_ALIASES
            .iter()
            .any(|(goos, alias)| self.goos == *goos && name == *alias)
        {
            return true;
        }
        self.build_tags
            .iter()
            .chain(&self.tool_tags)
            .chain(&self.release_tags)
            .any(|tag| tag == name)
    }

    /// Evaluates `text` as either constraint syntax, without recording tags.
    /// Text containing any of `&|()` is read as a `//go:build` expression,
    /// anything else as `// +build` arguments. Malformed text never matches.
    pub fn match_auto(&self, text: &str) -> bool {
        let parsed = if text.contains(['&', '|', '(', ')']) {
            ConstraintParser::parse_go_build_expr(text)
        } else {
            ConstraintParser::parse_plus_build_expr(text)
        };
        parsed.is_ok_and(|expr| expr.eval(&mut |tag: &str| self.match_tag(tag)))
    }
}

fn default_cgo(goos: &str, goarch: &str) -> bool {
    !(goos == "js" || goos == "wasip1" || goos == "plan9" || goarch == "wasm")
}

fn host_os() -> &'static str {
    match env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

fn host_arch() -> &'static str {
    match env::consts::ARCH {
        "x86" => "386",
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "loongarch64" => "loong64",
        "powerpc" => "ppc",
        "powerpc64" if cfg!(target_endian = "little") => "ppc64le",
        "powerpc64" => "ppc64",
        "mips" if cfg!(target_endian = "little") => "mipsle",
        "mips64" if cfg!(target_endian = "little") => "mips64le",
        "wasm32" => "wasm",
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Tag recording
// ---------------------------------------------------------------------------

/// Tag predicate of one cook: answers through [`BuildContext::match_tag`]
/// and records every name it is asked about.
#[derive(Debug)]
pub struct TagMatcher<'a> {
    ctx: &'a BuildContext,
    seen: BTreeSet<String>,
}

impl<'a> TagMatcher<'a> {
    pub fn new(ctx: &'a BuildContext) -> Self {
        Self {
            ctx,
            seen: BTreeSet::new(),
        }
    }

    pub fn matches(&mut self, name: &str) -> bool {
        if !self.seen.contains(name) {
            self.seen.insert(name.to_string());
        }
        self.ctx.match_tag(name)
    }

    /// Consulted tags, sorted.
    pub fn into_tags(self) -> Vec<String> {
        self.seen.into_iter().collect()
    }

    /// Applies the `name_GOOS_GOARCH` file-name convention.
    ///
    /// Only the part after the first `_` counts, so `linux.go` is not
    /// constrained while `x_linux.go` is. A trailing `_test` is skipped.
    pub fn good_os_arch_file(&mut self, name: &str) -> bool {
        let stem = name.split('.').next().unwrap_or(name);
        let Some(underscore) = stem.find('_') else {
            return true;
        };
        let mut parts: Vec<&str> = stem[underscore..].split('_').collect();
        if parts.last() == Some(&"test") {
            parts.pop();
        }

        let n = parts.len();
        if n >= 2 && KNOWN_OS.contains(&parts[n - 2]) && KNOWN_ARCH.contains(&parts[n - 1]) {
            return self.matches(parts[n - 1]) && self.matches(parts[n - 2]);
        }
        if n >= 1 && (KNOWN_OS.contains(&parts[n - 1]) || KNOWN_ARCH.contains(&parts[n - 1])) {
            return self.matches(parts[n - 1]);
        }
        true
    }
}
