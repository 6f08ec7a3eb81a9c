//! Source file header extraction.
//!
//! The raw scanner hands each file's bytes to a [`HeaderScanner`]. The
//! default [`GoHeaderScanner`] reads only what package discovery needs:
//! leading constraint comments, the package clause and its doc comment, the
//! import comment, import declarations, and `//go:embed` patterns.

use std::path::Path;

use memchr::memchr;
use memchr::memmem;

use crate::constraint::{is_go_build, is_plus_build};
use crate::types::{Embed, FileImport, Position};

const BINARY_ONLY_COMMENT: &str = "//go:binary-only-package";
const EMBED_DIRECTIVE: &str = "//go:embed";

/// Header facts of one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileHeader {
    pub package_name: String,
    pub synopsis: String,
    pub go_build_constraint: String,
    pub plus_build_constraints: Vec<String>,
    pub binary_only: bool,
    pub quoted_import_comment: String,
    pub quoted_import_comment_line: u32,
    pub imports: Vec<FileImport>,
    pub embeds: Vec<Embed>,
    /// Set when the source is malformed; the other fields hold whatever
    /// could be recovered before the error.
    pub parse_error: Option<String>,
}

/// Extracts header facts from a file's content.
///
/// `Err` is a hard failure for the file (for example two `//go:build`
/// lines); syntax problems are reported through `FileHeader::parse_error`.
pub trait HeaderScanner: Sync {
    fn scan_header(
        &self,
        name: &str,
        path: &Path,
        content: &[u8],
    ) -> std::result::Result<FileHeader, String>;
}

/// Header scanner for Go sources and the assembly/C files next to them.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoHeaderScanner;

impl HeaderScanner for GoHeaderScanner {
    fn scan_header(
        &self,
        name: &str,
        path: &Path,
        content: &[u8],
    ) -> std::result::Result<FileHeader, String> {
        let constraints = parse_file_header(content).map_err(|message| format!("{name}: {message}"))?;

        let mut header = FileHeader {
            binary_only: constraints.binary_only,
            ..FileHeader::default()
        };
        match constraints.go_build {
            Some(line) => header.go_build_constraint = line,
            None => header.plus_build_constraints = plus_build_lines(&content[..constraints.end]),
        }

        if !name.ends_with(".go") {
            return Ok(header);
        }

        let filename = path.to_string_lossy().into_owned();
        let source = match std::str::from_utf8(content) {
            Ok(source) => source,
            Err(error) => {
                header.parse_error = Some(format!(
                    "{filename}: invalid UTF-8 encoding at byte {}",
                    error.valid_up_to()
                ));
                return Ok(header);
            }
        };

        GoFileReader::new(source, filename).read(&mut header);
        Ok(header)
    }
}

// ---------------------------------------------------------------------------
// Leading comment block
// ---------------------------------------------------------------------------

struct HeaderConstraints {
    /// End of the leading comment block, cut at its last blank line.
    end: usize,
    go_build: Option<String>,
    binary_only: bool,
}

/// Scans the leading run of `//` comments and blank lines.
///
/// `// +build` lines only count when the block is followed by a blank line,
/// so the block is cut at the last blank line seen before the first
/// non-comment line. `//go:build` lines count anywhere in the block.
fn parse_file_header(content: &[u8]) -> std::result::Result<HeaderConstraints, String> {
    let mut end = 0;
    let mut rest = content;
    let mut ended = false;
    let mut in_slash_star = false;
    let mut go_build: Option<String> = None;
    let mut binary_only = false;

    'lines: while !rest.is_empty() {
        let line = match memchr(b'\n', rest) {
            Some(i) => {
                let line = &rest[..i];
                rest = &rest[i + 1..];
                line
            }
            None => std::mem::take(&mut rest),
        };
        let mut line = line.trim_ascii();
        if line.is_empty() && !ended {
            end = content.len() - rest.len();
            continue;
        }
        if !line.starts_with(b"//") {
            ended = true;
        }
        if !in_slash_star {
            let text = String::from_utf8_lossy(line);
            if is_go_build(&text) {
                if go_build.is_some() {
                    return Err("multiple //go:build comments".to_string());
                }
                go_build = Some(text.into_owned());
            } else if text == BINARY_ONLY_COMMENT {
                binary_only = true;
            }
        }

        while !line.is_empty() {
            if in_slash_star {
                match memmem::find(line, b"*/") {
                    Some(i) => {
                        in_slash_star = false;
                        line = line[i + 2..].trim_ascii();
                        continue;
                    }
                    None => continue 'lines,
                }
            }
            if line.starts_with(b"//") {
                continue 'lines;
            }
            if line.starts_with(b"/*") {
                in_slash_star = true;
                line = line[2..].trim_ascii();
                continue;
            }
            break 'lines;
        }
    }

    Ok(HeaderConstraints {
        end,
        go_build,
        binary_only,
    })
}

fn plus_build_lines(block: &[u8]) -> Vec<String> {
    block
        .split(|byte| *byte == b'\n')
        .map(|line| line.trim_ascii())
        .filter(|line| line.starts_with(b"//") && memmem::find(line, b"+build").is_some())
        .map(|line| String::from_utf8_lossy(line).into_owned())
        .filter(|text| is_plus_build(text))
        .collect()
}

// ---------------------------------------------------------------------------
// Go source reader
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Ident,
    Str,
    Punct,
    Eof,
}

#[derive(Debug, Clone)]
struct Token<'a> {
    kind: TokenKind,
    text: &'a str,
    offset: usize,
    line: u32,
    column: u32,
    /// Lead comment group ending on the line right above the token.
    doc: Option<String>,
}

#[derive(Debug, Default)]
struct CommentGroup<'a> {
    comments: Vec<&'a str>,
    end_line: u32,
    /// Started on the line of the previous token, so it cannot be a lead
    /// comment of the next one.
    trailing: bool,
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
    line_start: usize,
    last_token_line: u32,
    group: CommentGroup<'a>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            line_start: 0,
            last_token_line: 0,
            group: CommentGroup::default(),
        }
    }

    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    fn column(&self, offset: usize) -> u32 {
        (offset - self.line_start + 1) as u32
    }

    fn push_comment(&mut self, text: &'a str, start_line: u32, end_line: u32) {
        let continues = !self.group.comments.is_empty()
            && !self.group.trailing
            && start_line <= self.group.end_line + 1;
        if !continues {
            self.group = CommentGroup {
                comments: Vec::new(),
                end_line,
                trailing: start_line == self.last_token_line,
            };
        }
        self.group.comments.push(text);
        self.group.end_line = end_line;
    }

    fn skip_space_and_comments(&mut self) -> std::result::Result<(), String> {
        let bytes = self.bytes();
        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'\n' => {
                    self.pos += 1;
                    self.line += 1;
                    self.line_start = self.pos;
                }
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'/' if bytes.get(self.pos + 1) == Some(&b'/') => {
                    let start = self.pos;
                    let end = memchr(b'\n', &bytes[start..]).map_or(bytes.len(), |i| start + i);
                    self.push_comment(&self.src[start..end], self.line, self.line);
                    self.pos = end;
                }
                b'/' if bytes.get(self.pos + 1) == Some(&b'*') => {
                    let start = self.pos;
                    let start_line = self.line;
                    let Some(close) = memmem::find(&bytes[start + 2..], b"*/") else {
                        return Err(format!(
                            "{}:{}: comment not terminated",
                            self.line,
                            self.column(start)
                        ));
                    };
                    let end = start + 2 + close + 2;
                    for (i, byte) in bytes[start..end].iter().enumerate() {
                        if *byte == b'\n' {
                            self.line += 1;
                            self.line_start = start + i + 1;
                        }
                    }
                    self.push_comment(&self.src[start..end], start_line, self.line);
                    self.pos = end;
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn next_token(&mut self) -> std::result::Result<Token<'a>, String> {
        self.skip_space_and_comments()?;
        let group = std::mem::take(&mut self.group);
        let doc = (!group.comments.is_empty() && !group.trailing && group.end_line + 1 == self.line)
            .then(|| comment_text(&group.comments));

        let start = self.pos;
        let line = self.line;
        let column = self.column(start);
        self.last_token_line = line;
        let bytes = self.bytes();

        let kind = match bytes.get(start) {
            None => TokenKind::Eof,
            Some(b'"') => {
                let mut i = start + 1;
                loop {
                    match bytes.get(i) {
                        None | Some(b'\n') => {
                            return Err(format!("{line}:{column}: string literal not terminated"))
                        }
                        Some(b'\\') => i += 2,
                        Some(b'"') => break,
                        Some(_) => i += 1,
                    }
                }
                self.pos = i + 1;
                TokenKind::Str
            }
            Some(b'`') => {
                let Some(close) = memchr(b'`', &bytes[start + 1..]) else {
                    return Err(format!("{line}:{column}: raw string literal not terminated"));
                };
                let end = start + 1 + close + 1;
                for (i, byte) in bytes[start..end].iter().enumerate() {
                    if *byte == b'\n' {
                        self.line += 1;
                        self.line_start = start + i + 1;
                    }
                }
                self.pos = end;
                TokenKind::Str
            }
            Some(_) => {
                let ch = self.src[start..].chars().next().unwrap_or('\0');
                if ch.is_alphabetic() || ch == '_' {
                    let end = self.src[start..]
                        .char_indices()
                        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
                        .map_or(self.src.len(), |(i, _)| start + i);
                    self.pos = end;
                    TokenKind::Ident
                } else {
                    self.pos = start + ch.len_utf8();
                    TokenKind::Punct
                }
            }
        };

        Ok(Token {
            kind,
            text: &self.src[start..self.pos],
            offset: start,
            line,
            column,
            doc,
        })
    }
}

struct GoFileReader<'a> {
    lexer: Lexer<'a>,
    filename: String,
    peeked: Option<Token<'a>>,
}

impl<'a> GoFileReader<'a> {
    fn new(src: &'a str, filename: String) -> Self {
        Self {
            lexer: Lexer::new(src),
            filename,
            peeked: None,
        }
    }

    fn peek(&mut self) -> std::result::Result<&Token<'a>, String> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token()?);
        }
        self.peeked
            .as_ref()
            .ok_or_else(|| "lexer produced no token".to_string())
    }

    fn next(&mut self) -> std::result::Result<Token<'a>, String> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.lexer.next_token(),
        }
    }

    fn position(&self, token: &Token<'_>) -> Position {
        Position {
            filename: self.filename.clone(),
            offset: token.offset as u32,
            line: token.line,
            column: token.column,
        }
    }

    fn syntax_error(&self, token: &Token<'_>, message: &str) -> String {
        format!("{}:{}:{}: {message}", self.filename, token.line, token.column)
    }

    fn read(mut self, header: &mut FileHeader) {
        if let Err(message) = self.read_header(header) {
            let message = if message.starts_with(&self.filename) {
                message
            } else {
                format!("{}:{message}", self.filename)
            };
            header.parse_error = Some(message);
            return;
        }

        if header.imports.iter().any(|import| import.path == "embed") {
            header.embeds = find_embeds(self.lexer.src, &self.filename);
        }
    }

    fn read_header(&mut self, header: &mut FileHeader) -> std::result::Result<(), String> {
        let keyword = self.next()?;
        if keyword.kind != TokenKind::Ident || keyword.text != "package" {
            return Err(self.syntax_error(&keyword, &format!("expected 'package', found {}", describe(&keyword))));
        }
        if let Some(doc) = &keyword.doc {
            header.synopsis = synopsis(doc);
        }

        let name = self.next()?;
        if name.kind != TokenKind::Ident {
            return Err(self.syntax_error(&name, &format!("expected package name, found {}", describe(&name))));
        }
        header.package_name = name.text.to_string();

        if let Some(quoted) = find_import_comment(&self.lexer.src[name.offset + name.text.len()..]) {
            header.quoted_import_comment = quoted.to_string();
            header.quoted_import_comment_line = name.line;
        }

        self.skip_semicolon()?;
        loop {
            let token = self.peek()?;
            if token.kind != TokenKind::Ident || token.text != "import" {
                return Ok(());
            }
            let keyword = self.next()?;
            if self.peek()?.text == "(" {
                self.next()?;
                let mut specs = Vec::new();
                loop {
                    if self.peek()?.text == ")" {
                        self.next()?;
                        break;
                    }
                    specs.push(self.read_import_spec(header)?);
                    self.skip_semicolon()?;
                }
                // a lone spec in parentheses inherits the declaration's doc
                if let [index] = specs.as_slice() {
                    if let Some(import) = header.imports.get_mut(*index) {
                        if import.doc.is_empty() {
                            import.doc = keyword.doc.clone().unwrap_or_default();
                        }
                    }
                }
            } else {
                let index = self.read_import_spec(header)?;
                if let Some(import) = header.imports.get_mut(index) {
                    if import.doc.is_empty() {
                        import.doc = keyword.doc.clone().unwrap_or_default();
                    }
                }
            }
            self.skip_semicolon()?;
        }
    }

    /// Reads `[name] "path"` and returns the index of the recorded import.
    fn read_import_spec(&mut self, header: &mut FileHeader) -> std::result::Result<usize, String> {
        let mut token = self.next()?;
        let start = token.clone();
        if token.kind == TokenKind::Ident || token.text == "." {
            token = self.next()?;
        }
        if token.kind != TokenKind::Str {
            return Err(self.syntax_error(&token, &format!("expected import path, found {}", describe(&token))));
        }
        let path = unquote(token.text)
            .ok_or_else(|| self.syntax_error(&token, &format!("invalid quoted import path {}", token.text)))?;
        if !is_valid_import(&path) {
            header.imports.clear();
            return Err(self.syntax_error(&token, &format!("invalid import path: {path}")));
        }
        header.imports.push(FileImport {
            path,
            doc: start.doc.clone().unwrap_or_default(),
            position: self.position(&start),
        });
        Ok(header.imports.len() - 1)
    }

    fn skip_semicolon(&mut self) -> std::result::Result<(), String> {
        if self.peek()?.text == ";" {
            self.next()?;
        }
        Ok(())
    }
}

fn describe(token: &Token<'_>) -> String {
    match token.kind {
        TokenKind::Eof => "EOF".to_string(),
        _ => format!("'{}'", token.text),
    }
}

/// Finds `// import "path"` or `/* import "path" */` right after the
/// package name, on the same line.
fn find_import_comment(after_name: &str) -> Option<&str> {
    let line = after_name.split('\n').next()?.trim_start();
    let line = line.strip_prefix(';').unwrap_or(line).trim_start();
    let body = if let Some(rest) = line.strip_prefix("//") {
        rest
    } else {
        let rest = line.strip_prefix("/*")?;
        &rest[..rest.find("*/")?]
    };
    let body = body.trim_start().strip_prefix("import")?;
    if !body.starts_with([' ', '\t']) {
        return None;
    }
    let body = body.trim();
    let quote = body.chars().next()?;
    if quote != '"' && quote != '`' {
        return None;
    }
    let close = body[1..].find(quote)? + 1;
    Some(&body[..=close])
}

fn is_valid_import(path: &str) -> bool {
    const ILLEGAL: &str = "!\"#$%&'()*,:;<=>?[\\]^{|}`\u{FFFD}";
    !path.is_empty()
        && path
            .chars()
            .all(|c| !c.is_control() && !c.is_whitespace() && !ILLEGAL.contains(c))
}

// ---------------------------------------------------------------------------
// Embed directives
// ---------------------------------------------------------------------------

fn find_embeds(src: &str, filename: &str) -> Vec<Embed> {
    let mut scanner = EmbedScanner {
        src,
        filename,
        pos: 0,
        line: 1,
        line_start: 0,
        embeds: Vec::new(),
    };
    scanner.run();
    scanner.embeds
}

/// Walks a whole file looking for `//go:embed` comments that start a line.
/// String, rune and raw string literals and `/* */` comments are skipped.
struct EmbedScanner<'a> {
    src: &'a str,
    filename: &'a str,
    pos: usize,
    line: u32,
    line_start: usize,
    embeds: Vec<Embed>,
}

impl EmbedScanner<'_> {
    fn run(&mut self) {
        let src = self.src;
        let bytes = src.as_bytes();
        let mut start_of_line = true;
        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'\n' => {
                    self.pos += 1;
                    self.line += 1;
                    self.line_start = self.pos;
                    start_of_line = true;
                }
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'/' if bytes.get(self.pos + 1) == Some(&b'/') => {
                    let end = memchr(b'\n', &bytes[self.pos..])
                        .map_or(bytes.len(), |n| self.pos + n);
                    if start_of_line {
                        self.directive(self.pos, end);
                    }
                    self.pos = end;
                }
                b'/' if bytes.get(self.pos + 1) == Some(&b'*') => {
                    let body = self.pos + 2;
                    let end = memmem::find(&bytes[body..], b"*/")
                        .map_or(bytes.len(), |n| body + n + 2);
                    self.skip_to(end);
                    start_of_line = false;
                }
                b'`' => {
                    let body = self.pos + 1;
                    let end = memchr(b'`', &bytes[body..]).map_or(bytes.len(), |n| body + n + 1);
                    self.skip_to(end);
                    start_of_line = false;
                }
                quote @ (b'"' | b'\'') => {
                    let mut end = self.pos + 1;
                    while end < bytes.len() {
                        match bytes[end] {
                            b'\\' => end += 2,
                            b'\n' => break,
                            b if b == quote => {
                                end += 1;
                                break;
                            }
                            _ => end += 1,
                        }
                    }
                    self.pos = end.min(bytes.len());
                    start_of_line = false;
                }
                _ => {
                    self.pos += 1;
                    start_of_line = false;
                }
            }
        }
    }

    /// Moves to `end`, keeping line bookkeeping across skipped newlines.
    fn skip_to(&mut self, end: usize) {
        let span = &self.src.as_bytes()[self.pos..end];
        let newlines = memchr::memchr_iter(b'\n', span).count();
        if let Some(last) = memchr::memrchr(b'\n', span) {
            self.line += newlines as u32;
            self.line_start = self.pos + last + 1;
        }
        self.pos = end;
    }

    /// Records the patterns of the line comment at `start..end` if it is a
    /// `//go:embed` directive.
    fn directive(&mut self, start: usize, end: usize) {
        let comment = self.src[start..end].trim_end_matches('\r');
        let Some(args) = comment.strip_prefix(EMBED_DIRECTIVE) else {
            return;
        };
        if !args.starts_with([' ', '\t']) {
            return;
        }
        let args_offset = start + EMBED_DIRECTIVE.len();
        for (at, pattern) in split_embed_patterns(args) {
            let offset = args_offset + at;
            self.embeds.push(Embed {
                pattern,
                position: Position {
                    filename: self.filename.to_string(),
                    offset: offset as u32,
                    line: self.line,
                    column: (offset - self.line_start + 1) as u32,
                },
            });
        }
    }
}

/// Splits `//go:embed` arguments, honouring Go string quoting.
fn split_embed_patterns(args: &str) -> Vec<(usize, String)> {
    let mut patterns = Vec::new();
    let mut rest = args;
    let mut consumed = 0usize;
    loop {
        let trimmed = rest.trim_start();
        consumed += rest.len() - trimmed.len();
        rest = trimmed;
        let Some(first) = rest.chars().next() else {
            break;
        };
        let length = if first == '"' || first == '`' {
            let mut end = None;
            let mut escaped = false;
            for (i, c) in rest.char_indices().skip(1) {
                if escaped {
                    escaped = false;
                } else if c == '\\' && first == '"' {
                    escaped = true;
                } else if c == first {
                    end = Some(i + 1);
                    break;
                }
            }
            let Some(end) = end else {
                break;
            };
            match unquote(&rest[..end]) {
                Some(pattern) => patterns.push((consumed, pattern)),
                None => break,
            }
            end
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            patterns.push((consumed, rest[..end].to_string()));
            end
        };
        consumed += length;
        rest = &rest[length..];
    }
    patterns
}

// ---------------------------------------------------------------------------
// Comment text
// ---------------------------------------------------------------------------

/// Text of a comment group with comment markers removed.
fn comment_text(comments: &[&str]) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for comment in comments {
        let body = if let Some(body) = comment.strip_prefix("//") {
            if let Some(stripped) = body.strip_prefix(' ') {
                stripped
            } else if is_directive(body) {
                continue;
            } else {
                body
            }
        } else {
            comment
                .strip_prefix("/*")
                .and_then(|body| body.strip_suffix("*/"))
                .unwrap_or(comment)
        };
        lines.extend(body.split('\n').map(str::trim_end));
    }

    let mut out: Vec<&str> = Vec::new();
    for line in lines {
        if line.is_empty() && out.last().map_or(true, |last| last.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|last| last.is_empty()) {
        out.pop();
    }
    if out.is_empty() {
        return String::new();
    }
    let mut text = out.join("\n");
    text.push('\n');
    text
}

/// `//go:generate`, `//line ...`, `//export f` and friends.
fn is_directive(body: &str) -> bool {
    if body.starts_with("line ") || body.starts_with("extern ") || body.starts_with("export ") {
        return true;
    }
    let Some(colon) = body.find(':') else {
        return false;
    };
    if colon == 0 || colon + 1 >= body.len() {
        return false;
    }
    let (prefix, rest) = (&body[..colon], &body[colon + 1..]);
    prefix.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        && rest.as_bytes()[0].is_ascii_lowercase()
}

/// First sentence of a package comment with white space collapsed.
pub fn synopsis(text: &str) -> String {
    let sentence = &text[..first_sentence_len(text)];
    let collapsed = sentence.split_whitespace().collect::<Vec<_>>().join(" ");
    let lower = collapsed.to_lowercase();
    if ["copyright", "all rights", "author"]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
    {
        return String::new();
    }
    collapsed.replace("``", "\u{201c}").replace("''", "\u{201d}")
}

fn first_sentence_len(text: &str) -> usize {
    let (mut ppp, mut pp, mut p) = ('\0', '\0', '\0');
    for (i, mut q) in text.char_indices() {
        if matches!(q, '\n' | '\r' | '\t') {
            q = ' ';
        }
        if q == ' ' && p == '.' && (!pp.is_uppercase() || ppp.is_uppercase()) {
            return i;
        }
        if p == '\u{3002}' || p == '\u{FF0E}' {
            return i;
        }
        (ppp, pp, p) = (pp, p, q);
    }
    text.len()
}

// ---------------------------------------------------------------------------
// String literals
// ---------------------------------------------------------------------------

/// Unquotes a Go string literal (`"..."` with escapes, or `` `...` ``).
pub fn unquote(literal: &str) -> Option<String> {
    if literal.len() < 2 {
        return None;
    }
    if let Some(raw) = literal.strip_prefix('`') {
        let raw = raw.strip_suffix('`')?;
        if raw.contains('`') {
            return None;
        }
        return Some(raw.replace('\r', ""));
    }
    let body = literal.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' | '\n' => return None,
            '\\' => {
                let escaped = chars.next()?;
                let value = match escaped {
                    'a' => '\u{7}',
                    'b' => '\u{8}',
                    'f' => '\u{c}',
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    'v' => '\u{b}',
                    '\\' => '\\',
                    '"' => '"',
                    'x' => hex_escape(&mut chars, 2)?,
                    'u' => hex_escape(&mut chars, 4)?,
                    'U' => hex_escape(&mut chars, 8)?,
                    '0'..='7' => {
                        let mut value = escaped.to_digit(8)?;
                        for _ in 0..2 {
                            value = value * 8 + chars.next()?.to_digit(8)?;
                        }
                        if value > 255 {
                            return None;
                        }
                        char::from_u32(value)?
                    }
                    _ => return None,
                };
                out.push(value);
            }
            c => out.push(c),
        }
    }
    Some(out)
}

fn hex_escape(chars: &mut std::str::Chars<'_>, digits: usize) -> Option<char> {
    let mut value = 0u32;
    for _ in 0..digits {
        value = value * 16 + chars.next()?.to_digit(16)?;
    }
    char::from_u32(value)
}
