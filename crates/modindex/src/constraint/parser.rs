//! Build constraint parser and tokenizer.
//!
//! Accepts both comment forms:
//! - `//go:build linux && (amd64 || arm64)`
//! - `// +build linux,amd64 darwin` (space is OR, comma is AND)

use super::expression::ConstraintExpr;

const GO_BUILD_PREFIX: &str = "//go:build";
const PLUS_BUILD_PREFIX: &str = "+build";

/// A malformed constraint line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct SyntaxError(pub String);

type ParseResult<T> = std::result::Result<T, SyntaxError>;

// ---------------------------------------------------------------------------
// Line classification
// ---------------------------------------------------------------------------

/// Returns the expression text of a `//go:build` line.
fn split_go_build(line: &str) -> Option<&str> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    if line.contains('\n') || !line.starts_with(GO_BUILD_PREFIX) {
        return None;
    }
    let rest = &line.trim()[GO_BUILD_PREFIX.len()..];
    let trimmed = rest.trim();
    // the prefix must be followed by white space
    if rest.len() == trimmed.len() && !rest.is_empty() {
        return None;
    }
    Some(trimmed)
}

/// Returns the expression text of a `// +build` line.
fn split_plus_build(line: &str) -> Option<&str> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    if line.contains('\n') {
        return None;
    }
    let rest = line.strip_prefix("//")?.trim();
    let rest = rest.strip_prefix(PLUS_BUILD_PREFIX)?;
    let trimmed = rest.trim();
    if rest.len() == trimmed.len() && !rest.is_empty() {
        return None;
    }
    Some(trimmed)
}

pub fn is_go_build(line: &str) -> bool {
    split_go_build(line).is_some()
}

pub fn is_plus_build(line: &str) -> bool {
    split_plus_build(line).is_some()
}

// ---------------------------------------------------------------------------
// Token types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ConstraintToken {
    kind: ConstraintTokenKind,
    position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConstraintTokenKind {
    Tag(String),
    LParen,
    RParen,
    Bang,
    AndAnd,
    OrOr,
}

impl ConstraintTokenKind {
    fn describe(&self) -> String {
        match self {
            Self::Tag(name) => name.clone(),
            Self::LParen => "(".to_string(),
            Self::RParen => ")".to_string(),
            Self::Bang => "!".to_string(),
            Self::AndAnd => "&&".to_string(),
            Self::OrOr => "||".to_string(),
        }
    }
}

fn is_tag_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '.'
}

// ---------------------------------------------------------------------------
// Constraint parser
// ---------------------------------------------------------------------------

pub struct ConstraintParser {
    tokens: Vec<ConstraintToken>,
    index: usize,
}

impl ConstraintParser {
    /// Parses a full `//go:build` or `// +build` comment line.
    pub fn parse(line: &str) -> ParseResult<ConstraintExpr> {
        if let Some(text) = split_go_build(line) {
            return Self::parse_go_build_expr(text);
        }
        if let Some(text) = split_plus_build(line) {
            return Self::parse_plus_build_expr(text);
        }
        Err(SyntaxError("not a build constraint".to_string()))
    }

    /// Parses the expression part of a `//go:build` line.
    pub fn parse_go_build_expr(text: &str) -> ParseResult<ConstraintExpr> {
        let tokens = tokenize_go_build(text)?;
        let mut parser = Self { tokens, index: 0 };
        let expression = parser.parse_or_expression()?;
        if let Some(token) = parser.peek() {
            return Err(SyntaxError(format!(
                "unexpected token {} near byte {}",
                token.kind.describe(),
                token.position
            )));
        }
        Ok(expression)
    }

    /// Parses the argument part of a `// +build` line.
    pub fn parse_plus_build_expr(text: &str) -> ParseResult<ConstraintExpr> {
        let mut alternatives = Vec::new();
        for clause in text.split_whitespace() {
            let mut terms = Vec::new();
            for elem in clause.split(',') {
                let (negated, name) = match elem.strip_prefix('!') {
                    Some(rest) => (true, rest),
                    None => (false, elem),
                };
                if name.starts_with('!') {
                    return Err(SyntaxError(format!("invalid double negation in {elem:?}")));
                }
                if name.is_empty() || !name.chars().all(is_tag_char) {
                    return Err(SyntaxError(format!("invalid syntax at {elem:?}")));
                }
                let tag = ConstraintExpr::tag(name);
                terms.push(if negated {
                    ConstraintExpr::Not(Box::new(tag))
                } else {
                    tag
                });
            }
            alternatives.push(if terms.len() == 1 {
                terms.remove(0)
            } else {
                ConstraintExpr::And(terms)
            });
        }

        Ok(match alternatives.len() {
            // an empty +build line never matches
            0 => ConstraintExpr::tag("ignore"),
            1 => alternatives.remove(0),
            _ => ConstraintExpr::Or(alternatives),
        })
    }

    fn parse_or_expression(&mut self) -> ParseResult<ConstraintExpr> {
        let mut parts = vec![self.parse_and_expression()?];
        while self.consume(&ConstraintTokenKind::OrOr) {
            parts.push(self.parse_and_expression()?);
        }
        Ok(match parts.len() {
            1 => parts.remove(0),
            _ => ConstraintExpr::Or(parts),
        })
    }

    fn parse_and_expression(&mut self) -> ParseResult<ConstraintExpr> {
        let mut parts = vec![self.parse_not_expression()?];
        while self.consume(&ConstraintTokenKind::AndAnd) {
            parts.push(self.parse_not_expression()?);
        }
        Ok(match parts.len() {
            1 => parts.remove(0),
            _ => ConstraintExpr::And(parts),
        })
    }

    fn parse_not_expression(&mut self) -> ParseResult<ConstraintExpr> {
        if self.consume(&ConstraintTokenKind::Bang) {
            if matches!(
                self.peek().map(|token| &token.kind),
                Some(ConstraintTokenKind::Bang)
            ) {
                return Err(SyntaxError("double negation not allowed".to_string()));
            }
            let inner = self.parse_primary_expression()?;
            return Ok(ConstraintExpr::Not(Box::new(inner)));
        }
        self.parse_primary_expression()
    }

    fn parse_primary_expression(&mut self) -> ParseResult<ConstraintExpr> {
        let token = self
            .next()
            .ok_or_else(|| SyntaxError("unexpected end of expression".to_string()))?;

        match token.kind {
            ConstraintTokenKind::LParen => {
                let expression = self.parse_or_expression()?;
                if !self.consume(&ConstraintTokenKind::RParen) {
                    return Err(SyntaxError(format!(
                        "missing close paren for '(' at byte {}",
                        token.position
                    )));
                }
                Ok(expression)
            }
            ConstraintTokenKind::Tag(name) => Ok(ConstraintExpr::Tag(name)),
            other => Err(SyntaxError(format!(
                "unexpected token {} near byte {}",
                other.describe(),
                token.position
            ))),
        }
    }

    fn consume(&mut self, expected: &ConstraintTokenKind) -> bool {
        matches!(self.peek(), Some(token) if &token.kind == expected) && {
            self.index += 1;
            true
        }
    }

    fn peek(&self) -> Option<&ConstraintToken> {
        self.tokens.get(self.index)
    }

    fn next(&mut self) -> Option<ConstraintToken> {
        let token = self.tokens.get(self.index).cloned()?;
        self.index += 1;
        Some(token)
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

fn tokenize_go_build(input: &str) -> ParseResult<Vec<ConstraintToken>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((position, ch)) = chars.next() {
        if ch.is_whitespace() {
            continue;
        }
        let kind = match ch {
            '(' => ConstraintTokenKind::LParen,
            ')' => ConstraintTokenKind::RParen,
            '!' => ConstraintTokenKind::Bang,
            '&' | '|' => {
                if chars.next_if(|(_, next)| *next == ch).is_none() {
                    return Err(SyntaxError(format!(
                        "invalid syntax at byte {position}: expected {ch}{ch}"
                    )));
                }
                if ch == '&' {
                    ConstraintTokenKind::AndAnd
                } else {
                    ConstraintTokenKind::OrOr
                }
            }
            _ if is_tag_char(ch) => {
                let mut end = position + ch.len_utf8();
                while let Some((next_position, next)) = chars.next_if(|(_, c)| is_tag_char(*c)) {
                    end = next_position + next.len_utf8();
                }
                ConstraintTokenKind::Tag(input[position..end].to_string())
            }
            _ => {
                return Err(SyntaxError(format!(
                    "invalid syntax at byte {position}: unexpected {ch:?}"
                )))
            }
        };
        tokens.push(ConstraintToken { kind, position });
    }

    if tokens.is_empty() {
        return Err(SyntaxError("unexpected end of expression".to_string()));
    }
    Ok(tokens)
}
