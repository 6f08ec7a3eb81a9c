//! Build constraint expression types.

/// A parsed build constraint (AST node).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintExpr {
    Tag(String),
    Not(Box<ConstraintExpr>),
    And(Vec<ConstraintExpr>),
    Or(Vec<ConstraintExpr>),
}

impl ConstraintExpr {
    pub fn tag(name: impl Into<String>) -> Self {
        Self::Tag(name.into())
    }

    /// Evaluates the expression, asking `ok` about each tag.
    ///
    /// Every tag in the expression is passed to `ok` exactly once per
    /// occurrence, even when the result is already decided, so callers that
    /// record consulted tags see all of them.
    pub fn eval<F>(&self, ok: &mut F) -> bool
    where
        F: FnMut(&str) -> bool,
    {
        match self {
            Self::Tag(name) => ok(name),
            Self::Not(inner) => !inner.eval(ok),
            Self::And(parts) => {
                let mut result = true;
                for part in parts {
                    result &= part.eval(ok);
                }
                result
            }
            Self::Or(parts) => {
                let mut result = false;
                for part in parts {
                    result |= part.eval(ok);
                }
                result
            }
        }
    }

    /// Tag names in the order `eval` would consult them.
    pub fn tags(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_tags(self, &mut out);
        out
    }
}

fn collect_tags<'a>(expression: &'a ConstraintExpr, out: &mut Vec<&'a str>) {
    match expression {
        ConstraintExpr::Tag(name) => out.push(name),
        ConstraintExpr::Not(inner) => collect_tags(inner, out),
        ConstraintExpr::And(parts) | ConstraintExpr::Or(parts) => {
            for part in parts {
                collect_tags(part, out);
            }
        }
    }
}

impl std::fmt::Display for ConstraintExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tag(name) => f.write_str(name),
            Self::Not(inner) => match inner.as_ref() {
                Self::Tag(_) | Self::Not(_) => write!(f, "!{inner}"),
                _ => write!(f, "!({inner})"),
            },
            Self::And(parts) => write_joined(f, parts, " && ", |part| {
                matches!(part, Self::Or(_))
            }),
            Self::Or(parts) => write_joined(f, parts, " || ", |_| false),
        }
    }
}

fn write_joined(
    f: &mut std::fmt::Formatter<'_>,
    parts: &[ConstraintExpr],
    separator: &str,
    needs_parens: impl Fn(&ConstraintExpr) -> bool,
) -> std::fmt::Result {
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        if needs_parens(part) {
            write!(f, "({part})")?;
        } else {
            write!(f, "{part}")?;
        }
    }
    Ok(())
}
