//! Fixed-prefix extraction for glob patterns.
//!
//! `preserve_dirs` needs to know which part of a matched path came from the
//! pattern's fixed prefix (everything before the recursive `**` segment) and
//! which part is the matched sub-directory structure. The prefix may itself
//! contain wildcards, so it is converted into an anchored regular expression
//! that matches the literal prefix actually present on disk.

use anyhow::{Context, Result};
use regex::Regex;

/// True if a path component contains glob metacharacters.
pub fn has_meta(component: &str) -> bool {
    component.contains(['*', '?', '[', '{'])
}

/// The longest leading run of literal (meta-free) components.
///
/// This is the directory the resolver starts walking from. Returns `""`
/// for patterns whose first component already contains a wildcard.
pub fn literal_prefix(pattern: &str) -> &str {
    let mut end = 0;
    for component in pattern.split('/') {
        if has_meta(component) {
            break;
        }
        end = if end == 0 {
            component.len()
        } else {
            end + 1 + component.len()
        };
    }
    &pattern[..end]
}

/// Build an anchored regex matching the pattern's prefix before `**`.
///
/// Wildcard tokens keep their matching semantics (`*` → any run, `?` → one
/// character, `{a,b}` → alternation); everything else is matched literally.
pub fn base_regex(pattern: &str) -> Result<Regex> {
    let prefix = pattern.split("**").next().unwrap_or_default();
    let mut expr = String::with_capacity(prefix.len() * 2 + 1);
    expr.push('^');

    let mut in_group = false;
    for ch in prefix.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push_str(".{1}"),
            '{' => {
                in_group = true;
                expr.push('(');
            }
            '}' => {
                in_group = false;
                expr.push(')');
            }
            ',' if in_group => expr.push('|'),
            '.' | '+' | '(' | ')' | '[' | ']' | '^' | '$' | '\\' | '|' => {
                expr.push('\\');
                expr.push(ch);
            }
            _ => expr.push(ch),
        }
    }

    Regex::new(&expr).with_context(|| format!("invalid pattern prefix in `{pattern}`"))
}
