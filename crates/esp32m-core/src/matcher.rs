//! String matchers used to select devices, log sources and paths.
//!
//! Supported expressions:
//! - Exact: "wifi"
//! - Substring: "wif" matches "wifi-sta"
//! - Regex: "^dev/.+$" or the serialized form "/^dev\/.+$/i"
//! - Wildcard: "dev/*" (one segment), "dev/**" (any depth), "sensor?" (one char)

use regex::{Regex, RegexBuilder};

/// How an expression is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Exact,
    Substring,
    Regex,
    Wildcard,
}

/// Errors that can occur when creating a matcher.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MatcherError {
    #[error("Invalid regex '{expr}': {reason}")]
    InvalidRegex { expr: String, reason: String },
}

/// A compiled match expression.
#[derive(Debug, Clone)]
pub struct Matcher {
    kind: MatchType,
    expr: String,
    regex: Option<Regex>,
}

impl Matcher {
    pub fn new(expr: &str, kind: MatchType) -> Result<Self, MatcherError> {
        let regex = match kind {
            MatchType::Exact | MatchType::Substring => None,
            MatchType::Regex => Some(deserialize_regex(expr)?),
            MatchType::Wildcard => Some(compile(&format!("^{}$", wildcard_to_regex(expr)), expr)?),
        };
        Ok(Self {
            kind,
            expr: expr.to_string(),
            regex,
        })
    }

    pub fn exact(expr: &str) -> Self {
        Self {
            kind: MatchType::Exact,
            expr: expr.to_string(),
            regex: None,
        }
    }

    pub fn substring(expr: &str) -> Self {
        Self {
            kind: MatchType::Substring,
            expr: expr.to_string(),
            regex: None,
        }
    }

    pub fn test(&self, s: &str) -> bool {
        match self.kind {
            MatchType::Exact => self.expr == s,
            MatchType::Substring => !self.expr.is_empty() && s.contains(&self.expr),
            MatchType::Regex | MatchType::Wildcard => {
                self.regex.as_ref().is_some_and(|re| re.is_match(s))
            }
        }
    }

    pub fn match_type(&self) -> MatchType {
        self.kind
    }

    /// Get the raw expression.
    pub fn as_str(&self) -> &str {
        &self.expr
    }
}

fn compile(pattern: &str, expr: &str) -> Result<Regex, MatcherError> {
    Regex::new(pattern).map_err(|e| MatcherError::InvalidRegex {
        expr: expr.to_string(),
        reason: e.to_string(),
    })
}

/// Accepts a plain pattern or the `/body/flags` form.
fn deserialize_regex(expr: &str) -> Result<Regex, MatcherError> {
    let serialized = expr
        .strip_prefix('/')
        .and_then(|rest| rest.rsplit_once('/'))
        .filter(|(_, flags)| flags.chars().all(|c| c.is_ascii_alphabetic()));

    let Some((body, flags)) = serialized else {
        return compile(expr, expr);
    };

    RegexBuilder::new(body)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .build()
        .map_err(|e| MatcherError::InvalidRegex {
            expr: expr.to_string(),
            reason: e.to_string(),
        })
}

const SEPARATOR_MATCHER: &str = r"[/\\]";
const WILDCARD: &str = r"[^/\\]";

/// Translate a wildcard pattern into an unanchored regex body.
fn wildcard_to_regex(pattern: &str) -> String {
    let required = format!("{SEPARATOR_MATCHER}+?");
    let optional = format!("{SEPARATOR_MATCHER}*?");

    let segments: Vec<&str> = pattern.split('/').collect();
    let mut result = String::new();

    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() && i > 0 {
            continue;
        }

        let separator = if i == segments.len() - 1 {
            optional.as_str()
        } else if segments[i + 1] != "**" {
            required.as_str()
        } else {
            ""
        };

        if *segment == "**" {
            if !separator.is_empty() {
                if i > 0 {
                    result.push_str(separator);
                }
                result.push_str(&format!("(?:{WILDCARD}*?{separator})*?"));
            }
            continue;
        }

        let mut chars = segment.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        result.push_str(&regex::escape(&escaped.to_string()));
                    }
                }
                '?' => result.push_str(WILDCARD),
                '*' => {
                    result.push_str(WILDCARD);
                    result.push_str("*?");
                }
                other => result.push_str(&regex::escape(&other.to_string())),
            }
        }

        result.push_str(separator);
    }

    result
}
