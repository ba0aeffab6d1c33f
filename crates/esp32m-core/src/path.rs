//! Separator-aware paths.
//!
//! Paths are slash-separated strings like "/api/wifi/config". A leading
//! separator makes the path rooted; empty segments are dropped, so
//! "a//b/" and "a/b" are the same path.

use std::fmt;

/// Default segment separator.
pub const SEPARATOR: char = '/';

/// A parsed path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    /// Non-empty segments
    segments: Vec<String>,
    separator: char,
    /// True if the path starts at the root
    rooted: bool,
}

impl Path {
    /// Parse a path string using the default separator.
    pub fn new(path: &str) -> Self {
        Self::with_separator(path, SEPARATOR)
    }

    /// Parse a path string using a custom separator.
    pub fn with_separator(path: &str, separator: char) -> Self {
        let parts: Vec<&str> = path.split(separator).collect();
        Self::from_parts(&parts, separator)
    }

    /// Build a path from raw segments. A leading empty segment roots it.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Self {
        Self::from_parts(segments, SEPARATOR)
    }

    /// A lone empty segment is the empty relative path, not the root.
    fn from_parts<S: AsRef<str>>(parts: &[S], separator: char) -> Self {
        let rooted = parts.first().is_some_and(|s| s.as_ref().is_empty()) && parts.len() > 1;
        Self {
            segments: parts
                .iter()
                .map(|s| s.as_ref())
                .filter(|s: &&str| !s.is_empty())
                .map(String::from)
                .collect(),
            separator,
            rooted,
        }
    }

    /// Get the path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn is_rooted(&self) -> bool {
        self.rooted
    }

    /// Append `other`. A rooted `other` replaces this path entirely.
    pub fn join(&self, other: &Path) -> Path {
        if other.rooted {
            return other.clone();
        }
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Path {
            segments,
            separator: self.separator,
            rooted: self.rooted,
        }
    }

    /// Parse `other` with this path's separator and append it.
    pub fn join_str(&self, other: &str) -> Path {
        self.join(&Path::with_separator(other, self.separator))
    }

    /// Check if this path starts with a given prefix.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        if prefix.segments.len() > self.segments.len() || prefix.rooted != self.rooted {
            return false;
        }
        self.segments
            .iter()
            .zip(prefix.segments.iter())
            .all(|(a, b)| a == b)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rooted {
            write!(f, "{}", self.separator)?;
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", self.separator)?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Path::new(s)
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Path::new(&s)
    }
}

/// Join path fragments with `/`.
///
/// Empty fragments are skipped; the result is rooted when the first
/// non-empty fragment starts with `/`.
pub fn join_path(elements: &[&str]) -> String {
    let non_empty: Vec<&str> = elements.iter().copied().filter(|e| !e.is_empty()).collect();
    let rooted = non_empty.first().is_some_and(|e| e.starts_with(SEPARATOR));
    let joined = non_empty
        .iter()
        .flat_map(|e| e.split(SEPARATOR))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    if rooted {
        format!("/{joined}")
    } else {
        joined
    }
}
