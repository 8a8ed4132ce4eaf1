//! Template path substitution inside the relationship descriptor
//!
//! The descriptor is treated as opaque text: the old path is searched as a
//! literal, either exactly or ignoring case, and every occurrence is replaced
//! by the new path verbatim.

use regex::{NoExpand, Regex, RegexBuilder};
use std::fmt::Write;
use std::sync::OnceLock;

/// Attached template reference inside `word/_rels/settings.xml.rels`
static TARGET_PATTERN: OnceLock<Regex> = OnceLock::new();

fn target_pattern() -> &'static Regex {
    TARGET_PATTERN.get_or_init(|| Regex::new(r#"Target="file:///(.*?)""#).unwrap())
}

/// Return the attached template path (without the `file:///` scheme), if any
pub fn template_target(content: &str) -> Option<&str> {
    target_pattern()
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Escape a path the way Word stores it inside a `file:///` URI.
///
/// Spaces, control characters and every non-ASCII byte are percent-encoded
/// (lowercase hex); separators such as `\`, `/` and `:` are left untouched.
pub fn url_path_encode(path: &str) -> String {
    let mut encoded = String::with_capacity(path.len());
    for ch in path.chars() {
        if ch == ' ' {
            encoded.push_str("%20");
        } else if ch.is_ascii() && !ch.is_ascii_control() {
            encoded.push(ch);
        } else {
            let mut buf = [0u8; 4];
            for byte in ch.encode_utf8(&mut buf).bytes() {
                let _ = write!(encoded, "%{:02x}", byte);
            }
        }
    }
    encoded
}

#[derive(Debug, Clone)]
enum Matcher {
    Exact,
    IgnoreCase(Regex),
}

/// Replacement of one literal path prefix by another
#[derive(Debug, Clone)]
pub struct Substitution {
    old: String,
    new: String,
    matcher: Matcher,
}

impl Substitution {
    /// Build a substitution from already-encoded strings
    pub fn new(old: &str, new: &str, case_sensitive: bool) -> Result<Self, regex::Error> {
        let matcher = if case_sensitive {
            Matcher::Exact
        } else {
            let pattern = RegexBuilder::new(&regex::escape(old))
                .case_insensitive(true)
                .build()?;
            Matcher::IgnoreCase(pattern)
        };

        Ok(Self {
            old: old.to_string(),
            new: new.to_string(),
            matcher,
        })
    }

    /// Build a substitution from raw paths, applying [`url_path_encode`] to both
    pub fn from_paths(old: &str, new: &str, case_sensitive: bool) -> Result<Self, regex::Error> {
        Self::new(&url_path_encode(old), &url_path_encode(new), case_sensitive)
    }

    pub fn old(&self) -> &str {
        &self.old
    }

    pub fn new_path(&self) -> &str {
        &self.new
    }

    /// Replace every occurrence of the old path.
    ///
    /// Returns `None` when the content would stay the same.
    pub fn apply(&self, content: &str) -> Option<String> {
        if self.old.is_empty() {
            return None;
        }

        let replaced = match &self.matcher {
            Matcher::Exact => content.replace(&self.old, &self.new),
            Matcher::IgnoreCase(pattern) => pattern
                .replace_all(content, NoExpand(&self.new))
                .into_owned(),
        };

        (replaced != content).then_some(replaced)
    }
}
