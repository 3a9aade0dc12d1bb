// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key name grammar: namespaces, path segments and their ordering.
//!
//! A key name is a namespace tag followed by `/`-separated path segments,
//! e.g. `user/app/timeout`. A name written with a leading delimiter and no
//! namespace (`/app/timeout`) is *cascading*: it resolves against the
//! concrete namespaces in priority order at lookup time. The total order
//! defined here (namespace first, then segment-wise path comparison) is what
//! keeps a [`KeySet`](crate::domain::KeySet) sorted, and it is
//! prefix-consistent: all names below-or-same a concrete name form one
//! contiguous run.

use crate::domain::errors::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Path delimiter separating key name segments.
pub const DELIMITER: char = '/';

/// The scope classification of a key name.
///
/// The declaration order is the fixed total order used for sorting:
/// `spec < proc < dir < user < system < cascading`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Specification keys describing other keys.
    Spec,
    /// Process-local keys, never persisted.
    Proc,
    /// Directory-scoped keys.
    Dir,
    /// Per-user keys.
    User,
    /// System-wide keys.
    System,
    /// The namespace-less cascading form, resolved at lookup time.
    Cascading,
}

impl Namespace {
    /// Resolution order for cascading lookups: the first concrete namespace
    /// holding a matching key wins.
    pub const CASCADE_ORDER: [Namespace; 5] = [
        Namespace::Spec,
        Namespace::Proc,
        Namespace::Dir,
        Namespace::User,
        Namespace::System,
    ];

    /// Returns the name tag of this namespace, `""` for the cascading form.
    ///
    /// # Examples
    ///
    /// ```
    /// use cascfg::domain::Namespace;
    ///
    /// assert_eq!(Namespace::User.tag(), "user");
    /// assert_eq!(Namespace::Cascading.tag(), "");
    /// ```
    pub fn tag(&self) -> &'static str {
        match self {
            Namespace::Spec => "spec",
            Namespace::Proc => "proc",
            Namespace::Dir => "dir",
            Namespace::User => "user",
            Namespace::System => "system",
            Namespace::Cascading => "",
        }
    }

    /// Parses a namespace tag, `None` if the tag is not one of the five
    /// concrete namespaces.
    pub fn from_tag(tag: &str) -> Option<Namespace> {
        match tag {
            "spec" => Some(Namespace::Spec),
            "proc" => Some(Namespace::Proc),
            "dir" => Some(Namespace::Dir),
            "user" => Some(Namespace::User),
            "system" => Some(Namespace::System),
            _ => None,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// A parsed, validated key name.
///
/// `KeyName` owns the namespace and the unescaped path segments of a name.
/// Rendering re-escapes segments, so a segment containing the delimiter
/// round-trips through `parse`/`Display`.
///
/// # Examples
///
/// ```
/// use cascfg::domain::{KeyName, Namespace};
///
/// let name = KeyName::parse("user/app/timeout").unwrap();
/// assert_eq!(name.namespace(), Namespace::User);
/// assert_eq!(name.base_name(), "timeout");
/// assert_eq!(name.to_string(), "user/app/timeout");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyName {
    namespace: Namespace,
    segments: Vec<String>,
}

impl KeyName {
    /// Parses a key name.
    ///
    /// The grammar: a leading delimiter and no namespace tag is the cascading
    /// form; otherwise the first segment must be one of the five namespace
    /// tags. Segments must be non-empty; a literal delimiter or backslash
    /// inside a segment is escaped as `\/` or `\\`. The empty name is
    /// reserved for the session root placeholder and does not parse.
    ///
    /// # Examples
    ///
    /// ```
    /// use cascfg::domain::{KeyName, Namespace};
    ///
    /// let cascading = KeyName::parse("/app/timeout").unwrap();
    /// assert_eq!(cascading.namespace(), Namespace::Cascading);
    ///
    /// assert!(KeyName::parse("flat/app").is_err());
    /// assert!(KeyName::parse("user//app").is_err());
    /// ```
    pub fn parse(name: &str) -> Result<KeyName> {
        if name.is_empty() {
            return Err(invalid(
                name,
                "empty names are reserved for the session root placeholder",
            ));
        }

        if let Some(rest) = name.strip_prefix(DELIMITER) {
            let segments = if rest.is_empty() {
                Vec::new()
            } else {
                split_segments(name, rest)?
            };
            return Ok(KeyName {
                namespace: Namespace::Cascading,
                segments,
            });
        }

        let mut segments = split_segments(name, name)?;
        let tag = segments.remove(0);
        let namespace = Namespace::from_tag(&tag)
            .ok_or_else(|| invalid(name, "unknown namespace tag"))?;

        Ok(KeyName {
            namespace,
            segments,
        })
    }

    /// Returns the namespace of this name.
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Returns the unescaped path segments (the namespace tag excluded).
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the unescaped last path segment, `""` when the name has none.
    pub fn base_name(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// Returns this name transplanted into another namespace.
    ///
    /// Used by cascading lookup to probe each concrete namespace in turn.
    pub fn with_namespace(&self, namespace: Namespace) -> KeyName {
        KeyName {
            namespace,
            segments: self.segments.clone(),
        }
    }

    /// Whether `self` is strictly below `other` in the hierarchy.
    ///
    /// A cascading operand matches any namespace; two concrete names must
    /// share their namespace.
    ///
    /// # Examples
    ///
    /// ```
    /// use cascfg::domain::KeyName;
    ///
    /// let child = KeyName::parse("user/app/timeout").unwrap();
    /// let parent = KeyName::parse("user/app").unwrap();
    /// assert!(child.is_below(&parent));
    /// assert!(!parent.is_below(&child));
    /// assert!(child.is_below(&KeyName::parse("/app").unwrap()));
    /// ```
    pub fn is_below(&self, other: &KeyName) -> bool {
        self.namespace_matches(other)
            && self.segments.len() > other.segments.len()
            && self.segments[..other.segments.len()] == other.segments[..]
    }

    /// Whether `self` is below `other` or names the same entry.
    pub fn is_below_or_same(&self, other: &KeyName) -> bool {
        self.namespace_matches(other)
            && self.segments.len() >= other.segments.len()
            && self.segments[..other.segments.len()] == other.segments[..]
    }

    /// Whether `self` is exactly one level below `other`.
    pub fn is_directly_below(&self, other: &KeyName) -> bool {
        self.is_below(other) && self.segments.len() == other.segments.len() + 1
    }

    /// Computes the common key name of two names.
    ///
    /// When one name is below-or-same the other, the more specific (deeper)
    /// name wins. Two names in the same namespace share their longest common
    /// leading segments under that namespace. Names in different namespaces
    /// share the cascading form of their common leading path segments, or
    /// `""` when no segment matches.
    ///
    /// # Examples
    ///
    /// ```
    /// use cascfg::domain::KeyName;
    ///
    /// let a = KeyName::parse("user/foo/bar").unwrap();
    /// let b = KeyName::parse("user/foo/bar2").unwrap();
    /// assert_eq!(a.common_name(&b), "user/foo");
    ///
    /// let a = KeyName::parse("proc/foo/bar").unwrap();
    /// let b = KeyName::parse("user/foo/bar").unwrap();
    /// assert_eq!(a.common_name(&b), "/foo/bar");
    /// ```
    pub fn common_name(&self, other: &KeyName) -> String {
        if self.is_below_or_same(other) {
            return self.to_string();
        }
        if other.is_below_or_same(self) {
            return other.to_string();
        }

        let common: Vec<String> = self
            .segments
            .iter()
            .zip(other.segments.iter())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a.clone())
            .collect();

        if self.namespace == other.namespace {
            return KeyName {
                namespace: self.namespace,
                segments: common,
            }
            .to_string();
        }

        if common.is_empty() {
            return String::new();
        }

        KeyName {
            namespace: Namespace::Cascading,
            segments: common,
        }
        .to_string()
    }

    fn namespace_matches(&self, other: &KeyName) -> bool {
        self.namespace == other.namespace
            || self.namespace == Namespace::Cascading
            || other.namespace == Namespace::Cascading
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace == Namespace::Cascading && self.segments.is_empty() {
            return write!(f, "{DELIMITER}");
        }
        write!(f, "{}", self.namespace.tag())?;
        for segment in &self.segments {
            write!(f, "{}{}", DELIMITER, escape_segment(segment))?;
        }
        Ok(())
    }
}

impl std::str::FromStr for KeyName {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        KeyName::parse(s)
    }
}

fn invalid(name: &str, reason: &str) -> StoreError {
    StoreError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Splits `path` into unescaped segments. `name` is the full original name,
/// kept only for error reporting.
fn split_segments(name: &str, path: &str) -> Result<Vec<String>> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();

    loop {
        match chars.next() {
            Some('\\') => match chars.next() {
                Some(c) if c == '\\' || c == DELIMITER => current.push(c),
                Some(_) => return Err(invalid(name, "stray escape character")),
                None => return Err(invalid(name, "trailing escape character")),
            },
            Some(c) if c == DELIMITER => {
                if current.is_empty() {
                    return Err(invalid(name, "empty name segment"));
                }
                segments.push(std::mem::take(&mut current));
            }
            Some(c) => current.push(c),
            None => break,
        }
    }

    if current.is_empty() {
        return Err(invalid(name, "empty name segment"));
    }
    segments.push(current);

    Ok(segments)
}

fn escape_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        if c == '\\' || c == DELIMITER {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_concrete_name() {
        let name = KeyName::parse("user/app/timeout").unwrap();
        assert_eq!(name.namespace(), Namespace::User);
        assert_eq!(name.segments(), ["app", "timeout"]);
        assert_eq!(name.base_name(), "timeout");
    }

    #[test]
    fn test_parse_namespace_only() {
        let name = KeyName::parse("system").unwrap();
        assert_eq!(name.namespace(), Namespace::System);
        assert!(name.segments().is_empty());
        assert_eq!(name.base_name(), "");
    }

    #[test]
    fn test_parse_cascading_name() {
        let name = KeyName::parse("/app/timeout").unwrap();
        assert_eq!(name.namespace(), Namespace::Cascading);
        assert_eq!(name.segments(), ["app", "timeout"]);
    }

    #[test]
    fn test_parse_cascading_root() {
        let name = KeyName::parse("/").unwrap();
        assert_eq!(name.namespace(), Namespace::Cascading);
        assert!(name.segments().is_empty());
        assert_eq!(name.to_string(), "/");
    }

    #[test]
    fn test_parse_rejects_empty_name() {
        assert!(KeyName::parse("").is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_namespace() {
        assert!(KeyName::parse("flat/app").is_err());
        assert!(KeyName::parse("USER/app").is_err());
    }

    #[test]
    fn test_parse_rejects_empty_segments() {
        assert!(KeyName::parse("user//app").is_err());
        assert!(KeyName::parse("user/app/").is_err());
        assert!(KeyName::parse("//app").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_escapes() {
        assert!(KeyName::parse("user/a\\b").is_err());
        assert!(KeyName::parse("user/a\\").is_err());
    }

    #[test]
    fn test_roundtrip() {
        for name in [
            "user/app/timeout",
            "system/hosts",
            "spec",
            "/app",
            "/",
            "user/a\\/b",
            "dir/a\\\\b/c",
        ] {
            let parsed = KeyName::parse(name).unwrap();
            assert_eq!(parsed.to_string(), name, "roundtrip failed for {name}");
        }
    }

    #[test]
    fn test_escaped_delimiter_in_segment() {
        let name = KeyName::parse("user/a\\/b").unwrap();
        assert_eq!(name.segments(), ["a/b"]);
        assert_eq!(name.base_name(), "a/b");
        assert_eq!(name.to_string(), "user/a\\/b");
    }

    #[test]
    fn test_namespace_order() {
        let names: Vec<KeyName> = ["spec/x", "proc/x", "dir/x", "user/x", "system/x", "/x"]
            .iter()
            .map(|n| KeyName::parse(n).unwrap())
            .collect();

        for pair in names.windows(2) {
            assert!(pair[0] < pair[1], "{} should sort before {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_order_is_prefix_consistent() {
        // A key's descendants sort directly after it, before any sibling
        // that shares a string prefix.
        let parent = KeyName::parse("user/foo").unwrap();
        let child = KeyName::parse("user/foo/bar").unwrap();
        let sibling = KeyName::parse("user/foo-bar").unwrap();

        assert!(parent < child);
        assert!(child < sibling);
    }

    #[test]
    fn test_is_below() {
        let parent = KeyName::parse("user/app").unwrap();
        let child = KeyName::parse("user/app/timeout").unwrap();
        let grandchild = KeyName::parse("user/app/net/timeout").unwrap();
        let other = KeyName::parse("system/app/timeout").unwrap();

        assert!(child.is_below(&parent));
        assert!(grandchild.is_below(&parent));
        assert!(!parent.is_below(&child));
        assert!(!parent.is_below(&parent));
        assert!(!other.is_below(&parent));
    }

    #[test]
    fn test_is_below_cascading_matches_any_namespace() {
        let cascading = KeyName::parse("/app").unwrap();
        let concrete = KeyName::parse("user/app/timeout").unwrap();

        assert!(concrete.is_below(&cascading));
        assert!(concrete.is_below_or_same(&KeyName::parse("/app/timeout").unwrap()));
    }

    #[test]
    fn test_is_below_or_same() {
        let name = KeyName::parse("user/app").unwrap();
        assert!(name.is_below_or_same(&name.clone()));
        assert!(KeyName::parse("user/app/x")
            .unwrap()
            .is_below_or_same(&name));
        assert!(!KeyName::parse("user/ap").unwrap().is_below_or_same(&name));
    }

    #[test]
    fn test_is_directly_below() {
        let parent = KeyName::parse("user/app").unwrap();
        assert!(KeyName::parse("user/app/x")
            .unwrap()
            .is_directly_below(&parent));
        assert!(!KeyName::parse("user/app/x/y")
            .unwrap()
            .is_directly_below(&parent));
        assert!(!parent.is_directly_below(&parent));
    }

    #[test]
    fn test_common_name_vectors() {
        let cases = [
            ("user/foo/bar", "user/foo/bar2", "user/foo"),
            ("proc/foo/bar", "user/foo/bar", "/foo/bar"),
            ("user/foo/bar", "user/bar/foo", "user"),
            ("proc/bar/foo", "user/foo/bar", ""),
        ];

        for (a, b, expected) in cases {
            let a = KeyName::parse(a).unwrap();
            let b = KeyName::parse(b).unwrap();
            assert_eq!(a.common_name(&b), expected);
        }
    }

    #[test]
    fn test_common_name_below_or_same() {
        let deep = KeyName::parse("user/foo/bar").unwrap();
        let shallow = KeyName::parse("user/foo").unwrap();
        assert_eq!(deep.common_name(&shallow), "user/foo/bar");
        assert_eq!(shallow.common_name(&deep), "user/foo/bar");
    }

    #[test]
    fn test_with_namespace() {
        let cascading = KeyName::parse("/app/timeout").unwrap();
        let concrete = cascading.with_namespace(Namespace::User);
        assert_eq!(concrete.to_string(), "user/app/timeout");
    }

    #[test]
    fn test_from_str() {
        let name: KeyName = "user/app".parse().unwrap();
        assert_eq!(name.namespace(), Namespace::User);
    }
}
