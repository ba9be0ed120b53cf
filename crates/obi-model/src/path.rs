//! Location paths for addressing fields within a form
//!
//! Provides [`LocationPath`], the key that locates a swept field starting from
//! the form root: `[attribute]`, `[attribute, field]` or
//! `[collection, block_key, field]`.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Path from a form root to one of its fields
///
/// Serialized as the list of its segments; displayed dotted.
///
/// # Examples
/// - `["initialize", "simulation_length"]` → `initialize.simulation_length`
/// - `["stimuli", "s1", "probability"]` → `stimuli.s1.probability`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationPath(Vec<String>);

impl LocationPath {
    /// Create new path from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Create path from a single segment
    #[inline]
    #[must_use]
    pub fn single(segment: impl Into<String>) -> Self {
        Self(vec![segment.into()])
    }

    /// Empty path (form root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is empty (root)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get last segment, the field name for block fields
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Get first segment, the form attribute
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Append a segment, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }

    /// Check if this path is a prefix of another
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        self.0 == other.0[..self.0.len()]
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Join segments with custom separator
    #[inline]
    #[must_use]
    pub fn join(&self, separator: &str) -> String {
        self.0.join(separator)
    }
}

impl Display for LocationPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for LocationPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        let segments: Vec<String> = s
            .split('.')
            .map(|seg| {
                if seg.is_empty() {
                    Err(PathError::EmptySegment(s.to_string()))
                } else {
                    Ok(seg.to_string())
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(Self(segments))
    }
}

impl From<Vec<String>> for LocationPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl From<&[&str]> for LocationPath {
    fn from(segments: &[&str]) -> Self {
        Self(segments.iter().map(|s| (*s).to_string()).collect())
    }
}

impl Default for LocationPath {
    fn default() -> Self {
        Self::root()
    }
}

/// Errors related to location paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty segment in dotted text
    #[error("location '{0}' contains an empty segment")]
    EmptySegment(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_new_and_segments() {
        let path = LocationPath::new(vec!["initialize".to_string(), "v_init".to_string()]);
        assert_eq!(path.segments(), &["initialize", "v_init"]);
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn path_first_and_last() {
        let path: LocationPath = "stimuli.s1.probability".parse().unwrap();
        assert_eq!(path.first(), Some("stimuli"));
        assert_eq!(path.last(), Some("probability"));
    }

    #[test]
    fn path_child() {
        let path = LocationPath::single("stimuli").child("s1").child("probability");
        assert_eq!(path.to_string(), "stimuli.s1.probability");
    }

    #[test]
    fn path_is_prefix_of() {
        let a: LocationPath = "stimuli.s1".parse().unwrap();
        let b: LocationPath = "stimuli.s1.probability".parse().unwrap();
        assert!(a.is_prefix_of(&b));
        assert!(!b.is_prefix_of(&a));
    }

    #[test]
    fn path_from_str_empty_is_root() {
        let path: LocationPath = "".parse().unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn path_from_str_empty_segment() {
        let result: Result<LocationPath, _> = "a..b".parse();
        assert!(matches!(result, Err(PathError::EmptySegment(_))));
    }

    #[test]
    fn path_segments_keep_dashes() {
        // Collection keys are user supplied and are not restricted to identifiers
        let path: LocationPath = "stimuli.spike-1.delay".parse().unwrap();
        assert_eq!(path.segments()[1], "spike-1");
    }

    #[test]
    fn path_serializes_as_list() {
        let path: LocationPath = "initialize.v_init".parse().unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, r#"["initialize","v_init"]"#);
        let back: LocationPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }

    #[test]
    fn path_join() {
        let path = LocationPath::from(&["a", "b"][..]);
        assert_eq!(path.join("/"), "a/b");
    }

    proptest::proptest! {
        #[test]
        fn dotted_text_round_trips(segments in proptest::collection::vec("[a-z_][a-z0-9_-]{0,8}", 1..5)) {
            let path = LocationPath::new(segments.clone());
            let parsed: LocationPath = path.to_string().parse().unwrap();
            proptest::prop_assert_eq!(parsed.segments(), segments.as_slice());
        }
    }
}
