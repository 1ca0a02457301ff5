//! Locations in the realtime tree.
//!
//! Paths are slash-delimited. Leading, trailing and repeated slashes are
//! ignored, so `""`, `"/"` and `"//"` all name the root.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

const FORBIDDEN: &[char] = &['.', '$', '#', '[', ']'];

/// A validated path into the realtime tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DbPath {
    segments: Vec<String>,
}

impl DbPath {
    /// The root of the tree.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses and validates a path string.
    pub fn parse(path: &str) -> Result<Self> {
        let mut segments = Vec::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            validate_segment(path, segment)?;
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    /// Returns this path extended by `child`, which may itself contain slashes.
    /// An empty child yields this path unchanged.
    pub fn join(&self, child: &str) -> Result<Self> {
        let child = Self::parse(child)?;
        let mut segments = self.segments.clone();
        segments.extend(child.segments);
        Ok(Self { segments })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, or `None` at the root.
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Parent path, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Percent-encoded form used in request URLs, without a leading slash.
    pub(crate) fn url_encoded(&self) -> String {
        self.segments
            .iter()
            .map(|s| urlencoding::encode(s).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn validate_segment(path: &str, segment: &str) -> Result<()> {
    if segment.contains(FORBIDDEN) {
        return Err(Error::InvalidPath {
            path: path.to_string(),
            reason: "segments must not contain '.', '$', '#', '[' or ']'",
        });
    }
    if segment.chars().any(|c| c.is_ascii_control()) {
        return Err(Error::InvalidPath {
            path: path.to_string(),
            reason: "segments must not contain control characters",
        });
    }
    Ok(())
}

impl fmt::Display for DbPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

impl FromStr for DbPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
