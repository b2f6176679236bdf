//! Change size values.

use crate::PathMatcher;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// Size of an uncommitted change in lines.
///
/// `is_approximate` marks a value that could not be computed exactly within
/// the provider's time budget. It is sticky under [`ChangeSize::add`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeSize {
    pub value: u32,
    #[serde(default)]
    pub is_approximate: bool,
}

impl ChangeSize {
    pub const fn new(value: u32) -> Self {
        Self {
            value,
            is_approximate: false,
        }
    }

    pub const fn approximate(value: u32) -> Self {
        Self {
            value,
            is_approximate: true,
        }
    }

    pub const fn empty() -> Self {
        Self::new(0)
    }

    /// Zero lines, but the real size is unknown.
    pub const fn approximately_empty() -> Self {
        Self::approximate(0)
    }

    pub fn add(self, that: ChangeSize) -> ChangeSize {
        ChangeSize {
            value: self.value.saturating_add(that.value),
            is_approximate: self.is_approximate || that.is_approximate,
        }
    }

    /// Same value, flagged as approximate.
    pub fn into_approximate(self) -> ChangeSize {
        ChangeSize::approximate(self.value)
    }
}

impl Add for ChangeSize {
    type Output = ChangeSize;

    fn add(self, rhs: ChangeSize) -> ChangeSize {
        ChangeSize::add(self, rhs)
    }
}

impl Sum for ChangeSize {
    fn sum<I: Iterator<Item = ChangeSize>>(iter: I) -> ChangeSize {
        iter.fold(ChangeSize::empty(), ChangeSize::add)
    }
}

impl fmt::Display for ChangeSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_approximate {
            write!(f, "≈{}", self.value)
        } else {
            write!(f, "{}", self.value)
        }
    }
}

/// Per-file change sizes, keyed by repository-relative path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSizesByPath {
    entries: Vec<(String, ChangeSize)>,
}

impl ChangeSizesByPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single unnamed entry, for providers that only know the total.
    pub fn total_only(size: ChangeSize) -> Self {
        Self {
            entries: vec![(String::new(), size)],
        }
    }

    pub fn push(&mut self, path: impl Into<String>, size: ChangeSize) {
        self.entries.push((path.into(), size));
    }

    pub fn with(mut self, path: impl Into<String>, size: ChangeSize) -> Self {
        self.push(path, size);
        self
    }

    pub fn entries(&self) -> &[(String, ChangeSize)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn total(&self) -> ChangeSize {
        self.entries.iter().map(|(_, size)| *size).sum()
    }

    /// Drop every path matched by one of `exclusions`.
    pub fn excluding(&self, exclusions: &[PathMatcher]) -> ChangeSizesByPath {
        if exclusions.is_empty() {
            return self.clone();
        }
        let entries = self
            .entries
            .iter()
            .filter(|(path, _)| !exclusions.iter().any(|m| m.matches(path)))
            .cloned()
            .collect();
        ChangeSizesByPath { entries }
    }

    /// Every entry flagged as approximate; used when serving stale results.
    pub fn into_approximate(self) -> ChangeSizesByPath {
        let entries = self
            .entries
            .into_iter()
            .map(|(path, size)| (path, size.into_approximate()))
            .collect();
        ChangeSizesByPath { entries }
    }
}

impl FromIterator<(String, ChangeSize)> for ChangeSizesByPath {
    fn from_iter<I: IntoIterator<Item = (String, ChangeSize)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
