//! Diagnostic position text for test cases.
//!
//! Positions are keyed by the fully-qualified name the host runner assigns
//! to a sub-test, not by the bare method name.

use std::collections::HashMap;
use std::panic::Location;

/// Lookup from host-assigned test name to descriptive position text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestCasePositions {
    positions: HashMap<String, String>,
}

impl TestCasePositions {
    /// Creates an empty lookup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the position text for a fully-qualified test name.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.positions.insert(name.into(), text.into());
    }

    /// Records a source location for a fully-qualified test name.
    pub fn insert_location(&mut self, name: impl Into<String>, location: &Location<'_>) {
        self.insert(name, format!("{}:{}", location.file(), location.line()));
    }

    /// Returns the position text for a name, or an empty string if unknown.
    pub fn get(&self, name: &str) -> &str {
        self.positions.get(name).map(String::as_str).unwrap_or("")
    }

    /// Returns the number of recorded positions.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if no positions are recorded.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TestCasePositions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut positions = Self::new();
        for (name, text) in iter {
            positions.insert(name, text);
        }
        positions
    }
}
