//! Resolved fixture configuration.
//!
//! A `Configuration` is an immutable value handed to the fixture runner and
//! to every test case at construction time. Nothing reads process-wide
//! state after that point.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Options controlling how a fixture's test cases are scheduled and filtered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Run the fixture itself sequentially with respect to sibling fixtures.
    pub sequential_fixture: bool,
    /// Run the fixture's test cases one after another.
    pub sequential_test_cases: bool,
    /// Skip every test case of the fixture.
    pub skipped_test_cases: bool,
    /// Treat every test case of the fixture as long-running.
    pub long_running_test_cases: bool,
}

impl Configuration {
    /// Creates a configuration with every option off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips every test case.
    pub fn with_skip_all(mut self) -> Self {
        self.skipped_test_cases = true;
        self
    }

    /// Marks every test case as long-running.
    pub fn with_long_running(mut self) -> Self {
        self.long_running_test_cases = true;
        self
    }

    /// Prevents the fixture from running in parallel with other fixtures.
    pub fn with_sequential_fixture(mut self) -> Self {
        self.sequential_fixture = true;
        self
    }

    /// Prevents the fixture's test cases from running in parallel.
    pub fn with_sequential_test_cases(mut self) -> Self {
        self.sequential_test_cases = true;
        self
    }

    /// Runs both the fixture and its test cases sequentially.
    pub fn with_all_sequential(self) -> Self {
        self.with_sequential_fixture().with_sequential_test_cases()
    }

    /// Returns true if the fixture opts into parallel execution.
    pub fn parallel_fixture(&self) -> bool {
        !self.sequential_fixture
    }

    /// Returns true if test cases opt into parallel execution.
    pub fn parallel_test_cases(&self) -> bool {
        !self.sequential_test_cases
    }

    /// Loads a configuration from a TOML or YAML file, chosen by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;

        let config: Configuration = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| Error::Config(format!("failed to parse configuration: {}", e)))?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .map_err(|e| Error::Config(format!("failed to parse configuration: {}", e)))?,
            _ => {
                return Err(Error::Config(format!(
                    "unsupported configuration format: {}",
                    path.display()
                )))
            }
        };

        tracing::debug!(path = %path.display(), ?config, "loaded fixture configuration");
        Ok(config)
    }
}
