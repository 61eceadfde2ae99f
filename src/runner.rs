//! Fixture runner.
//!
//! Collects the methods of an outer fixture type, classifies them by name,
//! orders setups and teardowns, and hands each test case to the host.

use std::collections::HashMap;
use std::panic::Location;
use std::sync::Arc;

use crate::config::Configuration;
use crate::fixture::TestFixture;
use crate::host::{unique_sub_name, TestReporter};
use crate::method::{Method, MethodInfo};
use crate::positions::TestCasePositions;
use crate::test_case::TestCase;

/// Registered methods of an outer fixture type.
///
/// Methods are registered in declaration order; that order is the order in
/// which setups and teardowns run.
pub struct Suite<F> {
    methods: Vec<Registration<F>>,
}

struct Registration<F> {
    method: Method<F>,
    location: &'static Location<'static>,
}

impl<F> Clone for Registration<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F> Copy for Registration<F> {}

impl<F: TestFixture> Suite<F> {
    /// Creates an empty suite.
    pub fn new() -> Self {
        Self {
            methods: Vec::new(),
        }
    }

    /// Registers a method. Its role is derived from its name.
    ///
    /// The caller's source location becomes the method's diagnostic position.
    #[track_caller]
    pub fn method(mut self, name: &'static str, call: fn(&mut F)) -> Self {
        self.methods.push(Registration {
            method: Method::new(name, call),
            location: Location::caller(),
        });
        self
    }

    /// Returns the number of registered methods.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns true if no methods are registered.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Runs every test case of the fixture as sub-tests of `t`.
    pub fn run(self, t: &dyn TestReporter, config: &Configuration) {
        let fixture_type = fixture_type_name::<F>();

        let mut setups = Vec::new();
        let mut teardowns = Vec::new();
        let mut tests = Vec::new();
        for registration in &self.methods {
            let info = MethodInfo::classify(registration.method.name());
            if info.is_setup {
                setups.push(registration.method);
            } else if info.is_teardown {
                teardowns.push(registration.method);
            } else if info.is_test {
                tests.push((*registration, info));
            }
        }

        tracing::info!(
            fixture = fixture_type,
            tests = tests.len(),
            setups = setups.len(),
            teardowns = teardowns.len(),
            "running fixture"
        );

        if config.parallel_fixture() {
            t.parallel();
        }

        if tests.is_empty() {
            t.skip(&format!("Fixture ({}) has no test cases.", fixture_type));
        }

        let tests = focus_first(tests);
        let positions = Arc::new(self.positions(t.name(), &tests));
        for (registration, info) in tests {
            let mut case = TestCase::new(
                registration.method,
                &info,
                config,
                Arc::clone(&positions),
            );
            case.prepare(&setups, &teardowns);
            Arc::new(case).run(t);
        }
    }

    /// Keys every method's registration site by its fully-qualified name.
    ///
    /// Test cases are keyed by the sub-test name the host assigns them,
    /// following the order in which they are run.
    fn positions(
        &self,
        parent: &str,
        tests: &[(Registration<F>, MethodInfo)],
    ) -> TestCasePositions {
        let mut positions = TestCasePositions::new();
        for registration in &self.methods {
            positions.insert_location(
                qualified(parent, registration.method.name()),
                registration.location,
            );
        }

        let mut seen = HashMap::new();
        for (registration, _) in tests {
            let name = unique_sub_name(&mut seen, registration.method.name());
            positions.insert_location(qualified(parent, &name), registration.location);
        }
        positions
    }
}

impl<F: TestFixture> Default for Suite<F> {
    fn default() -> Self {
        Self::new()
    }
}

fn qualified(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Orders focused test cases first and skips the rest, if any are focused.
fn focus_first<T>(tests: Vec<(T, MethodInfo)>) -> Vec<(T, MethodInfo)> {
    if !tests.iter().any(|(_, info)| info.is_focus_test) {
        return tests;
    }

    let (focused, rest): (Vec<_>, Vec<_>) = tests
        .into_iter()
        .partition(|(_, info)| info.is_focus_test);
    focused
        .into_iter()
        .chain(rest.into_iter().map(|(method, info)| (method, info.skipped())))
        .collect()
}

fn fixture_type_name<F>() -> &'static str {
    let full = std::any::type_name::<F>();
    full.rsplit("::").next().unwrap_or(full)
}
