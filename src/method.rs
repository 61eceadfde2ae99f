//! Fixture methods and their classification.
//!
//! A method is a named function pointer over the outer fixture type. Its
//! role (setup, teardown, test case) is derived from its snake_case name.

use std::fmt;

/// A named, callable method of the outer fixture type `F`.
pub struct Method<F> {
    name: &'static str,
    call: fn(&mut F),
}

impl<F> Method<F> {
    /// Creates a method handle.
    pub fn new(name: &'static str, call: fn(&mut F)) -> Self {
        Self { name, call }
    }

    /// Returns the method name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Invokes the method on a fixture instance.
    pub fn invoke(&self, fixture: &mut F) {
        (self.call)(fixture)
    }
}

impl<F> Clone for Method<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F> Copy for Method<F> {}

impl<F> fmt::Debug for Method<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Method").field(&self.name).finish()
    }
}

/// Role and markers of a fixture method, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodInfo {
    /// Method name.
    pub name: &'static str,
    /// Runs before every test case.
    pub is_setup: bool,
    /// Runs after every test case.
    pub is_teardown: bool,
    /// Is a test case.
    pub is_test: bool,
    /// Test case is skipped.
    pub is_skipped_test: bool,
    /// Test case is long-running.
    pub is_long_test: bool,
    /// Test case is focused.
    pub is_focus_test: bool,
}

impl MethodInfo {
    /// Classifies a method by its name.
    ///
    /// | prefix              | role                  |
    /// |---------------------|-----------------------|
    /// | `setup`             | setup                 |
    /// | `teardown`          | teardown              |
    /// | `test`              | test case             |
    /// | `skip_test`         | skipped test case     |
    /// | `long_test`         | long test case        |
    /// | `skip_long_test`    | skipped long test     |
    /// | `focus_test`        | focused test case     |
    /// | `focus_long_test`   | focused long test     |
    ///
    /// A prefix matches the whole name or a name continuing with `_`.
    pub fn classify(name: &'static str) -> Self {
        let is_skipped_test = has_prefix(name, "skip_test") || has_prefix(name, "skip_long_test");
        let is_long_test = has_prefix(name, "long_test")
            || has_prefix(name, "skip_long_test")
            || has_prefix(name, "focus_long_test");
        let is_focus_test = has_prefix(name, "focus_test") || has_prefix(name, "focus_long_test");

        Self {
            name,
            is_setup: has_prefix(name, "setup"),
            is_teardown: has_prefix(name, "teardown"),
            is_test: has_prefix(name, "test") || is_skipped_test || is_long_test || is_focus_test,
            is_skipped_test,
            is_long_test,
            is_focus_test,
        }
    }

    /// Returns the same method marked as skipped.
    pub fn skipped(mut self) -> Self {
        self.is_skipped_test = true;
        self
    }
}

fn has_prefix(name: &str, prefix: &str) -> bool {
    match name.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('_'),
        None => false,
    }
}
