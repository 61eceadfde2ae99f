//! Host test runner capability.
//!
//! The engine never schedules or reports anything itself. It registers
//! named sub-tests with a [`TestReporter`], asks it for parallel execution,
//! and aborts through it. [`Harness`] is the built-in implementation.

pub mod harness;

pub use harness::{Harness, HarnessConfig, Summary, TestOutcome, TestStatus};

use std::any::Any;
use std::collections::HashMap;
use std::panic;
use std::sync::Arc;

/// Body of a sub-test, invoked with the sub-test's own reporting handle.
pub type SubTest = Box<dyn FnOnce(Arc<dyn TestReporter>) + Send + 'static>;

/// Unwind payload raised by [`TestReporter::skip_now`].
#[derive(Debug, Clone, Copy)]
pub struct SkipNow;

/// Unwind payload raised by [`TestReporter::fail_now`].
#[derive(Debug, Clone, Copy)]
pub struct FailNow;

/// Per-test reporting handle provided by the host runner.
///
/// Aborting methods unwind the current thread. Anything that must run on
/// every exit path has to be guarded with `catch_unwind`.
pub trait TestReporter: Send + Sync {
    /// Returns the host-assigned, fully-qualified name of this test.
    fn name(&self) -> &str;

    /// Registers and runs a named sub-test.
    ///
    /// Returns false if the sub-test failed. A sub-test that opted into
    /// parallel execution is still pending and reports true.
    fn run(&self, name: &str, test: SubTest) -> bool;

    /// Requests parallel execution with sibling parallel tests.
    ///
    /// Blocks until the host decides to resume this test.
    fn parallel(&self);

    /// Appends a line to this test's output.
    fn log(&self, message: &str);

    /// Marks this test failed and keeps running.
    fn fail(&self);

    /// Returns true if this test has been marked failed.
    fn failed(&self) -> bool;

    /// Returns true if this test has been skipped.
    fn skipped(&self) -> bool;

    /// Marks this test failed and aborts it.
    fn fail_now(&self) -> !;

    /// Marks this test skipped and aborts it.
    fn skip_now(&self) -> !;

    /// Returns true if the host runs in short mode.
    fn is_short(&self) -> bool;

    /// Returns true if the host runs in verbose mode.
    fn is_verbose(&self) -> bool;

    /// Logs a message, marks this test failed and keeps running.
    fn error(&self, message: &str) {
        self.log(message);
        self.fail();
    }

    /// Logs a message, marks this test failed and aborts it.
    fn fatal(&self, message: &str) -> ! {
        self.log(message);
        self.fail_now()
    }

    /// Logs a message, marks this test skipped and aborts it.
    fn skip(&self, message: &str) -> ! {
        self.log(message);
        self.skip_now()
    }
}

/// Unwinds with `SkipNow` without invoking the panic hook.
pub fn unwind_skip() -> ! {
    panic::resume_unwind(Box::new(SkipNow))
}

/// Unwinds with `FailNow` without invoking the panic hook.
pub fn unwind_fail() -> ! {
    panic::resume_unwind(Box::new(FailNow))
}

/// Derives the name a sub-test is registered under, relative to its parent.
///
/// Whitespace becomes `_` and NUL characters are dropped. A name already
/// present in `seen` gets a `#01`, `#02`, ... suffix.
pub fn unique_sub_name(seen: &mut HashMap<String, usize>, name: &str) -> String {
    let base: String = name
        .chars()
        .filter(|c| *c != '\0')
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();

    let count = seen.entry(base.clone()).or_insert(0);
    let unique = if *count == 0 {
        base
    } else {
        format!("{}#{:02}", base, count)
    };
    *count += 1;
    unique
}

/// Returns true if the payload is one of the host's own abort signals.
pub fn is_control_signal(payload: &(dyn Any + Send)) -> bool {
    payload.is::<SkipNow>() || payload.is::<FailNow>()
}

/// Extracts a readable message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if payload.is::<SkipNow>() {
        "test skipped".to_string()
    } else if payload.is::<FailNow>() {
        "test aborted".to_string()
    } else {
        "non-string panic payload".to_string()
    }
}
