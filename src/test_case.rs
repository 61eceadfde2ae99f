//! Execution engine for a single discovered test case.
//!
//! A [`TestCase`] is built once at discovery time, receives its setup and
//! teardown ordering through [`TestCase::prepare`], and is then shared with
//! the host runner, which calls [`TestCase::run`]. Every execution gets a
//! fresh [`Fixture`] and a fresh outer fixture value.

use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use crate::config::Configuration;
use crate::fixture::{Fixture, TestFixture};
use crate::host::{is_control_signal, panic_message, TestReporter};
use crate::method::{Method, MethodInfo};
use crate::positions::TestCasePositions;

/// How a test case is handled on a given run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Skipped by a method marker or the configuration.
    Skipped,
    /// Long-running and the host is in short mode.
    SkippedLong,
    /// Setups, test body and teardowns are executed.
    Executing,
}

/// One test case of the outer fixture type `F`.
pub struct TestCase<F> {
    method: Method<F>,
    description: String,
    skipped: bool,
    long: bool,
    parallel: bool,

    setups: Vec<Method<F>>,
    teardowns: Vec<Method<F>>,
    positions: Arc<TestCasePositions>,
    outer: PhantomData<fn() -> F>,
}

impl<F: TestFixture> TestCase<F> {
    /// Creates a test case. Skip, long and parallel flags are fixed here.
    pub fn new(
        method: Method<F>,
        info: &MethodInfo,
        config: &Configuration,
        positions: Arc<TestCasePositions>,
    ) -> Self {
        Self {
            method,
            description: info.name.to_string(),
            skipped: info.is_skipped_test || config.skipped_test_cases,
            long: info.is_long_test || config.long_running_test_cases,
            parallel: config.parallel_test_cases(),
            setups: Vec::new(),
            teardowns: Vec::new(),
            positions,
            outer: PhantomData,
        }
    }

    /// Assigns setup and teardown ordering. Must happen before `run`.
    pub fn prepare(&mut self, setups: &[Method<F>], teardowns: &[Method<F>]) {
        self.setups = setups.to_vec();
        self.teardowns = teardowns.to_vec();
    }

    /// Returns the name the test case is registered under.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns true if the test case is always skipped.
    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    /// Returns true if the test case is long-running.
    pub fn is_long(&self) -> bool {
        self.long
    }

    /// Returns true if the test case opts into parallel execution.
    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Decides how the test case is handled under the given host.
    pub fn state(&self, t: &dyn TestReporter) -> RunState {
        if self.skipped {
            RunState::Skipped
        } else if self.long && t.is_short() {
            RunState::SkippedLong
        } else {
            RunState::Executing
        }
    }

    /// Registers this test case as a sub-test of `t`.
    ///
    /// Returns the host's verdict for the sub-test.
    pub fn run(self: &Arc<Self>, t: &dyn TestReporter) -> bool {
        let state = self.state(t);
        tracing::debug!(
            parent = %t.name(),
            test = %self.description,
            ?state,
            "registering test case"
        );

        let case = Arc::clone(self);
        match state {
            RunState::Skipped => t.run(
                &self.description,
                Box::new(move |inner: Arc<dyn TestReporter>| case.skip(&*inner)),
            ),
            RunState::SkippedLong => t.run(
                &self.description,
                Box::new(move |inner: Arc<dyn TestReporter>| case.skip_long(&*inner)),
            ),
            RunState::Executing => t.run(
                &self.description,
                Box::new(move |inner: Arc<dyn TestReporter>| case.execute(inner)),
            ),
        }
    }

    fn skip(&self, inner: &dyn TestReporter) {
        inner.skip(&format!("\n{}", self.positions.get(inner.name())));
    }

    fn skip_long(&self, inner: &dyn TestReporter) {
        inner.skip(&format!(
            "Skipped long-running test:\n{}",
            self.positions.get(inner.name())
        ));
    }

    fn execute(&self, inner: Arc<dyn TestReporter>) {
        if self.parallel {
            tracing::debug!(test = %inner.name(), "test case opted into parallel execution");
            inner.parallel();
        }

        let fixture = self.initialize_fixture(&inner);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut outer = F::new(fixture.clone());
            self.run_with_setup_and_teardown(&fixture, &mut outer);
        }));
        fixture.finalize(outcome);
    }

    fn initialize_fixture(&self, inner: &Arc<dyn TestReporter>) -> Fixture {
        inner.log(&format!(
            "Test definition:\n{}",
            self.positions.get(inner.name())
        ));
        Fixture::new(Arc::clone(inner), inner.is_verbose())
    }

    /// Runs setups and the test body, then every teardown.
    ///
    /// The first abort is re-raised once all teardowns have been attempted.
    /// Panics from later teardowns are recorded on `fixture`.
    fn run_with_setup_and_teardown(&self, fixture: &Fixture, outer: &mut F) {
        tracing::debug!(
            test = %self.description,
            setups = self.setups.len(),
            teardowns = self.teardowns.len(),
            "running setups, test body and teardowns"
        );
        let body = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run_setups(outer);
            self.run_test(outer);
        }));

        let mut first_abort = body.err();
        for (teardown, payload) in self.run_teardowns(outer) {
            if first_abort.is_none() {
                first_abort = Some(payload);
                continue;
            }
            if !is_control_signal(&*payload) {
                tracing::warn!(
                    test = %self.description,
                    teardown = teardown.name(),
                    message = %panic_message(&*payload),
                    "teardown panicked after an earlier failure"
                );
                fixture.recover_panic(&*payload);
            }
        }

        if let Some(payload) = first_abort {
            panic::resume_unwind(payload);
        }
    }

    fn run_setups(&self, outer: &mut F) {
        for setup in &self.setups {
            setup.invoke(outer);
        }
    }

    fn run_test(&self, outer: &mut F) {
        self.method.invoke(outer);
    }

    /// Attempts every teardown, returning the ones that aborted.
    fn run_teardowns(&self, outer: &mut F) -> Vec<(Method<F>, Box<dyn std::any::Any + Send>)> {
        let mut aborted = Vec::new();
        for teardown in &self.teardowns {
            let outcome: thread::Result<()> =
                panic::catch_unwind(AssertUnwindSafe(|| teardown.invoke(outer)));
            if let Err(payload) = outcome {
                aborted.push((*teardown, payload));
            }
        }
        aborted
    }
}
