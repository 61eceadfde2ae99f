//! Per-execution fixture instance.
//!
//! A [`Fixture`] is created for every test case execution and handed to
//! the user's outer fixture type through [`TestFixture::new`]. It buffers
//! everything the test prints and flushes the buffer to the host when the
//! execution is finalized.

use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crate::host::{is_control_signal, panic_message, SubTest, TestReporter};

/// A user-defined fixture type whose methods are setups, teardowns and tests.
///
/// A fresh value is constructed for every test case execution.
pub trait TestFixture: Sized + 'static {
    /// Builds a new fixture around the execution's [`Fixture`].
    fn new(fixture: Fixture) -> Self;

    /// Returns the fixture handle this value was built with.
    fn fixture(&self) -> &Fixture;
}

/// Logging and failure-reporting handle for one test case execution.
///
/// Clones share the same underlying instance.
#[derive(Clone)]
pub struct Fixture {
    inner: Arc<Inner>,
}

struct Inner {
    t: Arc<dyn TestReporter>,
    verbose: bool,
    log: Mutex<String>,
    finalized: AtomicBool,
}

impl Fixture {
    /// Creates a fixture bound to a host reporting handle.
    pub fn new(t: Arc<dyn TestReporter>, verbose: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                t,
                verbose,
                log: Mutex::new(String::new()),
                finalized: AtomicBool::new(false),
            }),
        }
    }

    /// Returns the host reporting handle.
    pub fn t(&self) -> &Arc<dyn TestReporter> {
        &self.inner.t
    }

    /// Returns the host-assigned name of the running test.
    pub fn name(&self) -> &str {
        self.inner.t.name()
    }

    /// Returns true if buffered output is flushed even for passing tests.
    pub fn verbose(&self) -> bool {
        self.inner.verbose
    }

    /// Runs a nested sub-test under the current test.
    pub fn run(&self, name: &str, test: SubTest) -> bool {
        self.inner.t.run(name, test)
    }

    /// Appends raw text to the output buffer.
    pub fn write(&self, text: &str) {
        self.inner
            .log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_str(text);
    }

    /// Appends text to the output buffer.
    pub fn print(&self, text: &str) {
        self.write(text);
    }

    /// Appends a line to the output buffer.
    pub fn println(&self, text: &str) {
        self.write(text);
        self.write("\n");
    }

    /// Records a failure message and keeps running.
    pub fn error(&self, message: &str) {
        self.inner.t.fail();
        self.println(message);
    }

    /// Records a failure message and aborts the test.
    ///
    /// Teardowns still run before the abort reaches the host.
    pub fn fatal(&self, message: &str) -> ! {
        self.error(message);
        self.inner.t.fail_now()
    }

    /// Skips the rest of the test.
    pub fn skip(&self, message: &str) -> ! {
        self.inner.t.skip(message)
    }

    /// Returns true if the test has been marked failed.
    pub fn failed(&self) -> bool {
        self.inner.t.failed()
    }

    /// Returns a snapshot of the buffered output.
    pub fn output(&self) -> String {
        self.inner
            .log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns true if both handles refer to the same fixture instance.
    pub fn ptr_eq(a: &Fixture, b: &Fixture) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Returns true once the fixture has been finalized.
    pub fn is_finalized(&self) -> bool {
        self.inner.finalized.load(Ordering::SeqCst)
    }

    /// Records a recovered panic as a test failure.
    pub(crate) fn recover_panic(&self, payload: &(dyn std::any::Any + Send)) {
        self.println(&format!("PANIC: {}", panic_message(payload)));
        self.inner.t.fail();
    }

    /// Ends the execution this fixture belongs to.
    ///
    /// Foreign panics are recovered and reported as failures; host abort
    /// signals are re-raised once the buffered output has been flushed.
    pub(crate) fn finalize(&self, outcome: thread::Result<()>) {
        if self.inner.finalized.swap(true, Ordering::SeqCst) {
            tracing::warn!(test = %self.name(), "fixture finalized more than once");
            if let Err(payload) = outcome {
                panic::resume_unwind(payload);
            }
            return;
        }

        let signal = match outcome {
            Ok(()) => None,
            Err(payload) if is_control_signal(&*payload) => Some(payload),
            Err(payload) => {
                self.recover_panic(&*payload);
                None
            }
        };

        self.flush();
        tracing::debug!(test = %self.name(), failed = self.failed(), "fixture finalized");

        if let Some(payload) = signal {
            panic::resume_unwind(payload);
        }
    }

    fn flush(&self) {
        let log = std::mem::take(
            &mut *self
                .inner
                .log
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let log = log.trim();
        if log.is_empty() {
            return;
        }
        if self.inner.t.failed() || self.inner.verbose {
            self.inner.t.log(&format!("\n{}\n", log));
        }
    }
}

impl std::fmt::Debug for Fixture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fixture")
            .field("name", &self.name())
            .field("verbose", &self.inner.verbose)
            .finish()
    }
}
