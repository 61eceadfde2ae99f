//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use fixture_runner::host::{panic_message, unwind_fail, unwind_skip};
use fixture_runner::{FailNow, SkipNow, SubTest, TestReporter};

/// Synchronous host fake that journals every call it receives.
///
/// Sub-tests run inline on the calling thread, so the journal order is the
/// exact order of events.
pub struct RecordingReporter {
    name: String,
    short: bool,
    verbose: bool,
    journal: Arc<Mutex<Vec<String>>>,
    failed: AtomicBool,
    skipped: AtomicBool,
}

impl RecordingReporter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            short: false,
            verbose: false,
            journal: Arc::new(Mutex::new(Vec::new())),
            failed: AtomicBool::new(false),
            skipped: AtomicBool::new(false),
        }
    }

    pub fn with_short(mut self, short: bool) -> Self {
        self.short = short;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn child(&self, name: &str) -> Self {
        Self {
            name: format!("{}/{}", self.name, name),
            short: self.short,
            verbose: self.verbose,
            journal: Arc::clone(&self.journal),
            failed: AtomicBool::new(false),
            skipped: AtomicBool::new(false),
        }
    }

    fn record(&self, entry: String) {
        self.journal.lock().unwrap().push(entry);
    }

    /// Every journal entry, in order.
    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    /// Messages logged by fixture methods through `note`.
    pub fn calls(&self) -> Vec<String> {
        self.journal()
            .iter()
            .filter_map(|entry| entry.strip_prefix("call:"))
            .map(str::to_string)
            .collect()
    }

    /// Messages passed to `log`, in order.
    pub fn logs(&self) -> Vec<String> {
        self.journal()
            .iter()
            .filter_map(|entry| entry.strip_prefix("log:"))
            .map(str::to_string)
            .collect()
    }

    /// Names of all registered sub-tests.
    pub fn runs(&self) -> Vec<String> {
        self.journal()
            .iter()
            .filter_map(|entry| entry.strip_prefix("run:"))
            .map(str::to_string)
            .collect()
    }

    /// Final status recorded for a sub-test.
    pub fn status(&self, name: &str) -> Option<String> {
        let prefix = format!("done:{}:", name);
        self.journal()
            .iter()
            .find_map(|entry| entry.strip_prefix(&prefix).map(str::to_string))
    }

    /// Position of the first journal entry equal to `entry`.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.journal().iter().position(|e| e == entry)
    }
}

impl TestReporter for RecordingReporter {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, name: &str, test: SubTest) -> bool {
        let child = Arc::new(self.child(name));
        self.record(format!("run:{}", child.name));

        let reporter: Arc<dyn TestReporter> = Arc::clone(&child) as Arc<dyn TestReporter>;
        let outcome = panic::catch_unwind(AssertUnwindSafe(move || test(reporter)));
        if let Err(payload) = outcome {
            if payload.is::<SkipNow>() {
                child.skipped.store(true, Ordering::SeqCst);
            } else if payload.is::<FailNow>() {
                child.failed.store(true, Ordering::SeqCst);
            } else {
                child.record(format!("panic:{}", panic_message(&*payload)));
                child.failed.store(true, Ordering::SeqCst);
            }
        }

        let failed = child.failed.load(Ordering::SeqCst);
        let status = if failed {
            "failed"
        } else if child.skipped.load(Ordering::SeqCst) {
            "skipped"
        } else {
            "passed"
        };
        self.record(format!("done:{}:{}", child.name, status));
        if failed {
            self.fail();
        }
        !failed
    }

    fn parallel(&self) {
        self.record(format!("parallel:{}", self.name));
    }

    fn log(&self, message: &str) {
        match message.strip_prefix("call ") {
            Some(call) => self.record(format!("call:{}", call)),
            None => self.record(format!("log:{}", message)),
        }
    }

    fn fail(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }

    fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    fn skipped(&self) -> bool {
        self.skipped.load(Ordering::SeqCst)
    }

    fn fail_now(&self) -> ! {
        self.fail();
        unwind_fail()
    }

    fn skip_now(&self) -> ! {
        self.skipped.store(true, Ordering::SeqCst);
        unwind_skip()
    }

    fn is_short(&self) -> bool {
        self.short
    }

    fn is_verbose(&self) -> bool {
        self.verbose
    }
}
