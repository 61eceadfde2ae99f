//! Built-in host runner.
//!
//! Every test runs on its own named thread. A test that calls `parallel()`
//! hands control back to its parent and resumes only after the parent's
//! body has returned; a parent finishes only once all of its parallel
//! children have finished. The number of parallel tests running at once is
//! bounded by a semaphore.
//!
//! Environment variables read by [`HarnessConfig::from_env`]:
//! - `FIXTURE_SHORT=1` - short mode, long-running test cases are skipped
//! - `FIXTURE_VERBOSE=1` - verbose mode, fixture output is always flushed
//! - `FIXTURE_PARALLEL=<n>` - maximum number of parallel tests running at once
//!
//! The harness blocks on tokio channels from plain threads, so it must not
//! be driven from inside an async runtime.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::{oneshot, OwnedSemaphorePermit, Semaphore};

use super::{
    panic_message, unique_sub_name, unwind_fail, unwind_skip, FailNow, SkipNow, SubTest,
    TestReporter,
};
use crate::error::{Error, Result};

/// Host-wide settings shared by every test of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Short mode: long-running test cases are skipped.
    pub short: bool,
    /// Verbose mode: test output is kept even for passing tests.
    pub verbose: bool,
    /// Maximum number of parallel tests running at once.
    pub parallelism: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            short: false,
            verbose: false,
            parallelism: default_parallelism(),
        }
    }
}

impl HarnessConfig {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            short: env_flag("FIXTURE_SHORT"),
            verbose: env_flag("FIXTURE_VERBOSE"),
            parallelism: std::env::var("FIXTURE_PARALLEL")
                .ok()
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or_else(default_parallelism),
        }
    }

    /// Sets short mode.
    pub fn with_short(mut self, short: bool) -> Self {
        self.short = short;
        self
    }

    /// Sets verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Sets the parallel test limit. Zero is treated as one.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false)
}

fn default_parallelism() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Final status of a single test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

impl TestStatus {
    fn label(self) -> &'static str {
        match self {
            TestStatus::Passed => "PASS",
            TestStatus::Failed => "FAIL",
            TestStatus::Skipped => "SKIP",
        }
    }
}

/// Outcome of a single test or sub-test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestOutcome {
    /// Fully-qualified test name.
    pub name: String,
    /// Final status.
    pub status: TestStatus,
    /// Logged output, in order.
    pub output: Vec<String>,
    /// Wall-clock time spent in the test, children included.
    pub elapsed: Duration,
}

/// Outcomes of one harness run, in completion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    /// Unique identifier of the run.
    pub run_id: String,
    /// Outcome of every test and sub-test.
    pub outcomes: Vec<TestOutcome>,
}

impl Summary {
    /// Returns the number of recorded tests.
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns the number of passed tests.
    pub fn passed(&self) -> usize {
        self.count(TestStatus::Passed)
    }

    /// Returns the number of failed tests.
    pub fn failed(&self) -> usize {
        self.count(TestStatus::Failed)
    }

    /// Returns the number of skipped tests.
    pub fn skipped(&self) -> usize {
        self.count(TestStatus::Skipped)
    }

    /// Returns true if any test failed.
    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// Looks up the outcome of a test by its fully-qualified name.
    pub fn outcome(&self, name: &str) -> Option<&TestOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    fn count(&self, status: TestStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Renders a plain-text report with one status line per test.
    pub fn report(&self) -> String {
        let mut report = String::new();
        for outcome in &self.outcomes {
            report.push_str(&format!(
                "--- {}: {} ({:.2}s)\n",
                outcome.status.label(),
                outcome.name,
                outcome.elapsed.as_secs_f64()
            ));
            for entry in &outcome.output {
                for line in entry.lines() {
                    report.push_str("    ");
                    report.push_str(line);
                    report.push('\n');
                }
            }
        }
        report
    }

    /// Serializes the summary as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Error::Serialization)
    }

    /// Converts to a Result, failing if any test failed.
    pub fn into_result(self) -> Result<Self> {
        if self.has_failures() {
            Err(Error::TestsFailed {
                failed: self.failed(),
                total: self.total(),
                report: self.report(),
            })
        } else {
            Ok(self)
        }
    }
}

/// Thread-per-test host runner.
pub struct Harness {
    config: HarnessConfig,
    runtime: Arc<Runtime>,
}

impl Harness {
    /// Creates a harness with the given configuration.
    pub fn new(config: HarnessConfig) -> Result<Self> {
        let runtime = Builder::new_current_thread().build()?;
        Ok(Self {
            config,
            runtime: Arc::new(runtime),
        })
    }

    /// Creates a harness configured from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(HarnessConfig::from_env())
    }

    /// Returns the harness configuration.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Runs a root test and every sub-test it registers.
    pub fn run<T>(&self, name: &str, test: T) -> Summary
    where
        T: FnOnce(Arc<dyn TestReporter>) + Send + 'static,
    {
        let run_id = uuid::Uuid::new_v4().to_string();
        let shared = Arc::new(Shared {
            config: self.config,
            runtime: Arc::clone(&self.runtime),
            permits: Arc::new(Semaphore::new(self.config.parallelism.max(1))),
            outcomes: Mutex::new(Vec::new()),
        });

        tracing::info!(
            run_id = %run_id,
            test = name,
            short = self.config.short,
            parallelism = self.config.parallelism,
            "starting harness run"
        );

        let top = Arc::new(Node::new(String::new(), Arc::clone(&shared), None, None));
        Tester {
            node: Arc::clone(&top),
        }
        .run(name, Box::new(test));
        top.wait_for_parallel();

        let outcomes = std::mem::take(&mut *lock(&shared.outcomes));
        let summary = Summary { run_id, outcomes };
        tracing::info!(
            run_id = %summary.run_id,
            passed = summary.passed(),
            failed = summary.failed(),
            skipped = summary.skipped(),
            "harness run finished"
        );
        summary
    }
}

/// State shared by all tests of one run.
struct Shared {
    config: HarnessConfig,
    runtime: Arc<Runtime>,
    permits: Arc<Semaphore>,
    outcomes: Mutex<Vec<TestOutcome>>,
}

impl Shared {
    fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        self.runtime
            .block_on(Arc::clone(&self.permits).acquire_owned())
            .ok()
    }
}

/// What a child tells its parent once the parent may stop waiting.
enum Signal {
    Parallel,
    Done,
}

struct Node {
    name: String,
    shared: Arc<Shared>,
    parent: Option<Arc<Node>>,
    state: Mutex<NodeState>,
}

#[derive(Default)]
struct NodeState {
    failed: bool,
    skipped: bool,
    parallel: bool,
    output: Vec<String>,
    sub_names: HashMap<String, usize>,
    signal: Option<oneshot::Sender<Signal>>,
    permit: Option<OwnedSemaphorePermit>,
    /// Parallel children waiting for this test's body to return.
    paused: Vec<oneshot::Sender<()>>,
    /// Threads of parallel children.
    running: Vec<JoinHandle<()>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Node {
    fn new(
        name: String,
        shared: Arc<Shared>,
        parent: Option<Arc<Node>>,
        signal: Option<oneshot::Sender<Signal>>,
    ) -> Self {
        Self {
            name,
            shared,
            parent,
            state: Mutex::new(NodeState {
                signal,
                ..NodeState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, NodeState> {
        lock(&self.state)
    }

    /// Derives a unique, fully-qualified name for a new sub-test.
    fn sub_name(&self, name: &str) -> String {
        let unique = unique_sub_name(&mut self.state().sub_names, name);
        if self.name.is_empty() {
            unique
        } else {
            format!("{}/{}", self.name, unique)
        }
    }

    fn record_outcome(&self, outcome: thread::Result<()>) {
        let Err(payload) = outcome else { return };
        let mut state = self.state();
        if payload.is::<SkipNow>() {
            state.skipped = true;
        } else if payload.is::<FailNow>() {
            state.failed = true;
        } else {
            state
                .output
                .push(format!("panic: {}", panic_message(&*payload)));
            state.failed = true;
        }
    }

    /// Releases paused parallel children and waits for all of them.
    fn wait_for_parallel(&self) {
        let (paused, running) = {
            let mut state = self.state();
            state.permit = None;
            (
                std::mem::take(&mut state.paused),
                std::mem::take(&mut state.running),
            )
        };

        for release in paused {
            let _ = release.send(());
        }
        for handle in running {
            if handle.join().is_err() {
                self.state().failed = true;
            }
        }
    }

    fn finish(&self, elapsed: Duration) {
        let (status, output, signal) = {
            let mut state = self.state();
            let status = if state.failed {
                TestStatus::Failed
            } else if state.skipped {
                TestStatus::Skipped
            } else {
                TestStatus::Passed
            };
            (status, state.output.clone(), state.signal.take())
        };

        if status == TestStatus::Failed {
            if let Some(parent) = &self.parent {
                parent.state().failed = true;
            }
        }

        tracing::info!(
            test = %self.name,
            ?status,
            elapsed_ms = elapsed.as_millis() as u64,
            "test finished"
        );

        lock(&self.shared.outcomes).push(TestOutcome {
            name: self.name.clone(),
            status,
            output,
            elapsed,
        });

        if let Some(signal) = signal {
            let _ = signal.send(Signal::Done);
        }
    }
}

fn run_node(node: Arc<Node>, test: SubTest) {
    let started = Instant::now();
    tracing::debug!(test = %node.name, "test started");

    let reporter: Arc<dyn TestReporter> = Arc::new(Tester {
        node: Arc::clone(&node),
    });
    let outcome = panic::catch_unwind(AssertUnwindSafe(move || test(reporter)));

    node.record_outcome(outcome);
    node.wait_for_parallel();
    node.finish(started.elapsed());
}

/// Reporting handle for one test running under a [`Harness`].
pub struct Tester {
    node: Arc<Node>,
}

impl TestReporter for Tester {
    fn name(&self) -> &str {
        &self.node.name
    }

    fn run(&self, name: &str, test: SubTest) -> bool {
        let full_name = self.node.sub_name(name);
        let (signal_tx, signal_rx) = oneshot::channel();
        let child = Arc::new(Node::new(
            full_name.clone(),
            Arc::clone(&self.node.shared),
            Some(Arc::clone(&self.node)),
            Some(signal_tx),
        ));

        let worker = Arc::clone(&child);
        let spawned = thread::Builder::new()
            .name(full_name.clone())
            .spawn(move || run_node(worker, test));

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.error(&format!("failed to start {}: {}", full_name, e));
                return false;
            }
        };

        match signal_rx.blocking_recv() {
            Ok(Signal::Parallel) => {
                self.node.state().running.push(handle);
                true
            }
            Ok(Signal::Done) | Err(_) => {
                let _ = handle.join();
                !child.state().failed
            }
        }
    }

    fn parallel(&self) {
        let signal = {
            let mut state = self.node.state();
            if state.parallel {
                drop(state);
                self.fatal("parallel called multiple times");
            }
            state.parallel = true;
            state.signal.take()
        };

        let Some(parent) = self.node.parent.as_ref() else {
            return;
        };

        tracing::debug!(test = %self.node.name, "pausing for parallel execution");
        let (release_tx, release_rx) = oneshot::channel();
        parent.state().paused.push(release_tx);
        if let Some(signal) = signal {
            let _ = signal.send(Signal::Parallel);
        }

        let _ = release_rx.blocking_recv();
        let permit = self.node.shared.acquire();
        self.node.state().permit = permit;
        tracing::debug!(test = %self.node.name, "resuming parallel test");
    }

    fn log(&self, message: &str) {
        if self.node.shared.config.verbose {
            tracing::debug!(test = %self.node.name, message, "test log");
        }
        self.node.state().output.push(message.to_string());
    }

    fn fail(&self) {
        self.node.state().failed = true;
    }

    fn failed(&self) -> bool {
        self.node.state().failed
    }

    fn skipped(&self) -> bool {
        self.node.state().skipped
    }

    fn fail_now(&self) -> ! {
        self.fail();
        unwind_fail()
    }

    fn skip_now(&self) -> ! {
        self.node.state().skipped = true;
        unwind_skip()
    }

    fn is_short(&self) -> bool {
        self.node.shared.config.short
    }

    fn is_verbose(&self) -> bool {
        self.node.shared.config.verbose
    }
}
