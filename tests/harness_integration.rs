//! End-to-end fixture runs through the built-in harness.

use std::sync::Mutex;

use fixture_runner::{
    logging, Configuration, Error, Fixture, Harness, HarnessConfig, Suite, TestFixture,
    TestStatus,
};

fn harness() -> Harness {
    logging::init();
    Harness::new(HarnessConfig::default().with_parallelism(2)).unwrap()
}

/// Records its own lifecycle and checks it from inside the run.
struct Lifecycle {
    fixture: Fixture,
    steps: Vec<&'static str>,
}

impl TestFixture for Lifecycle {
    fn new(fixture: Fixture) -> Self {
        Self {
            fixture,
            steps: Vec::new(),
        }
    }

    fn fixture(&self) -> &Fixture {
        &self.fixture
    }
}

impl Lifecycle {
    fn setup_first(&mut self) {
        self.steps.push("setup_first");
    }

    fn setup_second(&mut self) {
        self.steps.push("setup_second");
    }

    fn test_sees_both_setups(&mut self) {
        if self.steps != ["setup_first", "setup_second"] {
            self.fixture
                .error(&format!("unexpected steps before test: {:?}", self.steps));
        }
        self.steps.push("test");
    }

    fn test_starts_from_fresh_state(&mut self) {
        if self.steps.len() != 2 {
            self.fixture.error("state leaked from another test case");
        }
        self.steps.push("test");
    }

    fn teardown_checks_order(&mut self) {
        if self.steps != ["setup_first", "setup_second", "test"] {
            self.fixture
                .error(&format!("unexpected steps before teardown: {:?}", self.steps));
        }
    }

    fn helper_is_not_a_test(&mut self) {
        self.fixture.error("helpers must not be run");
    }
}

fn lifecycle_suite() -> Suite<Lifecycle> {
    Suite::new()
        .method("setup_first", Lifecycle::setup_first)
        .method("setup_second", Lifecycle::setup_second)
        .method("test_sees_both_setups", Lifecycle::test_sees_both_setups)
        .method(
            "test_starts_from_fresh_state",
            Lifecycle::test_starts_from_fresh_state,
        )
        .method("teardown_checks_order", Lifecycle::teardown_checks_order)
        .method("helper_is_not_a_test", Lifecycle::helper_is_not_a_test)
}

#[test]
fn parallel_fixture_passes_with_fresh_instances() {
    let summary = harness().run("Lifecycle", |t| {
        lifecycle_suite().run(&*t, &Configuration::new());
    });

    assert!(!summary.has_failures(), "{}", summary.report());
    assert_eq!(summary.passed(), 3);
    assert!(summary.outcome("Lifecycle/test_sees_both_setups").is_some());
    assert!(summary
        .outcome("Lifecycle/test_starts_from_fresh_state")
        .is_some());
    assert!(summary.outcome("Lifecycle/helper_is_not_a_test").is_none());
}

#[test]
fn sequential_fixture_runs_cases_in_registration_order() {
    let summary = harness().run("Lifecycle", |t| {
        lifecycle_suite().run(&*t, &Configuration::new().with_all_sequential());
    });

    let names: Vec<_> = summary.outcomes.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Lifecycle/test_sees_both_setups",
            "Lifecycle/test_starts_from_fresh_state",
            "Lifecycle"
        ]
    );
    assert!(summary.into_result().is_ok());
}

struct Markers {
    fixture: Fixture,
}

impl TestFixture for Markers {
    fn new(fixture: Fixture) -> Self {
        Self { fixture }
    }

    fn fixture(&self) -> &Fixture {
        &self.fixture
    }
}

impl Markers {
    fn test_plain(&mut self) {}

    fn skip_test_disabled(&mut self) {
        self.fixture.error("skipped tests must not run");
    }

    fn long_test_soak(&mut self) {}
}

fn markers_suite() -> Suite<Markers> {
    Suite::new()
        .method("test_plain", Markers::test_plain)
        .method("skip_test_disabled", Markers::skip_test_disabled)
        .method("long_test_soak", Markers::long_test_soak)
}

#[test]
fn skipped_test_reports_its_registration_site() {
    let summary = harness().run("Markers", |t| {
        markers_suite().run(&*t, &Configuration::new());
    });

    let skipped = summary.outcome("Markers/skip_test_disabled").unwrap();
    assert_eq!(skipped.status, TestStatus::Skipped);
    assert!(skipped.output[0].starts_with('\n'));
    assert!(skipped.output[0].contains("harness_integration.rs:"));
    assert_eq!(
        summary.outcome("Markers/long_test_soak").unwrap().status,
        TestStatus::Passed
    );
}

#[test]
fn long_tests_are_skipped_in_short_mode() {
    let harness = Harness::new(HarnessConfig::default().with_short(true)).unwrap();
    let summary = harness.run("Markers", |t| {
        markers_suite().run(&*t, &Configuration::new());
    });

    let long = summary.outcome("Markers/long_test_soak").unwrap();
    assert_eq!(long.status, TestStatus::Skipped);
    assert!(long.output[0].starts_with("Skipped long-running test:\n"));
    assert_eq!(
        summary.outcome("Markers/test_plain").unwrap().status,
        TestStatus::Passed
    );
}

#[test]
fn long_running_configuration_marks_every_case_long() {
    let harness = Harness::new(HarnessConfig::default().with_short(true)).unwrap();
    let summary = harness.run("Markers", |t| {
        markers_suite().run(&*t, &Configuration::new().with_long_running());
    });

    assert_eq!(summary.passed(), 1);
    assert_eq!(summary.skipped(), 3);
}

#[test]
fn executed_tests_log_their_definition() {
    let summary = harness().run("Markers", |t| {
        markers_suite().run(&*t, &Configuration::new());
    });

    let plain = summary.outcome("Markers/test_plain").unwrap();
    assert!(plain.output[0].starts_with("Test definition:\n"));
    assert!(plain.output[0].contains("harness_integration.rs:"));
}

#[test]
fn renamed_sub_tests_keep_their_registration_site() {
    let summary = harness().run("Markers", |t| {
        Suite::<Markers>::new()
            .method("skip_test_disabled", Markers::skip_test_disabled)
            .method("skip_test_disabled", Markers::skip_test_disabled)
            .method("test_plain with space", Markers::test_plain)
            .run(&*t, &Configuration::new().with_all_sequential());
    });

    let duplicate = summary.outcome("Markers/skip_test_disabled#01").unwrap();
    assert_eq!(duplicate.status, TestStatus::Skipped);
    assert!(duplicate.output[0].contains("harness_integration.rs:"));

    let first = summary.outcome("Markers/skip_test_disabled").unwrap();
    assert!(first.output[0].contains("harness_integration.rs:"));

    let spaced = summary.outcome("Markers/test_plain_with_space").unwrap();
    assert_eq!(spaced.status, TestStatus::Passed);
    assert!(spaced.output[0].starts_with("Test definition:\n"));
    assert!(spaced.output[0].contains("harness_integration.rs:"));
}

struct Focused {
    fixture: Fixture,
}

impl TestFixture for Focused {
    fn new(fixture: Fixture) -> Self {
        Self { fixture }
    }

    fn fixture(&self) -> &Fixture {
        &self.fixture
    }
}

impl Focused {
    fn test_other(&mut self) {
        self.fixture.error("unfocused tests must not run");
    }

    fn focus_test_this_one(&mut self) {}
}

#[test]
fn focused_tests_run_alone() {
    let summary = harness().run("Focused", |t| {
        Suite::<Focused>::new()
            .method("test_other", Focused::test_other)
            .method("focus_test_this_one", Focused::focus_test_this_one)
            .run(&*t, &Configuration::new().with_all_sequential());
    });

    let names: Vec<_> = summary.outcomes.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Focused/focus_test_this_one", "Focused/test_other", "Focused"]
    );
    assert_eq!(
        summary.outcome("Focused/test_other").unwrap().status,
        TestStatus::Skipped
    );
    assert!(!summary.has_failures());
}

struct Empty {
    fixture: Fixture,
}

impl TestFixture for Empty {
    fn new(fixture: Fixture) -> Self {
        Self { fixture }
    }

    fn fixture(&self) -> &Fixture {
        &self.fixture
    }
}

impl Empty {
    fn setup_only(&mut self) {}
}

#[test]
fn fixture_without_tests_is_skipped() {
    let summary = harness().run("Empty", |t| {
        Suite::<Empty>::new()
            .method("setup_only", Empty::setup_only)
            .run(&*t, &Configuration::new().with_sequential_fixture());
    });

    let empty = summary.outcome("Empty").unwrap();
    assert_eq!(empty.status, TestStatus::Skipped);
    assert_eq!(empty.output, vec!["Fixture (Empty) has no test cases."]);
}

static RELEASED: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

struct Failing {
    fixture: Fixture,
}

impl TestFixture for Failing {
    fn new(fixture: Fixture) -> Self {
        Self { fixture }
    }

    fn fixture(&self) -> &Fixture {
        &self.fixture
    }
}

impl Failing {
    fn test_aborts(&mut self) {
        self.fixture.fatal("expected 1, got 2");
    }

    fn test_panics(&mut self) {
        let values: Vec<u32> = Vec::new();
        let total = values[3] + 1;
        self.fixture.println(&total.to_string());
    }

    fn teardown_release(&mut self) {
        RELEASED.lock().unwrap().push("released");
    }
}

#[test]
fn failures_are_reported_and_teardowns_still_run() {
    let summary = harness().run("Failing", |t| {
        Suite::<Failing>::new()
            .method("test_aborts", Failing::test_aborts)
            .method("test_panics", Failing::test_panics)
            .method("teardown_release", Failing::teardown_release)
            .run(&*t, &Configuration::new());
    });

    assert_eq!(RELEASED.lock().unwrap().len(), 2);
    assert_eq!(summary.failed(), 3);

    let aborted = summary.outcome("Failing/test_aborts").unwrap();
    assert!(aborted.output.iter().any(|o| o.contains("expected 1, got 2")));

    let panicked = summary.outcome("Failing/test_panics").unwrap();
    assert!(panicked.output.iter().any(|o| o.contains("PANIC: index out of bounds")));

    match summary.into_result() {
        Err(Error::TestsFailed { failed, report, .. }) => {
            assert_eq!(failed, 3);
            assert!(report.contains("--- FAIL: Failing/test_aborts"));
        }
        other => panic!("expected failing summary, got {:?}", other.map(|s| s.total())),
    }
}
