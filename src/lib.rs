//! Fixture Runner - fixture-driven test case execution
//!
//! This library runs the methods of a user-defined fixture type as test
//! cases: setups run before each test body, teardowns always run after it,
//! and every execution gets a fresh fixture value. Skipped, long-running and
//! focused test cases are resolved by method name and configuration, and
//! test cases may opt into parallel execution through the host runner.
//!
//! ```no_run
//! use fixture_runner::{Configuration, Fixture, Harness, HarnessConfig, Suite, TestFixture};
//!
//! struct Counter {
//!     fixture: Fixture,
//!     value: u32,
//! }
//!
//! impl TestFixture for Counter {
//!     fn new(fixture: Fixture) -> Self {
//!         Self { fixture, value: 0 }
//!     }
//!
//!     fn fixture(&self) -> &Fixture {
//!         &self.fixture
//!     }
//! }
//!
//! impl Counter {
//!     fn setup(&mut self) {
//!         self.value = 1;
//!     }
//!
//!     fn test_increment(&mut self) {
//!         self.value += 1;
//!         if self.value != 2 {
//!             self.fixture.error("increment went wrong");
//!         }
//!     }
//! }
//!
//! let harness = Harness::new(HarnessConfig::from_env()).unwrap();
//! let summary = harness.run("Counter", |t| {
//!     Suite::<Counter>::new()
//!         .method("setup", Counter::setup)
//!         .method("test_increment", Counter::test_increment)
//!         .run(&*t, &Configuration::new());
//! });
//! assert!(!summary.has_failures(), "{}", summary.report());
//! ```

pub mod config;
pub mod error;
pub mod fixture;
pub mod host;
pub mod logging;
pub mod method;
pub mod positions;
pub mod runner;
pub mod test_case;

pub use config::Configuration;
pub use error::{Error, Result};
pub use fixture::{Fixture, TestFixture};
pub use host::{
    FailNow, Harness, HarnessConfig, SkipNow, SubTest, Summary, TestOutcome, TestReporter,
    TestStatus,
};
pub use method::{Method, MethodInfo};
pub use positions::TestCasePositions;
pub use runner::Suite;
pub use test_case::{RunState, TestCase};
