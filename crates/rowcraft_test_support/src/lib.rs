pub mod fake_executor;
pub mod fixtures;

pub use fake_executor::{FakeExecutor, FakeExecutorStats, FakeQueryOutcome, FakeSchemaSource};

/// Route `log` output through the test harness. Safe to call repeatedly.
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
