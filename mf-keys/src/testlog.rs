//! Logging for tests.

/// Send log output to the test harness.  Safe to call from every test.
pub fn setup() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}
