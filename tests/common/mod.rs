#![allow(dead_code)]

use proptest::prelude::ProptestConfig;

/// Routes `tracing` output through the test harness. Honors `RUST_LOG`.
pub fn init_test_logging() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env()
      .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
    .with_test_writer()
    .try_init();
}

pub fn test_proptest_config(cases: u32) -> ProptestConfig {
  ProptestConfig {
    cases: cases,
    ..ProptestConfig::default()
  }
}
