//! Tunables for the order-maintenance structure and the race detectors.
//!
//! Both structs deserialize with `serde`, so they can be read from
//! whatever format the caller keeps its settings in. Missing fields take
//! their defaults.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest initial gap accepted. Keeps a freshly renumbered sequence far
/// away from the edges of the `i64` label range.
pub const MAX_INITIAL_GAP: i64 = 1 << 32;

/// Settings for an `OrderedSequence`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderConfig {
  /// Spacing between the labels of neighbouring slots when the sequence
  /// grows at either end, and the spacing restored by a relabel.
  pub initial_gap: i64,

  /// Number of slots a single relabel tries to stay within.
  pub block_size: usize,
}

impl Default for OrderConfig {
  fn default() -> Self {
    Self {
      initial_gap: 1 << 20,
      block_size: 50,
    }
  }
}

impl OrderConfig {
  pub fn with_initial_gap(mut self, gap: i64) -> Self {
    self.initial_gap = gap;
    self
  }

  pub fn with_block_size(mut self, block_size: usize) -> Self {
    self.block_size = block_size;
    self
  }

  pub fn validate(&self) -> Result<()> {
    if self.initial_gap < 2 {
      return Err(Error::InvalidConfig(format!(
        "initial_gap must be at least 2, got {}", self.initial_gap)));
    }
    if self.initial_gap > MAX_INITIAL_GAP {
      return Err(Error::InvalidConfig(format!(
        "initial_gap must be at most {}, got {}",
        MAX_INITIAL_GAP, self.initial_gap)));
    }
    if self.block_size < 2 {
      return Err(Error::InvalidConfig(format!(
        "block_size must be at least 2, got {}", self.block_size)));
    }
    Ok(())
  }
}

/// Settings for pair enumeration in the race detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
  /// Worker threads used to scan candidate pairs. `1` scans on the
  /// calling thread.
  pub threads: usize,
}

impl Default for DetectConfig {
  fn default() -> Self {
    Self {
      threads: 1,
    }
  }
}

impl DetectConfig {
  pub fn with_threads(mut self, threads: usize) -> Self {
    self.threads = threads;
    self
  }

  pub fn validate(&self) -> Result<()> {
    if self.threads == 0 {
      return Err(Error::InvalidConfig(
        "threads must be at least 1".to_string()));
    }
    Ok(())
  }
}
