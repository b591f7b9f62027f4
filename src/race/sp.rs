use std::collections::HashMap;

use tracing::debug;

use crate::config::{DetectConfig, OrderConfig};
use crate::error::Result;
use crate::sequence::Sequence;
use crate::sp::{HappensBefore, NodeId, SpTree};

use super::*;

/// Finds races in an `SpTree` using the English and Hebrew orders.
///
/// Building the orders costs one pass over the tree; each candidate pair
/// then costs a constant number of label comparisons.
#[derive(Debug, Clone, Default)]
pub struct SpRaceDetector {
  order: OrderConfig,
  detect: DetectConfig,
}

impl SpRaceDetector {
  pub fn new(order: OrderConfig, detect: DetectConfig) -> Self {
    Self {
      order: order,
      detect: detect,
    }
  }

  pub fn detect(&self, tree: &SpTree) -> Result<RaceReport> {
    self.detect.validate()?;
    let hb = HappensBefore::build(tree, &self.order)?;
    detect_sp_races(tree, &hb, &self.detect)
  }
}

/// Reports every conflicting pair of leaves of `tree` that `hb` does not
/// order. `hb` must have been built from `tree`.
pub fn detect_sp_races<S>(tree: &SpTree, hb: &HappensBefore<S>, config: &DetectConfig) -> Result<RaceReport>
where S: Sequence<NodeId> + Sync {
  let candidates: Vec<Candidate<'_, NodeId>> = tree.accesses().map(|(id, event, access)| {
    Candidate {
      key: id,
      event: event.id(),
      access: access,
    }
  }).collect();

  let races = scan(&candidates, config, |u, v| hb.concurrent(u, v))?;

  let names: HashMap<EventId, String> = tree.leaves().filter_map(|(id, event)| {
    tree.name(id).map(|name| (event.id(), name.to_string()))
  }).collect();

  let report = RaceReport::new(races, names);
  debug!(
    nodes = tree.len(),
    accesses = candidates.len(),
    threads = config.threads,
    races = report.len(),
    "sp race scan finished");
  Ok(report)
}
