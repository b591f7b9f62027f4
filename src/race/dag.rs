use std::collections::HashMap;

use tracing::debug;

use crate::config::DetectConfig;
use crate::dag::{DagNodeId, HbDag};
use crate::error::Result;

use super::*;

/// Finds races in an arbitrary happens-before graph by searching for a
/// path between every conflicting pair. Quadratic in the number of
/// accesses times the size of the graph; meant as a reference.
#[derive(Debug, Clone, Default)]
pub struct DagRaceDetector {
  detect: DetectConfig,
}

impl DagRaceDetector {
  pub fn new(detect: DetectConfig) -> Self {
    Self {
      detect: detect,
    }
  }

  pub fn detect(&self, dag: &HbDag) -> Result<RaceReport> {
    detect_dag_races(dag, &self.detect)
  }
}

/// Reports every conflicting pair of events with no path between them
/// in either direction. Fails with `DagCycle` on a cyclic graph.
pub fn detect_dag_races(dag: &HbDag, config: &DetectConfig) -> Result<RaceReport> {
  config.validate()?;
  dag.check_acyclic()?;

  let candidates: Vec<Candidate<'_, DagNodeId>> = dag.accesses().map(|(id, event, access)| {
    Candidate {
      key: id,
      event: event.id(),
      access: access,
    }
  }).collect();

  let races = scan(&candidates, config, |u, v| {
    Ok(!dag.reaches(u, v)? && !dag.reaches(v, u)?)
  })?;

  let names: HashMap<EventId, String> = (0..dag.len()).filter_map(|i| {
    dag.node(DagNodeId(i)).and_then(|n| n.event().map(|e| (e.id(), n.name().to_string())))
  }).collect();

  let report = RaceReport::new(races, names);
  debug!(
    nodes = dag.len(),
    edges = dag.edge_count(),
    accesses = candidates.len(),
    races = report.len(),
    "dag race scan finished");
  Ok(report)
}
