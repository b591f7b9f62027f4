//! Race detection
//!
//! A race is a pair of events that access the same variable, at least
//! one of them writing it, with neither happening before the other.
//! The detectors here enumerate every such pair.
//!
//! The `SpRaceDetector` works on an `SpTree` and decides each pair with
//! two label comparisons through `HappensBefore`. The `DagRaceDetector`
//! works on an arbitrary `HbDag` and decides each pair by searching the
//! graph in both directions. On a graph that encodes a series-parallel
//! tree the two report the same races.
//!
//! `AccessLog` covers the simplest input of all: a flat list of accesses
//! tagged by thread, with no synchronization between threads.
//!
//! All detectors can split the pair scan across threads. Workers only
//! read the already-built orders or graph.

mod dag;
mod log;
mod sp;

pub use self::dag::{detect_dag_races, DagRaceDetector};
pub use self::log::AccessLog;
pub use self::sp::{detect_sp_races, SpRaceDetector};

use std::collections::HashMap;
use std::fmt;
use std::panic;

use crate::config::DetectConfig;
use crate::error::Result;
use crate::sp::{Access, EventId};

/// Two conflicting, unordered events. `first` is always the smaller id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Race {
  first: EventId,
  second: EventId,
  var: String,
}

impl Race {
  pub fn new(a: EventId, b: EventId, var: &str) -> Self {
    Self {
      first: a.min(b),
      second: a.max(b),
      var: var.to_string(),
    }
  }

  pub fn first(&self) -> EventId {
    self.first
  }

  pub fn second(&self) -> EventId {
    self.second
  }

  pub fn var(&self) -> &str {
    &self.var
  }
}

/// The races found by a detector, sorted and without duplicates.
#[derive(Debug, Clone, Default)]
pub struct RaceReport {
  races: Vec<Race>,
  names: HashMap<EventId, String>,
}

impl RaceReport {
  pub fn new(mut races: Vec<Race>, names: HashMap<EventId, String>) -> Self {
    races.sort();
    races.dedup();
    Self {
      races: races,
      names: names,
    }
  }

  pub fn races(&self) -> &[Race] {
    &self.races
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Race> {
    self.races.iter()
  }

  pub fn len(&self) -> usize {
    self.races.len()
  }

  pub fn is_race_free(&self) -> bool {
    self.races.is_empty()
  }

  /// Tests if the two events were reported as racing, in either order.
  pub fn contains(&self, a: EventId, b: EventId) -> bool {
    let (first, second) = (a.min(b), a.max(b));
    self.races.iter().any(|r| r.first == first && r.second == second)
  }

  /// Returns the name of an event, as given by the tree or graph.
  pub fn name(&self, id: EventId) -> Option<&str> {
    self.names.get(&id).map(|n| n.as_str())
  }

  /// Returns each race as a pair of event names.
  pub fn named_pairs(&self) -> Vec<(String, String)> {
    self.races.iter().map(|r| (self.label(r.first), self.label(r.second))).collect()
  }

  fn label(&self, id: EventId) -> String {
    match self.name(id) {
      Some(name) => name.to_string(),
      None => id.to_string(),
    }
  }
}

impl<'a> IntoIterator for &'a RaceReport {
  type Item = &'a Race;
  type IntoIter = std::slice::Iter<'a, Race>;

  fn into_iter(self) -> Self::IntoIter {
    self.races.iter()
  }
}

impl fmt::Display for RaceReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.races.is_empty() {
      return writeln!(f, "no races");
    }
    for r in self.races.iter() {
      writeln!(f, "{} <-> {} on {}", self.label(r.first), self.label(r.second), r.var)?;
    }
    Ok(())
  }
}

/// An event that accesses memory, with whatever key the detector needs
/// to ask about its ordering.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate<'a, K> {
  pub key: K,
  pub event: EventId,
  pub access: &'a Access,
}

/// Checks every conflicting pair of candidates and keeps the ones that
/// `unordered` accepts.
pub(crate) fn scan<K, F>(candidates: &[Candidate<'_, K>], config: &DetectConfig, unordered: F) -> Result<Vec<Race>>
where K: Copy + Sync, F: Fn(K, K) -> Result<bool> + Sync {
  config.validate()?;
  if config.threads == 1 || candidates.len() < 2 {
    return scan_rows(candidates, 0, 1, &unordered);
  }

  let threads = config.threads.min(candidates.len());
  let unordered = &unordered;
  let outcome = crossbeam::thread::scope(|s| {
    let workers: Vec<_> = (0..threads).map(|t| {
      s.spawn(move |_| scan_rows(candidates, t, threads, unordered))
    }).collect();

    workers.into_iter().map(|w| match w.join() {
      Ok(rows) => rows,
      Err(payload) => panic::resume_unwind(payload),
    }).collect::<Vec<_>>()
  });

  let results = match outcome {
    Ok(results) => results,
    Err(payload) => panic::resume_unwind(payload),
  };

  let mut races = Vec::new();
  for rows in results {
    races.extend(rows?);
  }
  Ok(races)
}

/// Scans rows `offset`, `offset + stride`, ... of the upper triangle of
/// the pair matrix.
fn scan_rows<K, F>(candidates: &[Candidate<'_, K>], offset: usize, stride: usize, unordered: &F) -> Result<Vec<Race>>
where K: Copy, F: Fn(K, K) -> Result<bool> {
  let mut races = Vec::new();

  for i in (offset..candidates.len()).step_by(stride) {
    let u = &candidates[i];
    for v in candidates[i + 1..].iter() {
      if !u.access.conflicts_with(v.access) {
        continue;
      }
      if unordered(u.key, v.key)? {
        races.push(Race::new(u.event, v.event, &u.access.var));
      }
    }
  }

  Ok(races)
}
