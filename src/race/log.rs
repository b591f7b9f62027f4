use std::collections::HashMap;

use tracing::debug;

use crate::config::DetectConfig;
use crate::dag::{DagNodeId, HbDag};
use crate::error::Result;
use crate::sp::{Event, Op};

use super::*;

struct Logged {
  thread: String,
  event: EventId,
  access: Access,
}

/// A flat log of memory accesses tagged with the thread that made them.
///
/// There is no synchronization in the log: accesses from one thread are
/// ordered by program order and accesses from different threads are
/// never ordered. Event ids are handed out in logging order.
#[derive(Default)]
pub struct AccessLog {
  entries: Vec<Logged>,
}

impl AccessLog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn log_access(&mut self, thread: &str, var: &str, op: Op) -> EventId {
    let event = EventId(self.entries.len() as u32);
    self.entries.push(Logged {
      thread: thread.to_string(),
      event: event,
      access: Access {
        op: op,
        var: var.to_string(),
      },
    });
    event
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Returns the thread that made an access.
  pub fn thread(&self, event: EventId) -> Option<&str> {
    self.entries.get(event.0 as usize).map(|e| e.thread.as_str())
  }

  fn names(&self) -> HashMap<EventId, String> {
    self.entries.iter()
      .map(|e| (e.event, format!("{}:{}", e.thread, e.event)))
      .collect()
  }

  /// Reports every conflicting pair of accesses made by different threads.
  pub fn detect(&self, config: &DetectConfig) -> Result<RaceReport> {
    let candidates: Vec<Candidate<'_, usize>> = self.entries.iter().enumerate().map(|(i, e)| {
      Candidate {
        key: i,
        event: e.event,
        access: &e.access,
      }
    }).collect();

    let entries = &self.entries;
    let races = scan(&candidates, config, |a, b| Ok(entries[a].thread != entries[b].thread))?;

    let report = RaceReport::new(races, self.names());
    debug!(
      accesses = self.entries.len(),
      races = report.len(),
      "access log scan finished");
    Ok(report)
  }

  /// Builds the happens-before graph of the log: one chain per thread in
  /// logging order, with no edges between threads.
  pub fn to_dag(&self) -> Result<HbDag> {
    let mut dag = HbDag::new();
    let mut last: HashMap<&str, DagNodeId> = HashMap::new();

    for e in self.entries.iter() {
      let name = format!("{}:{}", e.thread, e.event);
      let id = dag.add_event(&name, Event::new(e.event, Some(e.access.clone())));
      if let Some(prev) = last.insert(e.thread.as_str(), id) {
        dag.add_edge(prev, id)?;
      }
    }

    Ok(dag)
  }
}
