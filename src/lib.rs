//! Determinacy-race detection for fork-join programs.
//!
//! A fork-join computation is given as a series-parallel parse tree
//! (`SpTree`). The crate builds the English and Hebrew orders of the tree
//! on order-maintenance sequences and uses them to answer happens-before
//! queries in constant time, then reports every pair of conflicting,
//! logically parallel accesses. A reachability-based detector over an
//! explicit happens-before graph (`HbDag`) serves as a reference.


///////////////////////////////////////////////////////////////////////////////
//// Modules
///////////////////////////////////////////////////////////////////////////////

pub mod config;
pub mod dag;
pub mod error;
pub mod race;
pub mod sequence;
pub mod sp;

#[cfg(test)]
mod testing;


///////////////////////////////////////////////////////////////////////////////
//// Exports
///////////////////////////////////////////////////////////////////////////////

pub use crate::config::{DetectConfig, OrderConfig};
pub use crate::dag::{DagNodeId, HbDag};
pub use crate::error::{Error, Result, StructuralError};
pub use crate::race::{AccessLog, DagRaceDetector, Race, RaceReport, SpRaceDetector};
pub use crate::sequence::{NaiveSequence, OrderedSequence, Sequence, SequenceStats, SlotId};
pub use crate::sp::{Access, EventId, HappensBefore, NodeId, NodeSpec, Op, SpTree, SpTreeBuilder};
