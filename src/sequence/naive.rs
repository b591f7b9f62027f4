use super::*;

/// A `Sequence<T>` backed by a plain `Vec`. Uses linear search to find
/// positions, so every operation is O(n).
pub struct NaiveSequence<T> {
  elems: Vec<(SlotId, T)>,
  issued: u64,
  stats: SequenceStats,
}

impl<T> NaiveSequence<T> {
  fn position(&self, slot: SlotId) -> Result<usize> {
    self.elems.iter()
      .position(|(id, _)| *id == slot)
      .ok_or_else(|| slot.stale())
  }

  /// Handles are never reused: the counter is split across index and
  /// generation.
  fn issue(&mut self) -> SlotId {
    let n = self.issued;
    self.issued += 1;
    SlotId::new(n as u32, (n >> 32) as u32)
  }
}

impl<T> Sequence<T> for NaiveSequence<T> {
  fn new() -> Self {
    Self {
      elems: Vec::new(),
      issued: 0,
      stats: SequenceStats::default(),
    }
  }

  fn with_config(config: &OrderConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self::new())
  }

  fn insert_after(&mut self, at: Option<SlotId>, value: T) -> Result<SlotId> {
    let pos = match at {
      None => 0,
      Some(slot) => self.position(slot)? + 1,
    };
    let id = self.issue();

    self.stats.touched += (self.elems.len() - pos) as u64;
    self.stats.inserts += 1;
    self.elems.insert(pos, (id, value));
    Ok(id)
  }

  fn delete(&mut self, slot: SlotId) -> Result<T> {
    let pos = self.position(slot)?;
    let (_, value) = self.elems.remove(pos);

    self.stats.touched += (self.elems.len() - pos) as u64;
    self.stats.deletes += 1;
    Ok(value)
  }

  fn precedes(&self, a: SlotId, b: SlotId) -> Result<bool> {
    Ok(self.position(a)? < self.position(b)?)
  }

  fn get(&self, slot: SlotId) -> Result<&T> {
    let pos = self.position(slot)?;
    Ok(&self.elems[pos].1)
  }

  fn handles(&self) -> Vec<SlotId> {
    self.elems.iter().map(|(id, _)| *id).collect()
  }

  fn len(&self) -> usize {
    self.elems.len()
  }

  fn stats(&self) -> SequenceStats {
    self.stats
  }
}
