//! Plain-text slot records.
//!
//! One record per slot, whitespace-separated unsigned decimals:
//!
//! ```text
//! size s2 s1 start_rank
//! key_0 key_1 ... key_{size-1}
//! ```
//!
//! A collection dump is the slot count followed by its slot records in
//! position order. Line breaks carry no meaning on input.

use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::str::FromStr;
use std::sync::Arc;

use super::collection::SlotCollection;
use super::keyed::Keyed;
use super::slot::Slot;
use crate::config::CollectionConfig;
use crate::error::{CollectionError, RecordError};
use crate::key::Layout;

/// Whitespace tokenizer over a buffered reader.
struct Tokens<R> {
  reader: R,
  pending: VecDeque<String>,
}

impl<R: BufRead> Tokens<R> {
  fn new(reader: R) -> Self {
    Self { reader, pending: VecDeque::new() }
  }

  fn next<N: FromStr>(&mut self, field: &'static str) -> Result<N, RecordError> {
    loop {
      if let Some(token) = self.pending.pop_front() {
        return match token.parse() {
          Ok(value) => Ok(value),
          Err(_) => Err(RecordError::Parse { field, token }),
        };
      }
      let mut line = String::new();
      if self.reader.read_line(&mut line)? == 0 {
        return Err(RecordError::Truncated { field });
      }
      self.pending.extend(line.split_whitespace().map(str::to_owned));
    }
  }
}

impl<T: Keyed> Slot<T> {
  /// Write this slot as one record.
  pub fn dump<W: Write>(&self, mut writer: W) -> Result<(), RecordError> {
    writeln!(writer, "{} {} {} {}", self.len(), self.s2(), self.s1(), self.start_rank())?;
    let mut first = true;
    for item in self.keys() {
      if !first {
        writer.write_all(b" ")?;
      }
      write!(writer, "{}", item.raw())?;
      first = false;
    }
    writeln!(writer)?;
    Ok(())
  }

  /// Read one record: bounds and start rank are overwritten, keys are
  /// appended through [`Slot::put`] without any bound check.
  pub fn restore<R: BufRead>(&mut self, reader: R) -> Result<(), RecordError> {
    self.read_record(&mut Tokens::new(reader))
  }

  fn read_record<R: BufRead>(&mut self, tokens: &mut Tokens<R>) -> Result<(), RecordError> {
    let size: usize = tokens.next("size")?;
    let s2: u64 = tokens.next("s2")?;
    let s1: u64 = tokens.next("s1")?;
    let start_rank: usize = tokens.next("start_rank")?;

    self.set_bounds(s1, s2);
    self.set_start_rank(start_rank);
    for _ in 0..size {
      let raw: u64 = tokens.next("key")?;
      self.put(T::from_raw(raw));
    }
    Ok(())
  }
}

impl<T: Keyed> SlotCollection<T> {
  /// Write the slot count, then every slot record in position order.
  pub fn dump<W: Write>(&self, mut writer: W) -> Result<(), RecordError> {
    writeln!(writer, "{}", self.nb_slots())?;
    for slot in self.slots() {
      slot.dump(&mut writer)?;
    }
    Ok(())
  }

  /// Rebuild a collection from [`SlotCollection::dump`] output.
  ///
  /// The restored slots must tile the position range of `layout`.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "slots::restore"))]
  pub fn restore<R: BufRead>(
    layout: Arc<Layout>,
    config: CollectionConfig,
    reader: R,
  ) -> Result<Self, RecordError> {
    let mut tokens = Tokens::new(reader);
    let nslots: usize = tokens.next("slot count")?;
    if nslots == 0 {
      return Err(CollectionError::BrokenPartition { index: 0, reason: "no slots" }.into());
    }

    // the count is untrusted: grow as records arrive
    let mut slots = Vec::new();
    for _ in 0..nslots {
      let mut slot = Slot::new(Arc::clone(&layout), 0, 0, 0);
      slot.read_record(&mut tokens)?;
      slots.push(slot);
    }

    let collection = SlotCollection::from_slots(layout, config, slots);
    if let Err(err) = collection.check_partition() {
      #[cfg(feature = "tracing")]
      tracing::warn!(%err, "restored slots do not form a partition");
      return Err(err.into());
    }
    Ok(collection)
  }
}

#[cfg(test)]
#[path = "record_test.rs"]
mod record_test;
