#![forbid(unsafe_code)]

//! Render sinks: where (re-)rendered slot output goes.
//!
//! The templating layer implements [`RenderSink`] to patch its output.
//! [`RenderLog`] keeps every render in memory, which is what tests and the
//! demo replay use.

use serde::Serialize;

use crate::slot::{Output, SlotKey};

/// Receives every render of every bound slot, in render order.
pub trait RenderSink {
    /// `renders` is the slot's render count including this one.
    fn rendered(&mut self, slot: &SlotKey, output: &Output, renders: u64);
}

/// One recorded render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderEntry {
    /// Position in the log, starting at 0.
    pub seq: u64,
    pub slot: SlotKey,
    pub renders: u64,
    pub output: Output,
}

/// In-memory render history.
#[derive(Debug, Clone, Default)]
pub struct RenderLog {
    entries: Vec<RenderEntry>,
}

impl RenderLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> &[RenderEntry] {
        &self.entries
    }

    /// Entries recorded at or after position `seq`.
    #[must_use]
    pub fn since(&self, seq: u64) -> &[RenderEntry] {
        let start = usize::try_from(seq).unwrap_or(usize::MAX).min(self.entries.len());
        &self.entries[start..]
    }

    /// Next sequence number to be assigned.
    #[must_use]
    pub fn cursor(&self) -> u64 {
        self.entries.len() as u64
    }

    /// How many renders of `slot` were logged.
    #[must_use]
    pub fn count_for(&self, slot: &SlotKey) -> usize {
        self.entries.iter().filter(|e| &e.slot == slot).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl RenderSink for RenderLog {
    fn rendered(&mut self, slot: &SlotKey, output: &Output, renders: u64) {
        let seq = self.cursor();
        self.entries.push(RenderEntry {
            seq,
            slot: slot.clone(),
            renders,
            output: output.clone(),
        });
    }
}
