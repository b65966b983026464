#![forbid(unsafe_code)]

//! Render slots and their lifecycle.
//!
//! # State transitions
//!
//! ```text
//!  ┌────────────┐  bind   ┌──────────────┐
//!  │ Unrendered ├────────▶│ Rendered(n)  │──┐ dependency invalidated
//!  └────────────┘         └──────────────┘◀─┘ (output replaced, n += 1)
//! ```
//!
//! A slot leaves `Rendered` only by being unbound.

use std::fmt;

use lumen_store::{Record, RecordId, Value};
use serde::Serialize;

/// A named output target: a template, optionally instantiated for one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SlotKey {
    pub template: String,
    pub instance: Option<RecordId>,
}

impl SlotKey {
    /// A template with a single instance (e.g. the list itself).
    #[must_use]
    pub fn template(name: impl Into<String>) -> Self {
        Self {
            template: name.into(),
            instance: None,
        }
    }

    /// A template instance bound to `record`.
    #[must_use]
    pub fn instance(name: impl Into<String>, record: RecordId) -> Self {
        Self {
            template: name.into(),
            instance: Some(record),
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instance {
            Some(id) => write!(f, "{}#{id}", self.template),
            None => write!(f, "{}", self.template),
        }
    }
}

/// What a render function sees besides the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    pub slot: SlotKey,
    /// The record this template instance is bound to, if any.
    pub record: Option<RecordId>,
}

impl RenderContext {
    #[must_use]
    pub fn new(slot: SlotKey) -> Self {
        let record = slot.instance;
        Self { slot, record }
    }
}

/// Rendered output of a slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Output {
    Records(Vec<Record>),
    Flag(bool),
    Value(Value),
}

impl From<Vec<Record>> for Output {
    fn from(records: Vec<Record>) -> Self {
        Self::Records(records)
    }
}

impl From<bool> for Output {
    fn from(flag: bool) -> Self {
        Self::Flag(flag)
    }
}

impl From<Value> for Output {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Lifecycle phase of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    #[default]
    Unrendered,
    Rendered { renders: u64 },
}

impl SlotState {
    /// Number of renders so far.
    #[must_use]
    pub const fn renders(self) -> u64 {
        match self {
            Self::Unrendered => 0,
            Self::Rendered { renders } => renders,
        }
    }

    /// Record one more render and return the new count.
    pub fn advance(&mut self) -> u64 {
        let renders = self.renders() + 1;
        *self = Self::Rendered { renders };
        renders
    }
}
