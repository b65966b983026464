#![forbid(unsafe_code)]

//! Records and the ordered collection that owns them.
//!
//! The collection is plain data: it knows nothing about dependents. The
//! [`Store`](crate::Store) wraps it and turns every effective mutation into
//! an invalidation of the record-set key.
//!
//! # Invariants
//!
//! 1. Iteration order is insertion order.
//! 2. Record IDs are unique for the lifetime of the collection; clearing
//!    does not rewind the ID counter.
//! 3. A field patch that changes nothing reports `false` from
//!    [`Collection::update`].

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::StoreError;
use crate::value::{RecordId, Value};

/// A set of named field values, used both as initial record contents and as
/// an update patch.
///
/// In a patch, a field mapped to [`Value::Unset`] removes that field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Fields(BTreeMap<String, Value>);

impl Fields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field assignment.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Value of `name`, or [`Value::Unset`].
    #[must_use]
    pub fn get(&self, name: &str) -> Value {
        self.0.get(name).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge `patch` into `self`. Returns whether any field changed.
    fn merge(&mut self, patch: Fields) -> bool {
        let mut changed = false;
        for (name, value) in patch.0 {
            if value.is_unset() {
                changed |= self.0.remove(&name).is_some();
            } else if self.0.get(&name) != Some(&value) {
                self.0.insert(name, value);
                changed = true;
            }
        }
        changed
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .filter(|(_, v): &(String, Value)| !v.is_unset())
                .collect(),
        )
    }
}

/// An identified, mutable field set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    #[serde(rename = "_id")]
    id: RecordId,
    #[serde(flatten)]
    fields: Fields,
}

impl Record {
    #[must_use]
    pub const fn id(&self) -> RecordId {
        self.id
    }

    /// Value of field `name`, or [`Value::Unset`].
    #[must_use]
    pub fn get(&self, name: &str) -> Value {
        self.fields.get(name)
    }

    #[must_use]
    pub const fn fields(&self) -> &Fields {
        &self.fields
    }
}

/// Ordered record list with sequential ID generation.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    records: Vec<Record>,
    next_id: u64,
}

impl Collection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and return its freshly generated ID.
    pub fn insert(&mut self, fields: Fields) -> RecordId {
        let id = RecordId::new(self.next_id);
        self.next_id += 1;
        let mut record = Record {
            id,
            fields: Fields::new(),
        };
        record.fields.merge(fields);
        self.records.push(record);
        id
    }

    /// Merge `patch` into the record with `id`.
    ///
    /// Returns `Ok(true)` if a field changed, `Ok(false)` if the patch was
    /// already reflected.
    ///
    /// # Errors
    ///
    /// [`StoreError::RecordNotFound`] if no record has `id`.
    pub fn update(&mut self, id: RecordId, patch: Fields) -> Result<bool, StoreError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::RecordNotFound(id))?;
        Ok(record.fields.merge(patch))
    }

    /// Remove every record, returning how many were removed.
    pub fn remove_all(&mut self) -> usize {
        let removed = self.records.len();
        self.records.clear();
        removed
    }

    #[must_use]
    pub fn find(&self, id: RecordId) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Snapshot of all records in insertion order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Record> {
        self.records.clone()
    }
}
