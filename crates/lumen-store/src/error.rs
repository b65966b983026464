#![forbid(unsafe_code)]

use thiserror::Error;

use crate::value::RecordId;

/// Errors surfaced by store mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    RecordNotFound(RecordId),
}
