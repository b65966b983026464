#![forbid(unsafe_code)]

use lumen_store::StoreError;
use thiserror::Error;

use crate::event::EventKind;
use crate::slot::SlotKey;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("slot {0} is already bound")]
    SlotAlreadyBound(SlotKey),

    #[error("slot {0} is not bound")]
    SlotNotBound(SlotKey),

    #[error("invalid event spec `{spec}`: {reason}")]
    InvalidEventSpec { spec: String, reason: String },

    #[error("{kind} event carries no record context")]
    MissingRecord { kind: EventKind },

    #[error("{kind} event carries no value")]
    MissingEventValue { kind: EventKind },

    #[error(transparent)]
    Store(#[from] StoreError),
}
