#![forbid(unsafe_code)]

//! View bindings over a [`lumen_store::Store`].
//!
//! - [`Binder::bind_render`]: attach a render function to a [`SlotKey`].
//!   It renders immediately and re-renders whenever something it read
//!   changes.
//! - [`Binder::bind_event`]: attach a handler to `(selector, kind)`.
//!   [`Binder::dispatch`] routes a [`UiEvent`] to matching handlers, which
//!   mutate the store.
//! - [`RenderSink`]: receives every render; [`RenderLog`] records them.
//!
//! Control flow: UI event → dispatch → store mutation → dependents re-run →
//! slot outputs replaced → sink notified.

pub mod binder;
pub mod error;
pub mod event;
pub mod sink;
pub mod slot;

pub use binder::{Binder, SharedSink};
pub use error::ViewError;
pub use event::{EventBinding, EventContext, EventKind, UiEvent};
pub use sink::{RenderEntry, RenderLog, RenderSink};
pub use slot::{Output, RenderContext, SlotKey, SlotState};
