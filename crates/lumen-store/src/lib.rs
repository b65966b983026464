#![forbid(unsafe_code)]

//! Reactive session state and record collection.
//!
//! - [`Store`]: the reactive handle. Tracked reads register the running
//!   computation as a dependent; effective writes re-run dependents.
//! - [`SessionState`]: per-client key/value map, never persisted.
//! - [`Collection`]: ordered records with sequential [`RecordId`]s.
//! - [`Value`]: the dynamically-typed payload of keys and fields.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use lumen_store::{Store, Value};
//!
//! let store = Store::new();
//! let seen = Rc::new(Cell::new(0));
//! let seen_in_run = Rc::clone(&seen);
//! store.autorun("watch", move |s| {
//!     let _ = s.get("currentItem");
//!     seen_in_run.set(seen_in_run.get() + 1);
//! });
//!
//! store.set("currentItem", 1);
//! store.set("currentItem", 1); // unchanged: no re-run
//! assert_eq!(seen.get(), 2);
//! assert_eq!(store.peek("currentItem"), Value::Int(1));
//! ```

pub mod error;
pub mod record;
pub mod session;
pub mod store;
pub mod value;

pub use error::StoreError;
pub use record::{Collection, Fields, Record};
pub use session::SessionState;
pub use store::{ComputationId, DepKey, Store, StoreConfig, StoreStats};
pub use value::{RecordId, Value};
