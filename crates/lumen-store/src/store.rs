#![forbid(unsafe_code)]

//! The reactive store: session state and records with read-tracking.
//!
//! # Design
//!
//! [`Store`] is a cheap, cloneable handle over `Rc<RefCell<..>>` shared
//! state. Computations registered with [`Store::autorun`] run under a
//! tracking frame; every tracked read ([`Store::get`], [`Store::records`],
//! [`Store::record`]) made during the run records a [`DepKey`] in that
//! frame. When the run completes, the frame replaces the computation's
//! previous dependency set, so a computation depends on exactly what it read
//! last time.
//!
//! Mutations enqueue the key they changed, stamped with a change sequence
//! number. The queue is drained FIFO by the outermost mutation: a mutation
//! issued while a batch is already being processed (typically from inside a
//! computation) only enqueues, and its dependents run after the current
//! batch completes. A dependent whose last run started after the change
//! already saw the new value and is skipped, so a computation that read
//! several keys changed together re-runs once.
//!
//! # Invariants
//!
//! 1. A write that leaves the stored value unchanged enqueues nothing.
//! 2. Dependents of a key run in registration order.
//! 3. A key already waiting in the queue is not enqueued a second time.
//! 4. No `RefCell` borrow is held while user code runs.
//! 5. At most [`StoreConfig::max_cascade`] keys are processed per flush.
//! 6. A computation re-runs for a change only if its last run started
//!    before that change.
//!
//! # Failure Modes
//!
//! - **Runaway cascade**: computations that keep writing new values to keys
//!   they depend on. The flush stops after `max_cascade` keys, drops the rest
//!   of the queue and logs a warning.
//! - **Computation panics**: the panic propagates to the mutating caller.
//!   Unwinding through the outermost batch discards pending invalidations
//!   and tracking frames, so later mutations notify normally. The panicking
//!   computation keeps the dependencies of its last completed run.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use tracing::{debug, trace, warn};

use crate::error::StoreError;
use crate::record::{Collection, Fields, Record};
use crate::session::SessionState;
use crate::value::{RecordId, Value};

/// Something a computation can depend on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DepKey {
    /// A session key.
    Session(String),
    /// The whole record set. Any record change invalidates it.
    Records,
}

impl DepKey {
    #[must_use]
    pub fn session(key: impl Into<String>) -> Self {
        Self::Session(key.into())
    }
}

impl fmt::Display for DepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session(key) => write!(f, "session:{key}"),
            Self::Records => write!(f, "records"),
        }
    }
}

/// Handle to a registered computation. Ordering is registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComputationId(u64);

impl ComputationId {
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Store tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Maximum number of invalidated keys processed in one flush.
    pub max_cascade: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { max_cascade: 1024 }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn with_max_cascade(mut self, max_cascade: usize) -> Self {
        self.max_cascade = max_cascade.max(1);
        self
    }
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Keys dequeued and delivered to their dependents.
    pub notifications: u64,
    /// Computation runs, including first runs.
    pub runs: u64,
    /// Writes skipped because the value was unchanged.
    pub noop_writes: u64,
    /// Flushes cut short by the cascade limit.
    pub cascade_overflows: u64,
    /// Dependents skipped because they already ran after the change.
    pub coalesced_runs: u64,
}

type ComputeFn = Rc<dyn Fn(&Store)>;

struct Computation {
    name: String,
    run: ComputeFn,
    deps: Vec<DepKey>,
    runs: u64,
    /// Change sequence number when the last run started.
    started_at: u64,
}

/// Keys read by one running computation.
struct Frame {
    id: ComputationId,
    reads: Vec<DepKey>,
}

struct StoreInner {
    config: StoreConfig,
    session: SessionState,
    records: Collection,
    computations: BTreeMap<ComputationId, Computation>,
    dependents: AHashMap<DepKey, BTreeSet<ComputationId>>,
    tracking: Vec<Frame>,
    /// Invalidated keys with the sequence number of their latest change.
    pending: VecDeque<(DepKey, u64)>,
    /// Bumped on every change.
    epoch: u64,
    flushing: bool,
    next_computation: u64,
    stats: StoreStats,
}

impl StoreInner {
    fn track(&mut self, key: DepKey) {
        if let Some(frame) = self.tracking.last_mut()
            && !frame.reads.contains(&key)
        {
            trace!(computation = frame.id.0, key = %key, "tracked read");
            frame.reads.push(key);
        }
    }

    fn enqueue(&mut self, key: DepKey) {
        self.epoch += 1;
        let epoch = self.epoch;
        match self.pending.iter_mut().find(|(pending, _)| *pending == key) {
            Some(entry) => entry.1 = epoch,
            None => self.pending.push_back((key, epoch)),
        }
    }

    /// Replace the dependency edges of `id` with `reads`.
    fn rewire(&mut self, id: ComputationId, reads: Vec<DepKey>) {
        let Some(computation) = self.computations.get_mut(&id) else {
            return;
        };
        let old = std::mem::replace(&mut computation.deps, reads);
        for key in &old {
            unlink(&mut self.dependents, key, id);
        }
        for key in &computation.deps {
            self.dependents.entry(key.clone()).or_default().insert(id);
        }
    }
}

fn unlink(
    dependents: &mut AHashMap<DepKey, BTreeSet<ComputationId>>,
    key: &DepKey,
    id: ComputationId,
) {
    if let Some(ids) = dependents.get_mut(key) {
        ids.remove(&id);
        if ids.is_empty() {
            dependents.remove(key);
        }
    }
}

/// Ends the outermost batch, also when unwinding out of it.
struct BatchGuard<'a> {
    inner: &'a RefCell<StoreInner>,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        let Ok(mut inner) = self.inner.try_borrow_mut() else {
            return;
        };
        inner.flushing = false;
        if std::thread::panicking() {
            let dropped = inner.pending.len();
            inner.pending.clear();
            inner.tracking.clear();
            warn!(dropped, "batch unwound, pending invalidations discarded");
        }
    }
}

/// Reactive store handle. Clones share the same state.
#[derive(Clone)]
pub struct Store {
    inner: Rc<RefCell<StoreInner>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Store")
            .field("session_keys", &inner.session.len())
            .field("records", &inner.records.len())
            .field("computations", &inner.computations.len())
            .field("pending", &inner.pending.len())
            .finish()
    }
}

impl Store {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                config,
                session: SessionState::new(),
                records: Collection::new(),
                computations: BTreeMap::new(),
                dependents: AHashMap::new(),
                tracking: Vec::new(),
                pending: VecDeque::new(),
                epoch: 0,
                flushing: false,
                next_computation: 0,
                stats: StoreStats::default(),
            })),
        }
    }

    // ── Session ──────────────────────────────────────────────────────────

    /// Current value of session `key`, or [`Value::Unset`].
    ///
    /// Inside a computation, registers the computation as a dependent of
    /// `key`.
    pub fn get(&self, key: &str) -> Value {
        let mut inner = self.inner.borrow_mut();
        inner.track(DepKey::session(key));
        inner.session.get(key)
    }

    /// Like [`get`](Self::get) but without registering a dependency.
    #[must_use]
    pub fn peek(&self, key: &str) -> Value {
        self.inner.borrow().session.get(key)
    }

    /// Store `value` under session `key` and notify its dependents.
    ///
    /// Returns `false`, and notifies nobody, if the value is unchanged.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let changed = {
            let mut inner = self.inner.borrow_mut();
            let changed = inner.session.set(key.clone(), value.into());
            if changed {
                inner.enqueue(DepKey::Session(key));
            } else {
                inner.stats.noop_writes += 1;
            }
            changed
        };
        if changed {
            self.flush();
        }
        changed
    }

    /// Clear the session, as on client reconnect.
    ///
    /// Dependents of every key that held a value are notified in one batch.
    pub fn reset_session(&self) {
        self.batch(|| {
            let mut inner = self.inner.borrow_mut();
            let keys = inner.session.clear();
            debug!(keys = keys.len(), "session reset");
            for key in keys {
                inner.enqueue(DepKey::Session(key));
            }
        });
    }

    /// Session keys currently holding a value, sorted. Untracked.
    #[must_use]
    pub fn session_keys(&self) -> Vec<String> {
        self.inner.borrow().session.keys()
    }

    // ── Records ──────────────────────────────────────────────────────────

    /// All records in insertion order. Tracks the record set.
    pub fn records(&self) -> Vec<Record> {
        let mut inner = self.inner.borrow_mut();
        inner.track(DepKey::Records);
        inner.records.to_vec()
    }

    /// The record with `id`, if any. Tracks the whole record set.
    pub fn record(&self, id: RecordId) -> Option<Record> {
        let mut inner = self.inner.borrow_mut();
        inner.track(DepKey::Records);
        inner.records.find(id).cloned()
    }

    /// Number of records. Untracked.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.inner.borrow().records.len()
    }

    /// Append a record and notify record-set dependents.
    pub fn insert_record(&self, fields: Fields) -> RecordId {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.records.insert(fields);
            inner.enqueue(DepKey::Records);
            id
        };
        debug!(record = %id, "record inserted");
        self.flush();
        id
    }

    /// Merge `patch` into the record with `id`.
    ///
    /// Record-set dependents are notified only if a field actually changed.
    ///
    /// # Errors
    ///
    /// [`StoreError::RecordNotFound`] if no record has `id`. Nothing is
    /// changed or notified in that case.
    pub fn update_record(&self, id: RecordId, patch: Fields) -> Result<(), StoreError> {
        let changed = {
            let mut inner = self.inner.borrow_mut();
            let changed = inner.records.update(id, patch)?;
            if changed {
                inner.enqueue(DepKey::Records);
            } else {
                inner.stats.noop_writes += 1;
            }
            changed
        };
        if changed {
            self.flush();
        }
        Ok(())
    }

    /// Remove every record. Returns how many were removed.
    ///
    /// Record-set dependents are notified only if the set was non-empty.
    pub fn remove_all(&self) -> usize {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            let removed = inner.records.remove_all();
            if removed > 0 {
                inner.enqueue(DepKey::Records);
            }
            removed
        };
        if removed > 0 {
            debug!(removed, "records cleared");
            self.flush();
        }
        removed
    }

    // ── Computations ─────────────────────────────────────────────────────

    /// Register `f` as a computation and run it once immediately.
    ///
    /// `f` re-runs whenever any key it read during its previous run changes.
    pub fn autorun(&self, name: impl Into<String>, f: impl Fn(&Store) + 'static) -> ComputationId {
        let name = name.into();
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = ComputationId(inner.next_computation);
            inner.next_computation += 1;
            inner.computations.insert(
                id,
                Computation {
                    name,
                    run: Rc::new(f),
                    deps: Vec::new(),
                    runs: 0,
                    started_at: 0,
                },
            );
            id
        };
        self.batch(|| self.run_computation(id));
        id
    }

    /// Tear down a computation. Returns `false` if it was not registered.
    pub fn stop(&self, id: ComputationId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(computation) = inner.computations.remove(&id) else {
            return false;
        };
        for key in &computation.deps {
            unlink(&mut inner.dependents, key, id);
        }
        debug!(computation = id.0, name = %computation.name, "computation stopped");
        true
    }

    /// Run `f`, deferring notifications until it returns.
    ///
    /// Nested batches join the outermost one.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        let owns = {
            let mut inner = self.inner.borrow_mut();
            !std::mem::replace(&mut inner.flushing, true)
        };
        let _guard = owns.then(|| BatchGuard { inner: &self.inner });
        let out = f();
        if owns {
            self.process_pending();
        }
        out
    }

    /// Keys `id` read during its last run.
    #[must_use]
    pub fn dependencies(&self, id: ComputationId) -> Vec<DepKey> {
        self.inner
            .borrow()
            .computations
            .get(&id)
            .map(|c| c.deps.clone())
            .unwrap_or_default()
    }

    /// Computations depending on `key`, in registration order.
    #[must_use]
    pub fn dependents(&self, key: &DepKey) -> Vec<ComputationId> {
        self.inner
            .borrow()
            .dependents
            .get(key)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// How many times `id` has run, or `None` if it is not registered.
    #[must_use]
    pub fn run_count(&self, id: ComputationId) -> Option<u64> {
        self.inner.borrow().computations.get(&id).map(|c| c.runs)
    }

    #[must_use]
    pub fn stats(&self) -> StoreStats {
        self.inner.borrow().stats
    }

    // ── Scheduling ───────────────────────────────────────────────────────

    fn flush(&self) {
        self.batch(|| ());
    }

    fn process_pending(&self) {
        let mut processed = 0usize;
        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                if inner.pending.is_empty() {
                    None
                } else if processed >= inner.config.max_cascade {
                    let dropped = inner.pending.len();
                    inner.pending.clear();
                    inner.stats.cascade_overflows += 1;
                    warn!(
                        dropped,
                        limit = inner.config.max_cascade,
                        "cascade limit reached, dropping pending invalidations"
                    );
                    None
                } else {
                    inner.pending.pop_front().map(|(key, changed_at)| {
                        inner.stats.notifications += 1;
                        let ids: Vec<ComputationId> = inner
                            .dependents
                            .get(&key)
                            .map(|ids| ids.iter().copied().collect())
                            .unwrap_or_default();
                        (key, changed_at, ids)
                    })
                }
            };
            let Some((key, changed_at, ids)) = next else {
                break;
            };
            processed += 1;
            debug!(key = %key, dependents = ids.len(), "invalidate");
            for id in ids {
                if self.is_stale(id, changed_at) {
                    self.run_computation(id);
                }
            }
        }
    }

    /// Whether `id` last started before the change stamped `changed_at`.
    fn is_stale(&self, id: ComputationId, changed_at: u64) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(started_at) = inner.computations.get(&id).map(|c| c.started_at) else {
            return false;
        };
        if started_at < changed_at {
            return true;
        }
        trace!(computation = id.0, changed_at, started_at, "already current");
        inner.stats.coalesced_runs += 1;
        false
    }

    fn run_computation(&self, id: ComputationId) {
        let run = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            let Some(computation) = inner.computations.get_mut(&id) else {
                return;
            };
            computation.runs += 1;
            computation.started_at = inner.epoch;
            trace!(computation = id.0, name = %computation.name, run = computation.runs, "run");
            let run = Rc::clone(&computation.run);
            inner.stats.runs += 1;
            inner.tracking.push(Frame {
                id,
                reads: Vec::new(),
            });
            run
        };
        run(self);
        let mut inner = self.inner.borrow_mut();
        if let Some(frame) = inner.tracking.pop() {
            inner.rewire(frame.id, frame.reads);
        }
    }
}
