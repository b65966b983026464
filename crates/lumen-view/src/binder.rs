#![forbid(unsafe_code)]

//! Binds render functions and event handlers to a [`Store`].
//!
//! Each bound slot is a store computation: the render function runs under
//! dependency tracking, and the store re-runs it when something it read
//! changes. Every run replaces the slot's output and is forwarded to the
//! optional [`RenderSink`].
//!
//! Event handlers live in an explicit `(kind, selector) -> handler` table.
//! [`Binder::dispatch`] runs every matching handler in registration order
//! and returns the first error to the caller.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use lumen_store::{ComputationId, Store};
use tracing::{debug, warn};

use crate::error::ViewError;
use crate::event::{EventBinding, EventContext, EventKind, UiEvent};
use crate::sink::RenderSink;
use crate::slot::{Output, RenderContext, SlotKey, SlotState};

type EventHandler = dyn Fn(&Store, &EventContext, &UiEvent) -> Result<(), ViewError>;

/// Shared sink handle, as held by the binder and every slot computation.
pub type SharedSink = Rc<RefCell<dyn RenderSink>>;

#[derive(Default)]
struct SlotCell {
    state: SlotState,
    output: Option<Output>,
}

struct BoundSlot {
    key: SlotKey,
    computation: ComputationId,
    cell: Rc<RefCell<SlotCell>>,
}

struct HandlerEntry {
    binding: EventBinding,
    handler: Rc<EventHandler>,
}

pub struct Binder {
    store: Store,
    slots: Vec<BoundSlot>,
    handlers: Vec<HandlerEntry>,
    sink: Option<SharedSink>,
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("slots", &self.slots.iter().map(|s| &s.key).collect::<Vec<_>>())
            .field("handlers", &self.handlers.len())
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl Binder {
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self {
            store,
            slots: Vec::new(),
            handlers: Vec::new(),
            sink: None,
        }
    }

    /// Forward every render to `sink`. Applies to slots bound afterwards.
    #[must_use]
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    // ── Render slots ─────────────────────────────────────────────────────

    /// Bind `render` to `slot` and render it once immediately.
    ///
    /// # Errors
    ///
    /// [`ViewError::SlotAlreadyBound`] if `slot` already has a render
    /// function.
    pub fn bind_render<F>(&mut self, slot: SlotKey, render: F) -> Result<(), ViewError>
    where
        F: Fn(&Store, &RenderContext) -> Output + 'static,
    {
        if self.position(&slot).is_some() {
            return Err(ViewError::SlotAlreadyBound(slot));
        }

        let cell = Rc::new(RefCell::new(SlotCell::default()));
        let ctx = RenderContext::new(slot.clone());
        let sink = self.sink.clone();
        let slot_cell = Rc::clone(&cell);
        let computation = self.store.autorun(slot.to_string(), move |store| {
            let output = render(store, &ctx);
            let mut cell = slot_cell.borrow_mut();
            let renders = cell.state.advance();
            if let Some(sink) = &sink {
                sink.borrow_mut().rendered(&ctx.slot, &output, renders);
            }
            cell.output = Some(output);
        });

        debug!(slot = %slot, computation = computation.raw(), "slot bound");
        self.slots.push(BoundSlot {
            key: slot,
            computation,
            cell,
        });
        Ok(())
    }

    /// Tear down `slot`; its render function stops re-running.
    ///
    /// # Errors
    ///
    /// [`ViewError::SlotNotBound`] if nothing is bound to `slot`.
    pub fn unbind(&mut self, slot: &SlotKey) -> Result<(), ViewError> {
        let index = self
            .position(slot)
            .ok_or_else(|| ViewError::SlotNotBound(slot.clone()))?;
        let bound = self.slots.remove(index);
        self.store.stop(bound.computation);
        debug!(slot = %slot, "slot unbound");
        Ok(())
    }

    #[must_use]
    pub fn is_bound(&self, slot: &SlotKey) -> bool {
        self.position(slot).is_some()
    }

    /// Latest output of `slot`.
    #[must_use]
    pub fn output(&self, slot: &SlotKey) -> Option<Output> {
        self.find(slot)
            .and_then(|bound| bound.cell.borrow().output.clone())
    }

    #[must_use]
    pub fn state(&self, slot: &SlotKey) -> Option<SlotState> {
        self.find(slot).map(|bound| bound.cell.borrow().state)
    }

    /// Renders of `slot` so far; 0 if unbound.
    #[must_use]
    pub fn render_count(&self, slot: &SlotKey) -> u64 {
        self.state(slot).map_or(0, SlotState::renders)
    }

    /// Bound slots in bind order.
    #[must_use]
    pub fn slots(&self) -> Vec<SlotKey> {
        self.slots.iter().map(|s| s.key.clone()).collect()
    }

    /// Store computation backing `slot`.
    #[must_use]
    pub fn computation(&self, slot: &SlotKey) -> Option<ComputationId> {
        self.find(slot).map(|bound| bound.computation)
    }

    fn position(&self, slot: &SlotKey) -> Option<usize> {
        self.slots.iter().position(|s| &s.key == slot)
    }

    fn find(&self, slot: &SlotKey) -> Option<&BoundSlot> {
        self.slots.iter().find(|s| &s.key == slot)
    }

    // ── Events ───────────────────────────────────────────────────────────

    /// Run `handler` on every event of `kind` fired from `selector`.
    pub fn bind_event<F>(&mut self, selector: impl Into<String>, kind: EventKind, handler: F)
    where
        F: Fn(&Store, &EventContext, &UiEvent) -> Result<(), ViewError> + 'static,
    {
        self.push_handler(EventBinding::new(kind, selector), Rc::new(handler));
    }

    /// Bind using an event-map key such as `"click .item"`.
    ///
    /// # Errors
    ///
    /// [`ViewError::InvalidEventSpec`] if `spec` does not parse.
    pub fn bind_event_spec<F>(&mut self, spec: &str, handler: F) -> Result<(), ViewError>
    where
        F: Fn(&Store, &EventContext, &UiEvent) -> Result<(), ViewError> + 'static,
    {
        let binding = EventBinding::parse(spec)?;
        self.push_handler(binding, Rc::new(handler));
        Ok(())
    }

    /// Bind a whole event map. Nothing is bound if any key fails to parse.
    ///
    /// # Errors
    ///
    /// [`ViewError::InvalidEventSpec`] for the first bad key.
    pub fn bind_events<I, F>(&mut self, map: I) -> Result<(), ViewError>
    where
        I: IntoIterator<Item = (&'static str, F)>,
        F: Fn(&Store, &EventContext, &UiEvent) -> Result<(), ViewError> + 'static,
    {
        let parsed = map
            .into_iter()
            .map(|(spec, handler)| EventBinding::parse(spec).map(|binding| (binding, handler)))
            .collect::<Result<Vec<_>, ViewError>>()?;
        for (binding, handler) in parsed {
            self.push_handler(binding, Rc::new(handler));
        }
        Ok(())
    }

    fn push_handler(&mut self, binding: EventBinding, handler: Rc<EventHandler>) {
        debug!(kind = %binding.kind, selector = ?binding.selector, "event bound");
        self.handlers.push(HandlerEntry { binding, handler });
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Deliver `event` to every matching handler, in registration order.
    ///
    /// Returns how many handlers ran.
    ///
    /// # Errors
    ///
    /// The first handler error; later handlers do not run.
    pub fn dispatch(&self, event: &UiEvent) -> Result<usize, ViewError> {
        let matching: Vec<Rc<EventHandler>> = self
            .handlers
            .iter()
            .filter(|entry| entry.binding.matches(event))
            .map(|entry| Rc::clone(&entry.handler))
            .collect();
        if matching.is_empty() {
            warn!(kind = %event.kind, selector = %event.selector, "no handler for event");
            return Ok(0);
        }

        let ctx = EventContext::from_event(event);
        for handler in &matching {
            handler(&self.store, &ctx, event)?;
        }
        Ok(matching.len())
    }
}
