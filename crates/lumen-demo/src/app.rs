#![forbid(unsafe_code)]

//! The item-list tutorial: a list of records, one of which is selected.
//!
//! - Startup clears the collection and inserts fixture records `0..n`.
//! - `items` renders the full record list.
//! - `item#<id>` renders whether that record is the current selection.
//! - Clicking an item or focusing its input selects it; typing in the input
//!   renames it.

use std::cell::RefCell;
use std::rc::Rc;

use lumen_store::{Fields, RecordId, Store};
use lumen_view::{
    Binder, EventContext, Output, RenderContext, RenderLog, SharedSink, SlotKey, UiEvent,
    ViewError,
};
use tracing::info;

use crate::config::DemoConfig;
use crate::error::Result;
use crate::script::ScriptStep;

/// Session key holding the selected record.
pub const CURRENT_ITEM: &str = "currentItem";
pub const ITEMS_TEMPLATE: &str = "items";
pub const ITEM_TEMPLATE: &str = "item";

/// Startup hook: replace the collection with `count` fixture records whose
/// `id` field runs `0..count`.
///
/// Selection compares record IDs, and the `id` fields match them only when
/// the store has never held records. Only [`App::boot`] calls this, on a
/// fresh store.
fn startup(store: &Store, count: usize) -> Vec<RecordId> {
    let removed = store.remove_all();
    let ids: Vec<RecordId> = (0..count)
        .map(|i| store.insert_record(Fields::new().with("id", i as i64)))
        .collect();
    info!(removed, inserted = ids.len(), "fixtures loaded");
    ids
}

pub fn render_items(store: &Store, _ctx: &RenderContext) -> Output {
    Output::Records(store.records())
}

pub fn is_selected(store: &Store, ctx: &RenderContext) -> Output {
    let current = store.get(CURRENT_ITEM).as_id();
    Output::Flag(current.is_some() && current == ctx.record)
}

pub fn select_item(
    store: &Store,
    ctx: &EventContext,
    _event: &UiEvent,
) -> std::result::Result<(), ViewError> {
    store.set(CURRENT_ITEM, ctx.require_record()?);
    Ok(())
}

pub fn rename_item(
    store: &Store,
    ctx: &EventContext,
    event: &UiEvent,
) -> std::result::Result<(), ViewError> {
    let id = ctx.require_record()?;
    let name = event.require_value()?;
    store.update_record(id, Fields::new().with("name", name))?;
    Ok(())
}

/// Store, bindings and render history of one client.
pub struct App {
    store: Store,
    binder: Binder,
    log: Rc<RefCell<RenderLog>>,
}

impl App {
    /// Run startup, initialize the session and bind every slot and event.
    ///
    /// # Errors
    ///
    /// Propagates binding errors.
    pub fn boot(config: &DemoConfig) -> Result<Self> {
        let store = Store::with_config(config.store.clone());
        startup(&store, config.fixture_count);

        if let Some(item) = config.initial_item {
            store.set(CURRENT_ITEM, RecordId::new(item));
        }

        let log = Rc::new(RefCell::new(RenderLog::new()));
        let sink: SharedSink = log.clone();
        let mut binder = Binder::new(store.clone()).with_sink(sink);
        binder.bind_render(SlotKey::template(ITEMS_TEMPLATE), render_items)?;
        binder.bind_event_spec("click .item", select_item)?;
        binder.bind_event_spec("input input", rename_item)?;
        binder.bind_event_spec("focus input", select_item)?;

        let mut app = Self { store, binder, log };
        app.sync_item_slots()?;
        Ok(app)
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub fn binder(&self) -> &Binder {
        &self.binder
    }

    #[must_use]
    pub fn log(&self) -> Rc<RefCell<RenderLog>> {
        Rc::clone(&self.log)
    }

    /// Apply one scripted step. Returns how many handlers ran.
    ///
    /// # Errors
    ///
    /// Handler errors, e.g. renaming a record that does not exist.
    pub fn apply(&mut self, step: &ScriptStep) -> Result<usize> {
        let ran = match step.to_event() {
            Some(event) => self.binder.dispatch(&event)?,
            None => {
                self.store.reset_session();
                0
            }
        };
        self.sync_item_slots()?;
        Ok(ran)
    }

    /// Whether record `id` renders as selected.
    #[must_use]
    pub fn is_selected(&self, id: RecordId) -> Option<bool> {
        match self.binder.output(&SlotKey::instance(ITEM_TEMPLATE, id)) {
            Some(Output::Flag(flag)) => Some(flag),
            _ => None,
        }
    }

    /// Keep one `item` slot per record, as the list template would.
    fn sync_item_slots(&mut self) -> Result<()> {
        let live: Vec<RecordId> = self.store.records().iter().map(|r| r.id()).collect();
        let stale: Vec<SlotKey> = self
            .binder
            .slots()
            .into_iter()
            .filter(|slot| {
                slot.template == ITEM_TEMPLATE
                    && slot.instance.is_some_and(|id| !live.contains(&id))
            })
            .collect();
        for slot in &stale {
            self.binder.unbind(slot)?;
        }
        for id in live {
            let slot = SlotKey::instance(ITEM_TEMPLATE, id);
            if !self.binder.is_bound(&slot) {
                self.binder.bind_render(slot, is_selected)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_store::Value;

    #[test]
    fn startup_replaces_collection() {
        let store = Store::new();
        store.insert_record(Fields::new().with("stale", true));
        let ids = startup(&store, 3);
        let records = store.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records.iter().map(|r| r.id()).collect::<Vec<_>>(), ids);
        for (i, r) in records.iter().enumerate() {
            assert_eq!(r.get("id"), Value::Int(i as i64));
            assert!(r.get("stale").is_unset());
        }
    }

    #[test]
    fn boot_selects_initial_item() {
        let app = App::boot(&DemoConfig::default()).unwrap();
        assert_eq!(app.is_selected(RecordId::new(0)), Some(false));
        assert_eq!(app.is_selected(RecordId::new(1)), Some(true));
        assert_eq!(app.is_selected(RecordId::new(2)), Some(false));
    }

    #[test]
    fn fixture_id_fields_match_record_ids() {
        let app = App::boot(&DemoConfig::default().with_fixture_count(5)).unwrap();
        for record in app.store().records() {
            let raw = i64::try_from(record.id().raw()).unwrap();
            assert_eq!(record.get("id"), Value::Int(raw));
        }
        let selected: Vec<Value> = app
            .store()
            .records()
            .iter()
            .filter(|r| app.is_selected(r.id()) == Some(true))
            .map(|r| r.get("id"))
            .collect();
        assert_eq!(selected, vec![Value::Int(1)]);
    }

    #[test]
    fn boot_without_selection() {
        let app = App::boot(&DemoConfig::default().with_initial_item(None)).unwrap();
        for i in 0..3 {
            assert_eq!(app.is_selected(RecordId::new(i)), Some(false));
        }
    }

    #[test]
    fn binds_list_and_item_slots() {
        let app = App::boot(&DemoConfig::default()).unwrap();
        let slots: Vec<String> = app.binder().slots().iter().map(ToString::to_string).collect();
        assert_eq!(slots, vec!["items", "item#0", "item#1", "item#2"]);
        assert_eq!(app.binder().handler_count(), 3);
    }

    #[test]
    fn reconnect_clears_selection() {
        let mut app = App::boot(&DemoConfig::default()).unwrap();
        app.apply(&ScriptStep::Reconnect).unwrap();
        assert!(app.store().peek(CURRENT_ITEM).is_unset());
        assert_eq!(app.is_selected(RecordId::new(1)), Some(false));
    }
}
