//! Property-based invariant tests for the reactive store.
//!
//! 1. A dependent re-runs exactly once per value transition of its key.
//! 2. Record IDs come out sequential and records iterate in insertion order.
//! 3. A patch touches only the targeted record.
//! 4. Session writes never re-run record-set readers (and vice versa).
//! 5. Patching an unknown ID changes nothing and re-runs nothing.
//! 6. Registration order is preserved under arbitrary write sequences.
//! 7. A reader of several keys changed in one batch re-runs at most once.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use lumen_store::{Fields, RecordId, Store, Value};
use proptest::prelude::*;

fn count_runs(store: &Store, read: impl Fn(&Store) + 'static) -> Rc<Cell<u32>> {
    let runs = Rc::new(Cell::new(0u32));
    let runs_in = Rc::clone(&runs);
    store.autorun("probe", move |s| {
        read(s);
        runs_in.set(runs_in.get() + 1);
    });
    runs
}

// ═════════════════════════════════════════════════════════════════════════
// 1. One re-run per value transition
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn reruns_match_transitions(values in proptest::collection::vec(0i64..4, 0..64)) {
        let store = Store::new();
        let runs = count_runs(&store, |s| { let _ = s.get("k"); });

        let mut previous = Value::Unset;
        let mut transitions = 0u32;
        for v in values {
            let next = Value::Int(v);
            let changed = store.set("k", v);
            prop_assert_eq!(changed, next != previous);
            if next != previous {
                transitions += 1;
            }
            previous = next;
        }
        prop_assert_eq!(runs.get(), 1 + transitions);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Sequential IDs in insertion order
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn ids_sequential_and_ordered(n in 0usize..32) {
        let store = Store::new();
        let ids: Vec<RecordId> = (0..n)
            .map(|i| store.insert_record(Fields::new().with("id", i as i64)))
            .collect();
        let records = store.records();
        prop_assert_eq!(records.len(), n);
        for (i, record) in records.iter().enumerate() {
            prop_assert_eq!(record.id(), RecordId::new(i as u64));
            prop_assert_eq!(record.id(), ids[i]);
            prop_assert_eq!(record.get("id"), Value::Int(i as i64));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Patches are local to one record
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn patch_touches_only_target(
        n in 1usize..10,
        target_seed in any::<usize>(),
        name in "[a-z]{1,8}",
    ) {
        let store = Store::new();
        for i in 0..n {
            store.insert_record(Fields::new().with("id", i as i64));
        }
        let target = RecordId::new((target_seed % n) as u64);
        let before = store.records();

        store.update_record(target, Fields::new().with("name", name.as_str())).unwrap();

        for (old, new) in before.iter().zip(store.records()) {
            if new.id() == target {
                prop_assert_eq!(new.get("name"), Value::from(name.as_str()));
                prop_assert_eq!(new.get("id"), old.get("id"));
            } else {
                prop_assert_eq!(old, &new);
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Session and record-set dependencies are disjoint
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn session_writes_skip_record_readers(values in proptest::collection::vec(0i64..8, 1..32)) {
        let store = Store::new();
        store.insert_record(Fields::new());
        let list_runs = count_runs(&store, |s| { let _ = s.records(); });
        for v in values {
            store.set("currentItem", RecordId::new(v as u64));
        }
        prop_assert_eq!(list_runs.get(), 1);
    }

    #[test]
    fn record_writes_skip_session_readers(names in proptest::collection::vec("[a-z]{1,4}", 1..16)) {
        let store = Store::new();
        let id = store.insert_record(Fields::new());
        let selection_runs = count_runs(&store, |s| { let _ = s.get("currentItem"); });
        for name in names {
            store.update_record(id, Fields::new().with("name", name)).unwrap();
        }
        prop_assert_eq!(selection_runs.get(), 1);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Unknown IDs are inert
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn unknown_id_is_inert(n in 0usize..8, offset in 0u64..100) {
        let store = Store::new();
        for i in 0..n {
            store.insert_record(Fields::new().with("id", i as i64));
        }
        let runs = count_runs(&store, |s| { let _ = s.records(); });
        let before = store.records();

        let ghost = RecordId::new(n as u64 + offset);
        prop_assert!(store.update_record(ghost, Fields::new().with("name", "ghost")).is_err());
        prop_assert_eq!(store.records(), before);
        prop_assert_eq!(runs.get(), 1);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Registration order
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn notification_order_is_registration_order(
        readers in 2usize..6,
        writes in proptest::collection::vec((0usize..3, 0i64..5), 1..24),
    ) {
        let store = Store::new();
        let keys = ["a", "b", "c"];
        let log = Rc::new(RefCell::new(Vec::new()));
        for r in 0..readers {
            let log = Rc::clone(&log);
            store.autorun(format!("reader{r}"), move |s| {
                for key in keys {
                    let _ = s.get(key);
                }
                log.borrow_mut().push(r);
            });
        }
        for (key, v) in writes {
            log.borrow_mut().clear();
            if store.set(keys[key], v) {
                let expected: Vec<usize> = (0..readers).collect();
                prop_assert_eq!(&*log.borrow(), &expected);
            } else {
                prop_assert!(log.borrow().is_empty());
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 7. One re-run per batch, however many read keys changed
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn batched_writes_rerun_reader_at_most_once(
        batches in proptest::collection::vec(
            proptest::collection::vec((0usize..3, 0i64..3), 1..6),
            1..12,
        ),
    ) {
        let store = Store::new();
        let keys = ["a", "b", "c"];
        let runs = count_runs(&store, move |s| {
            for key in keys {
                let _ = s.get(key);
            }
        });

        for writes in batches {
            let before_values: Vec<Value> = keys.iter().map(|k| store.peek(k)).collect();
            let before_runs = runs.get();
            store.batch(|| {
                for (key, v) in &writes {
                    store.set(keys[*key], *v);
                }
            });
            let after_values: Vec<Value> = keys.iter().map(|k| store.peek(k)).collect();
            // A key set and then set back still counts as changed.
            let touched = writes.iter().any(|(key, v)| before_values[*key] != Value::Int(*v));
            let expected = u32::from(touched);
            prop_assert_eq!(runs.get() - before_runs, expected);
            if after_values != before_values {
                prop_assert_eq!(runs.get() - before_runs, 1);
            }
        }
    }
}
