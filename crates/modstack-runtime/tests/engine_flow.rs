//! End-to-end flows through `ModalEngine`, driven the way a host would:
//! register renderers, open modals, render the top, act through the
//! `ModalControl`, then drain deferred mutations.
//!
//! # Invariants
//!
//! 1. **Uniqueness**: a rejected push leaves the stack and version unchanged.
//! 2. **Top-only render**: `render()` always reflects the last entry.
//! 3. **Relay transactions**: submit closes the relay run, cancel closes one.
//! 4. **Deferral**: actions taken inside a render apply on `run_deferred()`,
//!    and the host is woken when deferred work appears.
//!
//! Run: `cargo test -p modstack-runtime --test engine_flow`

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use modstack_core::{ChainPolicy, DataMap, ModalError, ModalStack, Outcome};
use modstack_runtime::{Dispatch, EngineConfig, ModalController, ModalEngine};
use serde_json::{Value, json};

// =============================================================================
// Test Utilities
// =============================================================================

fn map(value: Value) -> DataMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

/// Renderer action taken the next time the top modal renders.
#[derive(Debug, Clone)]
enum Action {
    Submit,
    Cancel,
    Relay(&'static str),
    Replace(&'static str),
    Update(Value),
}

type Script = Rc<RefCell<Vec<Action>>>;

/// Engine whose renderers perform the queued action, then describe the
/// modal as `name:data`.
fn scripted_engine(names: &[&'static str], policy: ChainPolicy) -> (ModalEngine<String>, Script) {
    let engine = ModalEngine::with_config(EngineConfig::new().with_chain_policy(policy));
    let script: Script = Rc::new(RefCell::new(Vec::new()));
    for &name in names {
        let script = Rc::clone(&script);
        engine.register(
            name,
            move |m| {
                let action = script.borrow_mut().pop();
                if let Some(action) = action {
                    let dispatch = match action {
                        Action::Submit => m.submit(),
                        Action::Cancel => m.cancel(),
                        Action::Relay(next) => m.relay(next, None),
                        Action::Replace(next) => m.replace(next, None),
                        Action::Update(partial) => m.update(Some(map(partial))),
                    };
                    assert!(dispatch.unwrap().is_deferred());
                }
                let data = m.data().map(|d| Value::Object(d.clone()).to_string());
                format!("{}:{}", m.name(), data.unwrap_or_default())
            },
            true,
        );
    }
    (engine, script)
}

/// Render once with `action`, then drain the queue.
fn act(engine: &ModalEngine<String>, script: &Script, action: Action) -> Vec<ModalError> {
    script.borrow_mut().push(action);
    engine.render().expect("top modal renders");
    engine.run_deferred()
}

fn names(engine: &ModalEngine<String>) -> Vec<String> {
    engine
        .snapshot()
        .names()
        .into_iter()
        .map(str::to_owned)
        .collect()
}

// =============================================================================
// Stack Semantics
// =============================================================================

#[test]
fn confirm_then_success_flow() {
    let (engine, script) =
        scripted_engine(&["form", "confirm", "success"], ChainPolicy::KeepRoot);
    engine.push("form", Some(map(json!({"step": 1})))).unwrap();

    assert!(act(&engine, &script, Action::Relay("confirm")).is_empty());
    assert_eq!(names(&engine), ["form", "confirm"]);

    assert!(act(&engine, &script, Action::Replace("success")).is_empty());
    assert_eq!(names(&engine), ["form", "success"]);
    assert!(engine.top().unwrap().relay);

    assert!(act(&engine, &script, Action::Submit).is_empty());
    assert_eq!(names(&engine), ["form"]);
    assert_eq!(engine.render().unwrap().output, r#"form:{"step":1}"#);
}

#[test]
fn submit_chains_and_cancel_does_not() {
    let (engine, script) = scripted_engine(&["a", "b", "c"], ChainPolicy::KeepRoot);
    engine.push("a", None).unwrap();
    engine.relay("b", None).unwrap();
    engine.relay("c", None).unwrap();

    act(&engine, &script, Action::Cancel);
    assert_eq!(names(&engine), ["a", "b"]);

    engine.relay("c", None).unwrap();
    act(&engine, &script, Action::Submit);
    assert_eq!(names(&engine), ["a"]);
}

#[test]
fn close_root_submit_closes_whole_transaction() {
    let (engine, script) = scripted_engine(&["a", "b", "c"], ChainPolicy::CloseRoot);
    engine.push("x", None).unwrap();
    engine.push("a", None).unwrap();
    engine.relay("b", None).unwrap();
    engine.relay("c", None).unwrap();

    act(&engine, &script, Action::Submit);
    assert_eq!(names(&engine), ["x"]);
}

#[test]
fn update_keeps_position_and_relay_flag() {
    let (engine, script) = scripted_engine(&["a", "b"], ChainPolicy::KeepRoot);
    engine.push("a", None).unwrap();
    engine.relay("b", Some(map(json!({"n": 1})))).unwrap();
    let before = engine.top().unwrap();

    assert!(act(&engine, &script, Action::Update(json!({"p": 2}))).is_empty());
    let after = engine.top().unwrap();
    assert_eq!(names(&engine), ["a", "b"]);
    assert!(after.relay);
    assert_ne!(after.id, before.id);
    assert_eq!(engine.render().unwrap().output, r#"b:{"n":1,"p":2}"#);
}

#[test]
fn duplicate_relay_from_render_is_reported_and_atomic() {
    let (engine, script) = scripted_engine(&["a", "b"], ChainPolicy::KeepRoot);
    engine.push("a", None).unwrap();
    engine.relay("b", None).unwrap();
    let version = engine.version();

    let errors = act(&engine, &script, Action::Relay("a"));
    assert_eq!(errors, vec![ModalError::Duplicate { name: "a".into() }]);
    assert_eq!(names(&engine), ["a", "b"]);
    assert_eq!(engine.version(), version);
}

#[test]
fn replace_into_open_name_below_is_rejected() {
    let (engine, script) = scripted_engine(&["a", "b"], ChainPolicy::KeepRoot);
    engine.push("a", None).unwrap();
    engine.push("b", None).unwrap();

    let errors = act(&engine, &script, Action::Replace("a"));
    assert_eq!(errors, vec![ModalError::Duplicate { name: "a".into() }]);
    assert_eq!(names(&engine), ["a", "b"]);
}

#[test]
fn stale_pops_are_noops() {
    let engine: ModalEngine<String> = ModalEngine::new();
    engine.push("a", None).unwrap();
    let dispatch = engine.pop(Some("nonexistent-name"), true).unwrap();
    assert!(matches!(dispatch, Dispatch::Applied(Outcome::Noop(_))));
    assert_eq!(engine.depth(), 1);

    let empty: ModalEngine<String> = ModalEngine::new();
    assert!(!empty.pop_then_push("x", None, false).unwrap().changed());
    assert!(!empty.any_open());
}

// =============================================================================
// Registration & Observers
// =============================================================================

#[test]
fn first_registration_wins_unless_replaced() {
    let engine: ModalEngine<&'static str> = ModalEngine::new();
    assert!(engine.register("x", |_| "fn1", false));
    assert!(!engine.register("x", |_| "fn2", false));
    engine.push("x", None).unwrap();
    assert_eq!(engine.render().unwrap().output, "fn1");

    assert!(engine.register("x", |_| "fn2", true));
    assert_eq!(engine.render().unwrap().output, "fn2");
}

#[test]
fn observers_see_each_snapshot_once() {
    let engine: ModalEngine<()> = ModalEngine::new();
    let seen: Rc<RefCell<Vec<Vec<String>>>> = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    let sub = engine.subscribe(move |stack: &ModalStack| {
        log.borrow_mut()
            .push(stack.names().into_iter().map(str::to_owned).collect());
    });

    engine.push("a", None).unwrap();
    engine.relay("b", None).unwrap();
    engine.pop(Some("zzz"), false).unwrap();
    engine.pop(None, true).unwrap();
    assert_eq!(
        *seen.borrow(),
        vec![
            vec!["a".to_owned()],
            vec!["a".to_owned(), "b".to_owned()],
            vec!["a".to_owned()],
        ]
    );

    drop(sub);
    engine.pop(None, false).unwrap();
    assert_eq!(seen.borrow().len(), 3);
    assert_eq!(engine.subscriber_count(), 0);
}

#[test]
fn callback_driven_host_applies_submit_from_render() {
    let engine: ModalEngine<()> = ModalEngine::new();
    engine.register(
        "a",
        |m| {
            m.submit().unwrap();
        },
        true,
    );

    // The host only redraws after a callback marks it dirty.
    let dirty = Rc::new(Cell::new(false));
    let on_change = Rc::clone(&dirty);
    let _changes = engine.subscribe(move |_| on_change.set(true));
    let on_deferred = Rc::clone(&dirty);
    let _wake = engine.subscribe_deferred(move |_| on_deferred.set(true));

    engine.push("a", None).unwrap();
    let mut frames = 0;
    while dirty.replace(false) {
        assert!(engine.run_deferred().is_empty());
        engine.render();
        frames += 1;
        assert!(frames < 8, "host loop did not settle");
    }

    assert!(!engine.is_open("a"));
    assert_eq!(engine.deferred_len(), 0);
    assert!(frames >= 2);
}

#[test]
fn reader_tracks_engine_from_another_thread() {
    let engine: ModalEngine<()> = ModalEngine::new();
    let reader = engine.reader();
    engine.push("a", None).unwrap();
    engine.relay("b", None).unwrap();

    let seen = std::thread::spawn(move || reader.top().map(|e| e.name))
        .join()
        .unwrap();
    assert_eq!(seen.as_deref(), Some("b"));
}

#[test]
fn controller_closes_modal_on_navigation() {
    let engine: ModalEngine<String> = ModalEngine::new();
    let mut controller = ModalController::new("drawer");
    controller.mount(&engine, |m| format!("drawer {}", m.id()));
    controller.navigate(&engine, "/inbox").unwrap();

    engine.push("drawer", None).unwrap();
    assert!(engine.render().is_some());

    controller.navigate(&engine, "/archive").unwrap();
    assert!(!engine.is_open("drawer"));
    assert!(engine.render().is_none());
}
