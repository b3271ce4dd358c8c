#![forbid(unsafe_code)]

//! The modal stack engine.
//!
//! [`ModalEngine`] owns one session's stack snapshot, renderer registry,
//! observers, and deferred-command queue. It is a cheap `Rc` handle: clone it
//! into whatever needs to open or close modals instead of reaching for global
//! state.
//!
//! # Invariants
//!
//! 1. Each mutation reads the current snapshot, computes the next one, and
//!    installs it in one step. Observers only ever see whole snapshots.
//! 2. Mutations requested while the engine is rendering or notifying are
//!    queued, never applied mid-flight.
//! 3. `version` increments exactly once per installed snapshot. No-ops and
//!    errors do not bump it and do not notify.
//! 4. Registration never reads or writes the stack.
//! 5. Deferred-work observers fire when the queue goes from empty to
//!    non-empty, so a host driven only by callbacks knows to call
//!    `run_deferred()`.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Duplicate name | push/relay/replace of an open name | `Err(ModalError::Duplicate)`, stack unchanged |
//! | Stale pop | name not on top | `Dispatch::Applied(Outcome::Noop)` |
//! | Unregistered top | no renderer for the top name | `render()` returns `None` |
//! | Deferred error | queued command fails later | returned by `run_deferred()` and logged |

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use arc_swap::ArcSwap;
use modstack_core::{
    DataMap, IdSource, ModalError, ModalId, ModalStack, Outcome, SequentialIds, StackEntry,
    Transition,
};
use tracing::{debug, trace, warn};

use crate::command::{Dispatch, ModalCommand};
use crate::config::EngineConfig;
use crate::control::ModalControl;
use crate::reader::SnapshotReader;
use crate::registry::{RenderFn, RendererRegistry};
use crate::subscription::{Subscribers, Subscription};

/// Output of [`ModalEngine::render`] for the top modal.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered<R> {
    /// Render key. Hosts should remount when it changes.
    pub key: ModalId,
    /// Name of the rendered modal.
    pub name: String,
    /// Whatever the render callback produced.
    pub output: R,
}

pub(crate) struct EngineInner<R> {
    config: EngineConfig,
    ids: Box<dyn IdSource>,
    current: Arc<ArcSwap<ModalStack>>,
    version: Cell<u64>,
    registry: RefCell<RendererRegistry<R>>,
    subscribers: Subscribers,
    pending: Subscribers,
    deferred: RefCell<VecDeque<ModalCommand>>,
    busy: Cell<u32>,
}

/// Handle to one session's modal stack.
pub struct ModalEngine<R> {
    inner: Rc<EngineInner<R>>,
}

impl<R> Clone for ModalEngine<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<R> std::fmt::Debug for ModalEngine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModalEngine")
            .field("config", &self.inner.config)
            .field("stack", &self.inner.current.load().names())
            .field("version", &self.inner.version.get())
            .field("deferred", &self.inner.deferred.borrow().len())
            .finish()
    }
}

/// Non-owning engine handle held by [`ModalControl`].
pub struct WeakEngine<R> {
    inner: Weak<EngineInner<R>>,
}

impl<R> Clone for WeakEngine<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<R> WeakEngine<R> {
    /// The engine, if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<ModalEngine<R>> {
        self.inner.upgrade().map(|inner| ModalEngine { inner })
    }
}

/// Marks the engine busy (rendering or notifying) for its lifetime.
struct BusyGuard<'a> {
    busy: &'a Cell<u32>,
}

impl<'a> BusyGuard<'a> {
    fn new(busy: &'a Cell<u32>) -> Self {
        busy.set(busy.get() + 1);
        Self { busy }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.busy.set(self.busy.get() - 1);
    }
}

impl<R: 'static> Default for ModalEngine<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: 'static> ModalEngine<R> {
    /// Create an engine with default configuration and sequential ids.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with the given configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_parts(config, SequentialIds::new())
    }

    /// Create an engine with the given configuration and identity source.
    #[must_use]
    pub fn with_parts(config: EngineConfig, ids: impl IdSource + 'static) -> Self {
        debug!(chain_policy = %config.chain_policy, "modal engine created");
        Self {
            inner: Rc::new(EngineInner {
                config,
                ids: Box::new(ids),
                current: Arc::new(ArcSwap::from_pointee(ModalStack::new())),
                version: Cell::new(0),
                registry: RefCell::new(RendererRegistry::new()),
                subscribers: Subscribers::default(),
                pending: Subscribers::default(),
                deferred: RefCell::new(VecDeque::new()),
                busy: Cell::new(0),
            }),
        }
    }

    /// The engine's configuration.
    #[must_use]
    pub fn config(&self) -> EngineConfig {
        self.inner.config
    }

    /// A non-owning handle.
    #[must_use]
    pub fn downgrade(&self) -> WeakEngine<R> {
        WeakEngine {
            inner: Rc::downgrade(&self.inner),
        }
    }

    // --- Stack Operations ---

    /// Open a modal on top of the stack.
    ///
    /// Fails with [`ModalError::Duplicate`] if `name` is already open.
    pub fn push(
        &self,
        name: impl Into<String>,
        data: Option<DataMap>,
    ) -> Result<Dispatch, ModalError> {
        self.dispatch(ModalCommand::Push {
            name: name.into(),
            data,
            relay: false,
        })
    }

    /// Open a modal that continues the current one's transaction.
    ///
    /// Fails with [`ModalError::Duplicate`] if `name` is already open.
    pub fn relay(
        &self,
        name: impl Into<String>,
        data: Option<DataMap>,
    ) -> Result<Dispatch, ModalError> {
        self.dispatch(ModalCommand::Push {
            name: name.into(),
            data,
            relay: true,
        })
    }

    /// Close the top modal, or the top relay transaction when `chain` is set.
    ///
    /// With `name`, nothing happens unless that modal is on top. A pop
    /// cannot fail; the `Result` matches [`dispatch`](Self::dispatch), which
    /// every mutation goes through.
    pub fn pop(&self, name: Option<&str>, chain: bool) -> Result<Dispatch, ModalError> {
        self.dispatch(ModalCommand::Pop {
            name: name.map(str::to_owned),
            chain,
        })
    }

    /// Replace the top relay transaction with a single new entry.
    ///
    /// No-op on an empty stack. Fails with [`ModalError::Duplicate`] if
    /// `name` is open below the replaced transaction.
    pub fn pop_then_push(
        &self,
        name: impl Into<String>,
        data: Option<DataMap>,
        relay: bool,
    ) -> Result<Dispatch, ModalError> {
        self.dispatch(ModalCommand::Replace {
            name: name.into(),
            data,
            relay,
        })
    }

    /// Merge `partial` into the top modal's data, giving it a fresh id.
    pub fn update(&self, partial: Option<DataMap>) -> Result<Dispatch, ModalError> {
        self.dispatch(ModalCommand::Update { partial })
    }

    /// Apply `command` now, or queue it if the engine is busy.
    ///
    /// Queueing into an empty queue wakes the
    /// [`subscribe_deferred`](Self::subscribe_deferred) observers.
    pub fn dispatch(&self, command: ModalCommand) -> Result<Dispatch, ModalError> {
        if self.inner.busy.get() > 0 {
            trace!(op = command.label(), "deferring re-entrant modal mutation");
            let was_empty = {
                let mut deferred = self.inner.deferred.borrow_mut();
                let was_empty = deferred.is_empty();
                deferred.push_back(command);
                was_empty
            };
            if was_empty {
                let current = self.inner.current.load_full();
                self.inner.pending.notify(&current);
            }
            return Ok(Dispatch::Deferred);
        }
        self.apply(command).map(Dispatch::Applied)
    }

    /// Apply every command queued before this call, in order.
    ///
    /// Commands queued while this runs (by observers) wait for the next call.
    /// Returns the errors produced by failing commands. Does nothing while the
    /// engine is busy.
    pub fn run_deferred(&self) -> Vec<ModalError> {
        if self.inner.busy.get() > 0 {
            return Vec::new();
        }
        let batch: Vec<ModalCommand> = self.inner.deferred.borrow_mut().drain(..).collect();
        let mut errors = Vec::new();
        for command in batch {
            let op = command.label();
            if let Err(err) = self.apply(command) {
                warn!(op, error = %err, "deferred modal mutation failed");
                errors.push(err);
            }
        }
        errors
    }

    /// Number of queued commands.
    #[must_use]
    pub fn deferred_len(&self) -> usize {
        self.inner.deferred.borrow().len()
    }

    fn apply(&self, command: ModalCommand) -> Result<Outcome, ModalError> {
        let inner = &self.inner;
        let op = command.label();
        let current = inner.current.load_full();
        let transition = command
            .apply(&current, inner.config.chain_policy, inner.ids.as_ref())
            .inspect_err(|err| debug!(op, error = %err, "modal transition rejected"))?;

        if transition.is_noop() {
            trace!(op, outcome = ?transition.outcome, "modal transition skipped");
            return Ok(transition.outcome);
        }

        let Transition { stack, outcome } = transition;
        inner.current.store(Arc::new(stack.clone()));
        let version = inner.version.get() + 1;
        inner.version.set(version);
        debug!(
            op,
            outcome = outcome.label(),
            depth = stack.depth(),
            top = ?stack.top().map(|e| e.name.as_str()),
            version,
            "modal stack updated"
        );
        if inner.config.trace_snapshots {
            trace!(snapshot = ?stack, "modal snapshot installed");
        }

        let _busy = BusyGuard::new(&inner.busy);
        inner.subscribers.notify(&stack);
        Ok(outcome)
    }

    // --- State Queries ---

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ModalStack {
        ModalStack::clone(&self.inner.current.load())
    }

    /// A thread-safe reader of future snapshots.
    #[must_use]
    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader::new(Arc::clone(&self.inner.current))
    }

    /// Number of installed snapshots since creation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// The top entry.
    #[must_use]
    pub fn top(&self) -> Option<StackEntry> {
        self.inner.current.load().top().cloned()
    }

    /// Number of open modals.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.inner.current.load().depth()
    }

    /// Whether any modal is open.
    #[must_use]
    pub fn any_open(&self) -> bool {
        !self.inner.current.load().is_empty()
    }

    /// Whether a modal with this name is open.
    #[must_use]
    pub fn is_open(&self, name: &str) -> bool {
        self.inner.current.load().is_open(name)
    }

    /// Whether the engine is inside a render callback or an observer.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.busy.get() > 0
    }

    // --- Registry ---

    /// Register the renderer for `name`.
    ///
    /// With `replace == false` an existing renderer is kept. Returns whether
    /// `render` was stored. Safe to call from inside a render callback.
    pub fn register(
        &self,
        name: impl Into<String>,
        render: impl Fn(&ModalControl<R>) -> R + 'static,
        replace: bool,
    ) -> bool {
        let render: RenderFn<R> = Rc::new(render);
        self.register_shared(name, render, replace)
    }

    /// Register an already shared renderer.
    pub fn register_shared(
        &self,
        name: impl Into<String>,
        render: RenderFn<R>,
        replace: bool,
    ) -> bool {
        let name = name.into();
        let stored = self
            .inner
            .registry
            .borrow_mut()
            .register(name.as_str(), render, replace);
        trace!(name = %name, replace, stored, "modal renderer registered");
        stored
    }

    /// Remove the renderer for `name`. The stack is untouched.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.inner.registry.borrow_mut().unregister(name);
        trace!(name, removed, "modal renderer unregistered");
        removed
    }

    /// Whether a renderer is registered for `name`, open or not.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.inner.registry.borrow().is_registered(name)
    }

    // --- Observers ---

    /// Call `callback` with every newly installed snapshot.
    ///
    /// Mutations requested from inside the callback are deferred.
    pub fn subscribe(&self, callback: impl Fn(&ModalStack) + 'static) -> Subscription {
        self.inner.subscribers.subscribe(callback)
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Call `callback` whenever deferred work appears in an empty queue.
    ///
    /// The callback receives the snapshot the queued command will apply to.
    /// Hosts use it to schedule a tick that calls
    /// [`run_deferred`](Self::run_deferred). It runs while the engine is
    /// busy, so mutations from inside it are deferred as well.
    pub fn subscribe_deferred(&self, callback: impl Fn(&ModalStack) + 'static) -> Subscription {
        self.inner.pending.subscribe(callback)
    }

    // --- Rendering ---

    /// Render the top modal with its registered callback.
    ///
    /// Returns `None` when the stack is empty or the top name has no
    /// renderer. Mutations requested by the callback are deferred.
    pub fn render(&self) -> Option<Rendered<R>> {
        let top = self.top()?;
        let Some(render) = self.inner.registry.borrow().get(&top.name) else {
            trace!(name = %top.name, "top modal has no renderer");
            return None;
        };
        let control = ModalControl::new(top.clone(), self.downgrade());
        let output = {
            let _busy = BusyGuard::new(&self.inner.busy);
            render(&control)
        };
        Some(Rendered {
            key: top.id,
            name: top.name,
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modstack_core::ChainPolicy;
    use serde_json::{Value, json};

    fn map(value: Value) -> DataMap {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn engine() -> ModalEngine<String> {
        ModalEngine::new()
    }

    #[test]
    fn starts_empty() {
        let engine = engine();
        assert!(!engine.any_open());
        assert_eq!(engine.depth(), 0);
        assert_eq!(engine.version(), 0);
        assert!(engine.render().is_none());
    }

    #[test]
    fn push_and_relay() {
        let engine = engine();
        assert!(engine.push("a", None).unwrap().changed());
        assert!(engine.relay("b", None).unwrap().changed());
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.names(), vec!["a", "b"]);
        assert!(snapshot.top().unwrap().relay);
        assert_eq!(engine.version(), 2);
    }

    #[test]
    fn duplicate_push_is_rejected() {
        let engine = engine();
        engine.push("a", None).unwrap();
        let err = engine.relay("a", None).unwrap_err();
        assert_eq!(err, ModalError::Duplicate { name: "a".into() });
        assert_eq!(engine.depth(), 1);
        assert_eq!(engine.version(), 1);
    }

    #[test]
    fn noop_does_not_bump_version_or_notify() {
        let engine = engine();
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        let _sub = engine.subscribe(move |_| c.set(c.get() + 1));

        engine.pop(None, false).unwrap();
        engine.pop_then_push("x", None, false).unwrap();
        engine.update(None).unwrap();
        assert_eq!(engine.version(), 0);
        assert_eq!(calls.get(), 0);

        engine.push("a", None).unwrap();
        engine.pop(Some("nonexistent-name"), true).unwrap();
        assert_eq!(engine.version(), 1);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn context_update_merges_into_top() {
        let engine = engine();
        engine.push("a", Some(map(json!({"x": 1})))).unwrap();
        let before = engine.top().unwrap().id;
        engine.update(Some(map(json!({"y": 2})))).unwrap();
        let top = engine.top().unwrap();
        assert_eq!(top.data, Some(map(json!({"x": 1, "y": 2}))));
        assert_ne!(top.id, before);
    }

    #[test]
    fn close_root_policy_from_config() {
        let engine: ModalEngine<String> =
            ModalEngine::with_config(EngineConfig::new().with_chain_policy(ChainPolicy::CloseRoot));
        engine.push("a", None).unwrap();
        engine.relay("b", None).unwrap();
        engine.pop(None, true).unwrap();
        assert!(!engine.any_open());
    }

    #[test]
    fn custom_id_source() {
        let engine: ModalEngine<String> =
            ModalEngine::with_parts(EngineConfig::default(), SequentialIds::starting_at(100));
        engine.push("a", None).unwrap();
        assert_eq!(engine.top().unwrap().id, ModalId::from_raw(100));
    }

    #[test]
    fn render_uses_top_renderer_only() {
        let engine = engine();
        engine.register("a", |m| format!("A:{}", m.name()), true);
        engine.register("b", |m| format!("B:{}", m.name()), true);
        engine.push("a", None).unwrap();
        engine.push("b", None).unwrap();

        let rendered = engine.render().unwrap();
        assert_eq!(rendered.output, "B:b");
        assert_eq!(rendered.name, "b");
        assert_eq!(Some(rendered.key), engine.top().map(|e| e.id));
    }

    #[test]
    fn render_without_renderer_is_none() {
        let engine = engine();
        engine.push("ghost", None).unwrap();
        assert!(engine.render().is_none());
        engine.register("ghost", |_| "boo".to_owned(), true);
        assert_eq!(engine.render().unwrap().output, "boo");
    }

    #[test]
    fn registration_survives_close() {
        let engine = engine();
        engine.register("a", |_| String::new(), true);
        engine.push("a", None).unwrap();
        engine.pop(Some("a"), false).unwrap();
        assert!(engine.is_registered("a"));
        assert!(!engine.is_open("a"));
        assert!(engine.unregister("a"));
        assert!(!engine.is_registered("a"));
    }

    #[test]
    fn render_key_is_stable_until_replaced() {
        let engine = engine();
        engine.register("a", |_| String::new(), true);
        engine.push("a", None).unwrap();
        let first = engine.render().unwrap().key;
        let again = engine.render().unwrap().key;
        assert_eq!(first, again);

        engine.update(None).unwrap();
        assert_ne!(engine.render().unwrap().key, first);
    }

    #[test]
    fn mutation_inside_render_is_deferred() {
        let engine = engine();
        engine.register(
            "a",
            |m| {
                let dispatch = m.submit().unwrap();
                assert!(dispatch.is_deferred());
                "rendered".to_owned()
            },
            true,
        );
        engine.push("a", None).unwrap();

        assert_eq!(engine.render().unwrap().output, "rendered");
        assert!(engine.is_open("a"));
        assert_eq!(engine.deferred_len(), 1);

        assert!(engine.run_deferred().is_empty());
        assert!(!engine.is_open("a"));
        assert_eq!(engine.deferred_len(), 0);
    }

    #[test]
    fn mutation_inside_subscriber_is_deferred() {
        let engine = engine();
        let handle = engine.clone();
        let _sub = engine.subscribe(move |stack| {
            if stack.is_open("a") && !stack.is_open("b") {
                let dispatch = handle.relay("b", None).unwrap();
                assert!(dispatch.is_deferred());
            }
        });

        engine.push("a", None).unwrap();
        assert_eq!(engine.snapshot().names(), vec!["a"]);
        engine.run_deferred();
        assert_eq!(engine.snapshot().names(), vec!["a", "b"]);
    }

    #[test]
    fn deferred_errors_are_returned() {
        let engine = engine();
        engine.register(
            "a",
            |m| {
                m.relay("a", None).unwrap();
                String::new()
            },
            true,
        );
        engine.push("a", None).unwrap();
        engine.render();
        let errors = engine.run_deferred();
        assert_eq!(errors, vec![ModalError::Duplicate { name: "a".into() }]);
        assert_eq!(engine.depth(), 1);
    }

    #[test]
    fn register_inside_render_applies_immediately() {
        let engine = engine();
        let handle = engine.clone();
        engine.register(
            "a",
            move |_| {
                handle.register("late", |_| String::new(), false);
                String::new()
            },
            true,
        );
        engine.push("a", None).unwrap();
        engine.render();
        assert!(engine.is_registered("late"));
        assert!(!engine.is_busy());
    }

    #[test]
    fn deferred_observer_fires_once_per_batch() {
        let engine = engine();
        let wakes = Rc::new(Cell::new(0));
        let w = Rc::clone(&wakes);
        let _wake = engine.subscribe_deferred(move |_| w.set(w.get() + 1));
        engine.register(
            "a",
            |m| {
                m.update(None).unwrap();
                m.relay("b", None).unwrap();
                String::new()
            },
            true,
        );
        engine.register(
            "b",
            |m| {
                m.cancel().unwrap();
                String::new()
            },
            true,
        );
        engine.push("a", None).unwrap();
        assert_eq!(wakes.get(), 0);

        engine.render();
        assert_eq!(engine.deferred_len(), 2);
        assert_eq!(wakes.get(), 1);

        assert!(engine.run_deferred().is_empty());
        assert_eq!(engine.snapshot().names(), vec!["a", "b"]);
        assert_eq!(wakes.get(), 1);

        engine.render();
        assert_eq!(wakes.get(), 2);
    }

    #[test]
    fn dispatch_command_directly() {
        let engine = engine();
        engine
            .dispatch(ModalCommand::Push {
                name: "a".into(),
                data: None,
                relay: false,
            })
            .unwrap();
        let dispatch = engine
            .dispatch(ModalCommand::Pop {
                name: Some("a".into()),
                chain: true,
            })
            .unwrap();
        assert!(matches!(
            dispatch.outcome(),
            Some(Outcome::Popped { removed }) if removed.len() == 1
        ));
    }
}
