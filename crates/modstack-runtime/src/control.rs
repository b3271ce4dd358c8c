#![forbid(unsafe_code)]

//! The control object handed to the active modal's renderer.
//!
//! A [`ModalControl`] captures the top entry as it was when rendering began
//! and binds the five modal actions to it. Controls are cheap to clone, so a
//! renderer can move them into event handlers that fire long after the render
//! returned.
//!
//! | Action | Effect |
//! |--------|--------|
//! | `submit` | pop this modal, chaining through relays |
//! | `cancel` | pop this modal only |
//! | `update` | merge data into this modal, new render key |
//! | `relay` | open a dependent modal on top |
//! | `replace` | swap this relay transaction for another modal |

use modstack_core::{DataMap, ModalError, ModalId, StackEntry, merge_data};
use serde_json::Value;

use crate::command::Dispatch;
use crate::engine::{ModalEngine, WeakEngine};

/// Render object for the top modal.
pub struct ModalControl<R> {
    entry: StackEntry,
    engine: WeakEngine<R>,
}

impl<R> Clone for ModalControl<R> {
    fn clone(&self) -> Self {
        Self {
            entry: self.entry.clone(),
            engine: self.engine.clone(),
        }
    }
}

impl<R> std::fmt::Debug for ModalControl<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModalControl")
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}

impl<R: 'static> ModalControl<R> {
    pub(crate) fn new(entry: StackEntry, engine: WeakEngine<R>) -> Self {
        Self { entry, engine }
    }

    /// Name of this modal.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.entry.name
    }

    /// Data this modal was rendered with.
    #[must_use]
    pub fn data(&self) -> Option<&DataMap> {
        self.entry.data.as_ref()
    }

    /// One data value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entry.get(key)
    }

    /// Render key of this instance.
    #[must_use]
    pub fn id(&self) -> ModalId {
        self.entry.id
    }

    /// Whether this modal was opened by a relay.
    #[must_use]
    pub fn is_relay(&self) -> bool {
        self.entry.relay
    }

    /// The captured entry.
    #[must_use]
    pub fn entry(&self) -> &StackEntry {
        &self.entry
    }

    /// Whether this instance is still the engine's top entry.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.engine
            .upgrade()
            .and_then(|engine| engine.top())
            .is_some_and(|top| top.id == self.entry.id)
    }

    /// Close this modal and everything that relayed into it.
    pub fn submit(&self) -> Result<Dispatch, ModalError> {
        self.with_engine(|engine| engine.pop(Some(self.entry.name.as_str()), true))
    }

    /// Close only this modal.
    pub fn cancel(&self) -> Result<Dispatch, ModalError> {
        self.with_engine(|engine| engine.pop(Some(self.entry.name.as_str()), false))
    }

    /// Merge `partial` over this modal's data and remount it.
    pub fn update(&self, partial: Option<DataMap>) -> Result<Dispatch, ModalError> {
        let data = merge_data(self.entry.data.as_ref(), partial);
        self.with_engine(|engine| {
            engine.pop_then_push(self.entry.name.as_str(), data, self.entry.relay)
        })
    }

    /// Open `name` on top, relaying control from this modal.
    pub fn relay(
        &self,
        name: impl Into<String>,
        data: Option<DataMap>,
    ) -> Result<Dispatch, ModalError> {
        self.with_engine(|engine| engine.relay(name, data))
    }

    /// Swap this modal's relay transaction for `name`, inheriting this
    /// modal's relay flag.
    pub fn replace(
        &self,
        name: impl Into<String>,
        data: Option<DataMap>,
    ) -> Result<Dispatch, ModalError> {
        self.with_engine(|engine| engine.pop_then_push(name, data, self.entry.relay))
    }

    fn with_engine(
        &self,
        f: impl FnOnce(&ModalEngine<R>) -> Result<Dispatch, ModalError>,
    ) -> Result<Dispatch, ModalError> {
        match self.engine.upgrade() {
            Some(engine) => f(&engine),
            None => Ok(Dispatch::Detached),
        }
    }
}
