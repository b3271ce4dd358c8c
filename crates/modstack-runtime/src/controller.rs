#![forbid(unsafe_code)]

//! Declarative renderer registration for one modal name.
//!
//! A [`ModalController`] is what a host component keeps next to its render
//! code. It registers the renderer when mounted, re-registers only when the
//! renderer's inputs change, closes its modal when the host navigates away,
//! and unregisters on unmount.
//!
//! # Invariants
//!
//! 1. `sync` touches the registry only when the dependency hash differs
//!    from the last one seen (or nothing has been registered yet).
//! 2. `navigate` never closes anything on the first location it sees.
//! 3. The controller never pushes; it only registers and cancels.

use std::hash::Hash;

use ahash::RandomState;
use modstack_core::ModalError;
use tracing::trace;

use crate::command::Dispatch;
use crate::control::ModalControl;
use crate::engine::ModalEngine;

/// Registration lifecycle helper for a single modal name.
#[derive(Debug, Clone)]
pub struct ModalController {
    name: String,
    hasher: RandomState,
    deps: Option<u64>,
    location: Option<String>,
}

impl ModalController {
    /// Controller for `name`. Nothing is registered until [`mount`](Self::mount)
    /// or [`sync`](Self::sync).
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hasher: RandomState::new(),
            deps: None,
            location: None,
        }
    }

    /// The modal name this controller manages.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register `render`, replacing any existing renderer for this name.
    pub fn mount<R: 'static>(
        &mut self,
        engine: &ModalEngine<R>,
        render: impl Fn(&ModalControl<R>) -> R + 'static,
    ) {
        engine.register(self.name.as_str(), render, true);
    }

    /// Re-register `render` when `deps` hashes differently from the last
    /// call. Returns whether the registry was updated.
    pub fn sync<R: 'static, D: Hash + ?Sized>(
        &mut self,
        engine: &ModalEngine<R>,
        deps: &D,
        render: impl Fn(&ModalControl<R>) -> R + 'static,
    ) -> bool {
        let hash = self.hasher.hash_one(deps);
        if self.deps == Some(hash) && engine.is_registered(&self.name) {
            return false;
        }
        trace!(name = %self.name, "modal renderer dependencies changed");
        self.deps = Some(hash);
        engine.register(self.name.as_str(), render, true);
        true
    }

    /// Record the host's current location, cancelling this modal when it
    /// changed since the last call.
    ///
    /// Returns `Ok(None)` when nothing was dispatched.
    pub fn navigate<R: 'static>(
        &mut self,
        engine: &ModalEngine<R>,
        location: &str,
    ) -> Result<Option<Dispatch>, ModalError> {
        let previous = self.location.replace(location.to_owned());
        match previous {
            Some(prev) if prev != location => {
                trace!(name = %self.name, from = %prev, to = location, "closing modal on navigation");
                engine.pop(Some(self.name.as_str()), false).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Remove this controller's renderer. Open entries stay on the stack.
    pub fn unmount<R: 'static>(&mut self, engine: &ModalEngine<R>) -> bool {
        self.deps = None;
        engine.unregister(&self.name)
    }
}
