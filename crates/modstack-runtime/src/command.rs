#![forbid(unsafe_code)]

//! Stack mutations as values.
//!
//! Every engine mutation is expressed as a [`ModalCommand`]. Commands issued
//! while the engine is rendering or notifying are queued and applied later by
//! [`ModalEngine::run_deferred`](crate::ModalEngine::run_deferred); hosts with
//! a message loop can also construct and dispatch them directly.

use modstack_core::{ChainPolicy, DataMap, IdSource, ModalError, ModalStack, Outcome, Transition};

/// One stack mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum ModalCommand {
    /// Open a modal on top. `relay` marks a hand-off from the current top.
    Push {
        name: String,
        data: Option<DataMap>,
        relay: bool,
    },
    /// Close the top (or the top transaction when `chain` is set), guarded by
    /// `name` when given.
    Pop { name: Option<String>, chain: bool },
    /// Swap the top transaction for one new entry.
    Replace {
        name: String,
        data: Option<DataMap>,
        relay: bool,
    },
    /// Merge data into whatever is on top when the command is applied.
    Update { partial: Option<DataMap> },
}

impl ModalCommand {
    /// Short label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Push { relay: false, .. } => "push",
            Self::Push { relay: true, .. } => "relay",
            Self::Pop { chain: true, .. } => "submit",
            Self::Pop { chain: false, .. } => "cancel",
            Self::Replace { .. } => "replace",
            Self::Update { .. } => "update",
        }
    }

    /// Compute the transition this command produces from `stack`.
    pub fn apply<I: IdSource + ?Sized>(
        self,
        stack: &ModalStack,
        policy: ChainPolicy,
        ids: &I,
    ) -> Result<Transition, ModalError> {
        match self {
            Self::Push { name, data, relay } => stack.push(name, data, relay, ids),
            Self::Pop { name, chain } => Ok(stack.pop(name.as_deref(), chain, policy)),
            Self::Replace { name, data, relay } => stack.replace(name, data, relay, policy, ids),
            Self::Update { partial } => stack.update(partial, policy, ids),
        }
    }
}

/// How the engine handled a mutation request.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Applied immediately.
    Applied(Outcome),
    /// Queued because the engine was rendering or notifying. Applied by the
    /// next [`run_deferred`](crate::ModalEngine::run_deferred).
    Deferred,
    /// The engine was dropped; nothing happened.
    Detached,
}

impl Dispatch {
    /// Whether the mutation changed the stack right away.
    #[must_use]
    pub fn changed(&self) -> bool {
        matches!(self, Self::Applied(outcome) if !outcome.is_noop())
    }

    /// Whether the mutation was queued.
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred)
    }

    /// The outcome, when applied immediately.
    #[must_use]
    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            Self::Applied(outcome) => Some(outcome),
            Self::Deferred | Self::Detached => None,
        }
    }
}
