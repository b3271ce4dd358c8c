#![forbid(unsafe_code)]

//! Core data model and transition algorithm for modstack.
//!
//! A modal stack is an ordered list of named [`StackEntry`] values. Only the
//! top entry is ever rendered; entries beneath it are inert. Every mutation
//! is a pure function from one immutable [`ModalStack`] snapshot to the next,
//! described by a [`Transition`].
//!
//! # Invariants
//!
//! 1. **Uniqueness**: no two entries in a snapshot share a name.
//! 2. **Top-only render**: only [`ModalStack::top`] is presented to a renderer.
//! 3. **Relay contiguity**: the maximal run of relay entries at the top is one
//!    transaction; chained pops and replaces remove it as a unit.
//!
//! # Failure Modes
//!
//! | Operation | Condition | Result |
//! |-----------|-----------|--------|
//! | push / relay | name already open | [`ModalError::Duplicate`] |
//! | replace | name open below the transaction base | [`ModalError::Duplicate`] |
//! | pop | empty stack or stale name | [`Outcome::Noop`] |
//! | replace / update | empty stack | [`Outcome::Noop`] |

pub mod entry;
pub mod error;
pub mod id;
pub mod policy;
pub mod stack;

pub use entry::{DataMap, StackEntry, merge_data};
pub use error::ModalError;
pub use id::{IdSource, ModalId, RandomIds, SequentialIds};
pub use policy::{ChainPolicy, ParsePolicyError};
pub use stack::{ModalStack, NoopReason, Outcome, Transition};
