#![forbid(unsafe_code)]

//! Render-key identities for opened modal instances.
//!
//! A [`ModalId`] is stamped on every entry at push time and again whenever the
//! entry is replaced. Hosts use it as the render key, so a changed id means
//! "mount a fresh instance".

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for one opened modal instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ModalId(u64);

impl ModalId {
    /// Wrap a raw id value.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw id value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Source of fresh modal identities.
///
/// Each call must return an id not returned before by the same source.
/// No cryptographic strength is required.
pub trait IdSource {
    /// Produce a fresh id.
    fn next_id(&self) -> ModalId;
}

/// Monotonic counter ids. Deterministic, which makes it the default.
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    /// Counter starting at 1.
    #[must_use]
    pub const fn new() -> Self {
        Self::starting_at(1)
    }

    /// Counter starting at `first`.
    #[must_use]
    pub const fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSource for SequentialIds {
    fn next_id(&self) -> ModalId {
        ModalId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Randomly seeded ids.
///
/// A per-instance random hasher scrambles a counter, so ids are not
/// predictable across sessions. Uniqueness is probabilistic (64-bit).
pub struct RandomIds {
    state: ahash::RandomState,
    counter: AtomicU64,
}

impl RandomIds {
    /// Create a source with a fresh random seed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ahash::RandomState::new(),
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for RandomIds {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RandomIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomIds")
            .field("issued", &self.counter.load(Ordering::Relaxed))
            .finish()
    }
}

impl IdSource for RandomIds {
    fn next_id(&self) -> ModalId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        ModalId(self.state.hash_one(n))
    }
}

impl<S: IdSource + ?Sized> IdSource for &S {
    fn next_id(&self) -> ModalId {
        (**self).next_id()
    }
}

impl<S: IdSource + ?Sized> IdSource for Box<S> {
    fn next_id(&self) -> ModalId {
        (**self).next_id()
    }
}
