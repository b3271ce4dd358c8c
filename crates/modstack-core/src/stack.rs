#![forbid(unsafe_code)]

//! Immutable stack snapshots and the transition algorithm.
//!
//! A [`ModalStack`] never changes in place. Each operation reads one snapshot
//! and returns a [`Transition`] holding the next snapshot plus an [`Outcome`]
//! describing what happened. Callers install the new snapshot in one step, so
//! there is no observable intermediate state.
//!
//! # Transaction base
//!
//! Chained pops and replaces remove everything from the *transaction base* to
//! the top. Without chaining the base is the top itself. With chaining it
//! walks down through relay entries as directed by [`ChainPolicy`].
//!
//! # Example
//!
//! ```
//! use modstack_core::{ChainPolicy, ModalStack, SequentialIds};
//!
//! let ids = SequentialIds::new();
//! let stack = ModalStack::new();
//! let stack = stack.push("settings", None, false, &ids).unwrap().stack;
//! let stack = stack.push("confirm", None, true, &ids).unwrap().stack;
//!
//! // Cancel only closes the top.
//! let cancelled = stack.pop(Some("confirm"), false, ChainPolicy::KeepRoot);
//! assert_eq!(cancelled.stack.names(), vec!["settings"]);
//!
//! // A stale name is ignored.
//! let stale = stack.pop(Some("settings"), false, ChainPolicy::KeepRoot);
//! assert!(stale.is_noop());
//! ```

use std::sync::Arc;

use crate::entry::{DataMap, StackEntry, merge_data};
use crate::error::ModalError;
use crate::id::{IdSource, ModalId};
use crate::policy::ChainPolicy;

/// Immutable, cheaply clonable snapshot of the modal stack.
///
/// Index 0 is the bottom; the last entry is the top.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ModalStack {
    entries: Arc<[StackEntry]>,
}

impl Default for ModalStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ModalStack {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<StackEntry>::deserialize(deserializer)?;
        Self::from_entries(entries).map_err(serde::de::Error::custom)
    }
}

/// Why an operation left the stack untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoopReason {
    /// Nothing to pop or replace.
    EmptyStack,
    /// A pop named a modal that is no longer on top.
    NameMismatch {
        /// Name given by the caller.
        requested: String,
        /// Name actually on top.
        top: String,
    },
}

/// What a transition did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A new entry was appended.
    Pushed {
        /// Id of the new top.
        id: ModalId,
    },
    /// Entries were removed from the top.
    Popped {
        /// Removed entries, top first.
        removed: Vec<StackEntry>,
    },
    /// A transaction was swapped for a single new entry.
    Replaced {
        /// Removed entries, top first.
        removed: Vec<StackEntry>,
        /// Id of the new top.
        id: ModalId,
    },
    /// Nothing changed.
    Noop(NoopReason),
}

impl Outcome {
    /// Whether the stack was left untouched.
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::Noop(_))
    }

    /// Short label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pushed { .. } => "pushed",
            Self::Popped { .. } => "popped",
            Self::Replaced { .. } => "replaced",
            Self::Noop(_) => "noop",
        }
    }
}

/// Result of applying one operation to a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// The next snapshot. Equal to the input when the outcome is a no-op.
    pub stack: ModalStack,
    /// What happened.
    pub outcome: Outcome,
}

impl Transition {
    /// Whether the stack was left untouched.
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.outcome.is_noop()
    }

    fn noop(stack: &ModalStack, reason: NoopReason) -> Self {
        Self {
            stack: stack.clone(),
            outcome: Outcome::Noop(reason),
        }
    }
}

impl ModalStack {
    /// Create an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::from(Vec::new()),
        }
    }

    /// Build a stack from explicit entries, bottom first.
    ///
    /// Fails if two entries share a name.
    pub fn from_entries(entries: Vec<StackEntry>) -> Result<Self, ModalError> {
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|e| e.name == entry.name) {
                return Err(ModalError::Duplicate {
                    name: entry.name.clone(),
                });
            }
        }
        Ok(Self {
            entries: Arc::from(entries),
        })
    }

    // --- State Queries ---

    /// All entries, bottom first.
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[StackEntry] {
        &self.entries
    }

    /// Number of open modals.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Whether no modal is open.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The top entry, the only one that is rendered.
    #[inline]
    #[must_use]
    pub fn top(&self) -> Option<&StackEntry> {
        self.entries.last()
    }

    /// Iterate entries bottom to top.
    pub fn iter(&self) -> std::slice::Iter<'_, StackEntry> {
        self.entries.iter()
    }

    /// Whether an entry with this name is open. O(depth).
    #[must_use]
    pub fn is_open(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// Index of the entry with this name.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    /// Entry names, bottom first.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Lowest index removed by a pop or replace, or `None` when empty.
    ///
    /// Without `chain` this is the top index. With `chain`, see
    /// [`ChainPolicy`].
    #[must_use]
    pub fn transaction_base(&self, chain: bool, policy: ChainPolicy) -> Option<usize> {
        let top = self.entries.len().checked_sub(1)?;
        if !chain {
            return Some(top);
        }
        let base = match policy {
            ChainPolicy::KeepRoot => {
                let mut i = top;
                if self.entries[top].relay {
                    while i > 0 && self.entries[i - 1].relay {
                        i -= 1;
                    }
                }
                i
            }
            ChainPolicy::CloseRoot => {
                let mut i = top;
                while i > 0 && self.entries[i].relay {
                    i -= 1;
                }
                i
            }
        };
        Some(base)
    }

    // --- Transitions ---

    /// Append a new entry.
    ///
    /// Fails with [`ModalError::Duplicate`] if `name` is already open.
    pub fn push<I: IdSource + ?Sized>(
        &self,
        name: impl Into<String>,
        data: Option<DataMap>,
        relay: bool,
        ids: &I,
    ) -> Result<Transition, ModalError> {
        let name = name.into();
        #[cfg(feature = "tracing")]
        let _span = tracing::trace_span!("modal_push", name = %name, relay).entered();

        if self.is_open(&name) {
            return Err(ModalError::Duplicate { name });
        }
        let id = ids.next_id();
        let mut next = Vec::with_capacity(self.entries.len() + 1);
        next.extend_from_slice(&self.entries);
        next.push(StackEntry::new(id, name, data, relay));
        Ok(Transition {
            stack: Self {
                entries: Arc::from(next),
            },
            outcome: Outcome::Pushed { id },
        })
    }

    /// Remove the top entry, or the top transaction when `chain` is set.
    ///
    /// With `name`, the pop only happens if that modal is currently on top;
    /// otherwise it is a no-op. This guards against stale callbacks closing
    /// whatever happens to be on top now.
    #[must_use]
    pub fn pop(&self, name: Option<&str>, chain: bool, policy: ChainPolicy) -> Transition {
        #[cfg(feature = "tracing")]
        let _span = tracing::trace_span!("modal_pop", name = ?name, chain).entered();

        let Some(top) = self.top() else {
            return Transition::noop(self, NoopReason::EmptyStack);
        };
        if let Some(requested) = name
            && requested != top.name
        {
            return Transition::noop(
                self,
                NoopReason::NameMismatch {
                    requested: requested.to_owned(),
                    top: top.name.clone(),
                },
            );
        }
        let base = self.transaction_base(chain, policy).unwrap_or(0);
        let (kept, removed) = self.split_at(base);
        Transition {
            stack: kept,
            outcome: Outcome::Popped { removed },
        }
    }

    /// Swap the top transaction for one new entry.
    ///
    /// The walk always chains, so a whole relay run collapses into the new
    /// entry. No-op on an empty stack. Fails with [`ModalError::Duplicate`] if
    /// `name` is open below the transaction base.
    pub fn replace<I: IdSource + ?Sized>(
        &self,
        name: impl Into<String>,
        data: Option<DataMap>,
        relay: bool,
        policy: ChainPolicy,
        ids: &I,
    ) -> Result<Transition, ModalError> {
        let name = name.into();
        #[cfg(feature = "tracing")]
        let _span = tracing::trace_span!("modal_replace", name = %name, relay).entered();

        let Some(base) = self.transaction_base(true, policy) else {
            return Ok(Transition::noop(self, NoopReason::EmptyStack));
        };
        if self.entries[..base].iter().any(|e| e.name == name) {
            return Err(ModalError::Duplicate { name });
        }
        let id = ids.next_id();
        let mut next = Vec::with_capacity(base + 1);
        next.extend_from_slice(&self.entries[..base]);
        next.push(StackEntry::new(id, name, data, relay));
        Ok(Transition {
            stack: Self {
                entries: Arc::from(next),
            },
            outcome: Outcome::Replaced {
                removed: self.removed_from(base),
                id,
            },
        })
    }

    /// Merge `partial` into the top entry's data and re-stamp its identity.
    ///
    /// Keeps the top's name and relay flag. No-op on an empty stack.
    pub fn update<I: IdSource + ?Sized>(
        &self,
        partial: Option<DataMap>,
        policy: ChainPolicy,
        ids: &I,
    ) -> Result<Transition, ModalError> {
        let Some(top) = self.top() else {
            return Ok(Transition::noop(self, NoopReason::EmptyStack));
        };
        let data = merge_data(top.data.as_ref(), partial);
        self.replace(top.name.clone(), data, top.relay, policy, ids)
    }

    fn split_at(&self, base: usize) -> (Self, Vec<StackEntry>) {
        let kept = Self {
            entries: Arc::from(&self.entries[..base]),
        };
        (kept, self.removed_from(base))
    }

    fn removed_from(&self, base: usize) -> Vec<StackEntry> {
        self.entries[base..].iter().rev().cloned().collect()
    }
}

impl<'a> IntoIterator for &'a ModalStack {
    type Item = &'a StackEntry;
    type IntoIter = std::slice::Iter<'a, StackEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
