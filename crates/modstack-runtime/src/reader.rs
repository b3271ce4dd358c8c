#![forbid(unsafe_code)]

//! Lock-free, thread-safe view of the latest installed snapshot.

use std::sync::Arc;

use arc_swap::ArcSwap;
use modstack_core::{ModalStack, StackEntry};

/// Read-only handle to an engine's current snapshot.
///
/// The engine itself is single-threaded; a `SnapshotReader` is `Send + Sync`
/// and may be handed to a render or diagnostics thread. Each `load` returns
/// whichever snapshot was installed last.
#[derive(Clone)]
pub struct SnapshotReader {
    current: Arc<ArcSwap<ModalStack>>,
}

impl SnapshotReader {
    pub(crate) fn new(current: Arc<ArcSwap<ModalStack>>) -> Self {
        Self { current }
    }

    /// The latest snapshot.
    #[must_use]
    pub fn load(&self) -> Arc<ModalStack> {
        self.current.load_full()
    }

    /// The top entry of the latest snapshot.
    #[must_use]
    pub fn top(&self) -> Option<StackEntry> {
        self.current.load().top().cloned()
    }

    /// Depth of the latest snapshot.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.current.load().depth()
    }

    /// Whether `name` is open in the latest snapshot.
    #[must_use]
    pub fn is_open(&self, name: &str) -> bool {
        self.current.load().is_open(name)
    }
}

impl std::fmt::Debug for SnapshotReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotReader")
            .field("depth", &self.depth())
            .finish()
    }
}
