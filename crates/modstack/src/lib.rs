#![forbid(unsafe_code)]

//! modstack public facade.
//!
//! Re-exports the data model and transitions from `modstack-core` and, with
//! the default `runtime` feature, the engine from `modstack-runtime`. Most
//! hosts only need the [`prelude`].
//!
//! ```
//! use modstack::prelude::*;
//!
//! let engine: ModalEngine<String> = ModalEngine::new();
//! engine.register("wizard", |m| format!("wizard#{}", m.id()), true);
//! engine.register("confirm", |m| format!("confirm for {}", m.name()), true);
//!
//! engine.push("wizard", None).unwrap();
//! engine.relay("confirm", None).unwrap();
//! assert_eq!(engine.render().unwrap().name, "confirm");
//!
//! engine.pop(Some("confirm"), true).unwrap();
//! assert!(engine.is_open("wizard"));
//! ```

pub use modstack_core as core;
pub use modstack_core::{
    ChainPolicy, DataMap, IdSource, ModalError, ModalId, ModalStack, NoopReason, Outcome,
    ParsePolicyError, RandomIds, SequentialIds, StackEntry, Transition, merge_data,
};

#[cfg(feature = "runtime")]
pub use modstack_runtime as runtime;
#[cfg(feature = "runtime")]
pub use modstack_runtime::{
    ConfigError, Dispatch, EngineConfig, ModalCommand, ModalControl, ModalController,
    ModalEngine, Rendered, SnapshotReader, Subscription,
};

/// Common imports.
pub mod prelude {
    pub use modstack_core::{ChainPolicy, DataMap, ModalError, ModalId, ModalStack, StackEntry};

    #[cfg(feature = "runtime")]
    pub use modstack_runtime::{
        Dispatch, EngineConfig, ModalControl, ModalController, ModalEngine, Subscription,
    };
}
