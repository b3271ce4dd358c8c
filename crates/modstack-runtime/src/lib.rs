#![forbid(unsafe_code)]

//! Modal stack engine for modstack.
//!
//! This crate wraps the pure transitions of [`modstack_core`] in a stateful,
//! single-threaded [`ModalEngine`]:
//! - a [`RendererRegistry`] mapping modal names to render callbacks
//! - [`Subscription`]-guarded observers notified with every new snapshot
//! - deferral of mutations requested while rendering or notifying, with a
//!   wake-up hook for hosts
//! - [`ModalControl`], the object handed to the top modal's renderer
//! - [`ModalController`], declarative registration with navigation cleanup
//! - [`SnapshotReader`], a lock-free view for other threads
//!
//! ```
//! use modstack_runtime::ModalEngine;
//!
//! let engine: ModalEngine<String> = ModalEngine::new();
//! engine.register("confirm", |m| format!("confirm {}", m.name()), true);
//! engine.push("confirm", None).unwrap();
//! assert_eq!(engine.render().unwrap().output, "confirm confirm");
//! ```

pub mod command;
pub mod config;
pub mod control;
pub mod controller;
pub mod engine;
pub mod reader;
pub mod registry;
pub mod subscription;

pub use command::{Dispatch, ModalCommand};
pub use config::{ConfigError, ENV_CHAIN_POLICY, ENV_TRACE_SNAPSHOTS, EngineConfig};
pub use control::ModalControl;
pub use controller::ModalController;
pub use engine::{ModalEngine, Rendered, WeakEngine};
pub use reader::SnapshotReader;
pub use registry::{RenderFn, RendererRegistry};
pub use subscription::Subscription;

pub use modstack_core;
