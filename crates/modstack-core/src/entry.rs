#![forbid(unsafe_code)]

//! Stack entries and their data payloads.

use serde_json::{Map, Value};

use crate::id::ModalId;

/// Key/value payload handed to a modal's renderer.
pub type DataMap = Map<String, Value>;

/// One opened modal instance.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StackEntry {
    /// Render key. Changes whenever the entry is replaced.
    pub id: ModalId,
    /// Name of the registered renderer.
    pub name: String,
    /// Payload; `None` when opened without data.
    pub data: Option<DataMap>,
    /// Opened as a hand-off from the entry below.
    pub relay: bool,
}

impl StackEntry {
    /// Create an entry.
    #[must_use]
    pub fn new(id: ModalId, name: impl Into<String>, data: Option<DataMap>, relay: bool) -> Self {
        Self {
            id,
            name: name.into(),
            data,
            relay,
        }
    }

    /// Look up one payload value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|data| data.get(key))
    }
}

/// Shallow-merge `partial` over `current`.
///
/// Keys present in `partial` win. A missing map on either side counts as
/// empty, so the result is always `Some`.
#[must_use]
pub fn merge_data(current: Option<&DataMap>, partial: Option<DataMap>) -> Option<DataMap> {
    let mut merged = current.cloned().unwrap_or_default();
    if let Some(partial) = partial {
        merged.extend(partial);
    }
    Some(merged)
}
