#![forbid(unsafe_code)]

//! Errors from stack transitions.

/// Errors from modal stack operations.
///
/// Signals programmer misuse. A failing operation leaves the
/// stack exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalError {
    /// A modal with this name is already open.
    Duplicate {
        /// The conflicting modal name.
        name: String,
    },
}

impl ModalError {
    /// Name of the modal the error refers to.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Duplicate { name } => name,
        }
    }
}

impl std::fmt::Display for ModalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Duplicate { name } => {
                write!(f, "there is already a modal with this name ({name})")
            }
        }
    }
}

impl std::error::Error for ModalError {}
