#![forbid(unsafe_code)]

//! Where a chained pop or a replace stops walking down a relay chain.

use core::fmt;
use core::str::FromStr;

/// How far a chained pop (submit) or a replace reaches below the top.
///
/// Given `[A, B(relay), C(relay)]` with `C` on top:
///
/// | Policy | submit | replace with `D` |
/// |--------|--------|------------------|
/// | `KeepRoot` | `[A]` | `[A, D]` |
/// | `CloseRoot` | `[]` | `[D]` |
///
/// A non-chained pop (cancel) removes only the top under either policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum ChainPolicy {
    /// The transaction is the relay run at the top. The modal that started
    /// the chain survives.
    #[default]
    KeepRoot,
    /// The transaction also includes the non-relay modal the chain started
    /// from.
    CloseRoot,
}

impl ChainPolicy {
    /// Stable string form, as accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KeepRoot => "keep-root",
            Self::CloseRoot => "close-root",
        }
    }
}

impl fmt::Display for ChainPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised chain policy string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePolicyError(String);

impl ParsePolicyError {
    /// The rejected input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParsePolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown chain policy '{}' (expected keep-root or close-root)",
            self.0
        )
    }
}

impl std::error::Error for ParsePolicyError {}

impl FromStr for ChainPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "keep-root" | "keeproot" => Ok(Self::KeepRoot),
            "close-root" | "closeroot" | "legacy" => Ok(Self::CloseRoot),
            _ => Err(ParsePolicyError(s.to_owned())),
        }
    }
}
