//! Error types shared by every splitplan crate.
//!
//! Lookups against the topology or the split catalog never silently skip a
//! missing entry: they return [`CoreError::UnknownKey`] so the caller can
//! surface it as a configuration error.

use thiserror::Error;

/// Kind of key that failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Node,
    Hardware,
    HardwareType,
    BaseStation,
    BaseStationType,
    Link,
    Route,
    Split,
    Timestamp,
    Load,
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            KeyKind::Node => "node",
            KeyKind::Hardware => "hardware",
            KeyKind::HardwareType => "hardware type",
            KeyKind::BaseStation => "base station",
            KeyKind::BaseStationType => "base station type",
            KeyKind::Link => "link",
            KeyKind::Route => "route",
            KeyKind::Split => "split",
            KeyKind::Timestamp => "timestamp",
            KeyKind::Load => "load entry",
        };
        f.write_str(name)
    }
}

/// Errors raised by the data layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A key referenced by a route, split, or load row does not exist
    #[error("Unknown {kind}: {key}")]
    UnknownKey { kind: KeyKind, key: String },

    /// Structurally invalid data (overlapping function sets, duplicate ids, ...)
    #[error("Validation error: {0}")]
    Validation(String),
}

impl CoreError {
    pub fn unknown(kind: KeyKind, key: impl std::fmt::Display) -> Self {
        CoreError::UnknownKey {
            kind,
            key: key.to_string(),
        }
    }
}

/// Convenience alias for results in the data layer.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_key_display() {
        let err = CoreError::unknown(KeyKind::Link, 17);
        assert_eq!(err.to_string(), "Unknown link: 17");
    }

    #[test]
    fn test_validation_display() {
        let err = CoreError::Validation("split 6 assigns f3 twice".into());
        assert!(err.to_string().contains("Validation error"));
        assert!(err.to_string().contains("f3 twice"));
    }
}
