//! Common error infrastructure for modifiers-core.
//!
//! Domain-specific errors (e.g. `NotifyError`, `PersistError`) are defined in
//! their respective modules alongside the operations that produce them.
//!
//! Most of the engine is fail-soft by contract: an entity without class tags
//! resolves to its raw value, a mutation against a destroyed scope is ignored.
//! The errors here cover what is left, contract violations between the engine
//! and its consumers, and persistence problems.

/// Severity level of an error, used for categorization and logging priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Invalid input, should not retry without changes.
    ///
    /// Examples: corrupt save data, snapshot naming a player twice
    Validation,

    /// Unexpected state inconsistency.
    ///
    /// Examples: listeners re-triggering notifications without end
    /// These indicate bugs and should be investigated.
    Internal,

    /// Contract violation, the simulation cannot continue safely.
    ///
    /// Examples: a notification for a component nobody registered
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all modifiers-core errors.
///
/// # Implementation Guidelines
///
/// - All error enums should implement this trait
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on who has to act, not on impact
pub trait EngineError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    ///
    /// Default implementation uses the error type name.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}
