use modifiers_core::{EngineError, ErrorSeverity};

/// Errors raised while assembling an emitter's auras from template data.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuraError {
    #[error("no aura template named {name}")]
    UnknownAura { name: String },

    #[error("aura {name} is listed twice")]
    DuplicateAura { name: String },

    #[error("range aura {name} has no valid radius")]
    MissingRadius { name: String },
}

impl EngineError for AuraError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownAura { .. } => "AURA_UNKNOWN",
            Self::DuplicateAura { .. } => "AURA_DUPLICATE",
            Self::MissingRadius { .. } => "AURA_MISSING_RADIUS",
        }
    }
}
