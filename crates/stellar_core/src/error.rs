//! Command failures. Every variant is raised during validation, before any
//! state is touched.

use serde::Serialize;
use thiserror::Error;

use crate::{ModuleCategory, ModuleId, ResourceId, StarId, TechId};

/// Coarse failure class, for callers that only need to pick a message style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Prerequisite,
    Conflict,
    NotFound,
    RateLimit,
    Module,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("insufficient {resource}: need {required}, have {available}")]
    InsufficientResources {
        resource: ResourceId,
        required: f64,
        available: f64,
    },
    #[error("insufficient energy: need {required}, have {available}")]
    InsufficientEnergy { required: f64, available: f64 },
    #[error("insufficient research points: need {required}, have {available}")]
    InsufficientResearchPoints { required: f64, available: f64 },
    #[error("invalid energy allocation for {module_id}: {reason}")]
    InvalidAllocation {
        module_id: ModuleId,
        reason: &'static str,
    },
    #[error("ship is already at {0}")]
    AlreadyAtStar(StarId),
    #[error("{target} requires research {tech_id}")]
    MissingResearch { target: String, tech_id: TechId },
    #[error("{0} is not unlocked")]
    NotUnlocked(ModuleId),
    #[error("tech {tech_id} requires {missing} to be completed first")]
    MissingPrerequisite { tech_id: TechId, missing: TechId },
    #[error("{slot} is already occupied")]
    Conflict { slot: String },
    #[error("unknown {kind}: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("extraction limit reached at {star_id}: {limit} per hour")]
    RateLimited { star_id: StarId, limit: u32 },
    #[error("no {0:?} module installed")]
    MissingModule(ModuleCategory),
}

impl CommandError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommandError::InsufficientResources { .. }
            | CommandError::InsufficientEnergy { .. }
            | CommandError::InsufficientResearchPoints { .. }
            | CommandError::InvalidAllocation { .. }
            | CommandError::AlreadyAtStar(_) => ErrorKind::Validation,
            CommandError::MissingResearch { .. }
            | CommandError::NotUnlocked(_)
            | CommandError::MissingPrerequisite { .. } => ErrorKind::Prerequisite,
            CommandError::Conflict { .. } => ErrorKind::Conflict,
            CommandError::NotFound { .. } => ErrorKind::NotFound,
            CommandError::RateLimited { .. } => ErrorKind::RateLimit,
            CommandError::MissingModule(_) => ErrorKind::Module,
        }
    }

    pub(crate) fn conflict(slot: impl Into<String>) -> Self {
        CommandError::Conflict { slot: slot.into() }
    }

    pub(crate) fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        CommandError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        let err = CommandError::InsufficientEnergy {
            required: 100.0,
            available: 99.0,
        };
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            CommandError::conflict("navigation").kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            CommandError::MissingModule(ModuleCategory::Warp).kind(),
            ErrorKind::Module
        );
        assert_eq!(
            CommandError::NotUnlocked(ModuleId("warp_core".to_string())).kind(),
            ErrorKind::Prerequisite
        );
    }

    #[test]
    fn messages_carry_detail() {
        let err = CommandError::InsufficientResources {
            resource: "iron".to_string(),
            required: 10.0,
            available: 9.0,
        };
        assert_eq!(err.to_string(), "insufficient iron: need 10, have 9");
        let err = CommandError::RateLimited {
            star_id: StarId("sol".to_string()),
            limit: 4,
        };
        assert_eq!(err.to_string(), "extraction limit reached at sol: 4 per hour");
    }
}
