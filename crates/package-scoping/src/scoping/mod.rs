//! Package scoping: questionnaire factors, admin-authored rules, and the
//! engine that turns buyer answers into an adjusted price and timeline.
//!
//! The engine is a pure function over a baseline, an ordered rule list and
//! an answer map. Everything that touches storage or the audit log lives in
//! [`service`], which fetches a snapshot, validates answers and then calls
//! the engine.

pub mod domain;
pub mod drafts;
pub mod engine;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    AdjustmentKind, AnswerValue, AppliedRule, Condition, ConditionOperator, FactorId,
    FactorInputType, FactorOption, NumericRange, PackageBaseline, PackageId, PriceAdjustment,
    RuleId, Scalar, ScopingCalculationResult, ScopingFactor, ScopingInputs, ScopingRule,
};
pub use drafts::{FactorDraft, FactorDraftError, RuleDraft, RuleDraftError};
pub use engine::{EngineConfig, ScopingEngine, ScopingError};
pub use repository::{
    AuditAction, AuditEntry, AuditError, AuditLog, AuditTable, RepositoryError, ScopingRepository,
};
pub use router::{error_status, scoping_router, ActivationRequest, CalculateRequest};
pub use service::{ScopingService, ScopingServiceError};
pub use validation::{validate_answers, AnswerViolation};
