use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::domain::{
    FactorId, PackageBaseline, PackageId, RuleId, ScopingCalculationResult, ScopingFactor,
    ScopingInputs, ScopingRule,
};
use super::drafts::{FactorDraft, FactorDraftError, RuleDraft, RuleDraftError};
use super::engine::{EngineConfig, ScopingEngine, ScopingError};
use super::repository::{
    AuditAction, AuditEntry, AuditLog, AuditTable, RepositoryError, ScopingRepository,
};
use super::validation::{validate_answers, AnswerViolation};

/// Service composing the record store, audit log, and rule engine.
pub struct ScopingService<R, L> {
    repository: Arc<R>,
    audit: Arc<L>,
    engine: Arc<ScopingEngine>,
}

static FACTOR_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static RULE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_factor_id() -> FactorId {
    let id = FACTOR_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    FactorId(format!("factor-{id:06}"))
}

fn next_rule_id() -> RuleId {
    let id = RULE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RuleId(format!("rule-{id:06}"))
}

impl<R, L> ScopingService<R, L>
where
    R: ScopingRepository + 'static,
    L: AuditLog + 'static,
{
    pub fn new(repository: Arc<R>, audit: Arc<L>, config: EngineConfig) -> Self {
        Self {
            repository,
            audit,
            engine: Arc::new(ScopingEngine::new(config)),
        }
    }

    /// Price a package from buyer answers.
    pub fn calculate(
        &self,
        package_id: &PackageId,
        inputs: &ScopingInputs,
    ) -> Result<ScopingCalculationResult, ScopingServiceError> {
        let package = self.require_package(package_id)?;

        let factors = self.repository.factors(package_id)?;
        validate_answers(&factors, inputs)?;

        let rules = self.repository.active_rules(package_id)?;
        let result = self.engine.calculate(&package, &rules, inputs)?;

        info!(
            package_id = %package_id,
            base_price = %result.base_price,
            adjusted_price = %result.adjusted_price,
            adjusted_timeline_weeks = result.adjusted_timeline_weeks,
            applied_rules = result.applied_rules.len(),
            "scoping calculation complete"
        );
        Ok(result)
    }

    /// Active factors in display order, for rendering the questionnaire.
    pub fn questionnaire(
        &self,
        package_id: &PackageId,
    ) -> Result<Vec<ScopingFactor>, ScopingServiceError> {
        self.require_package(package_id)?;
        let mut factors: Vec<ScopingFactor> = self
            .repository
            .factors(package_id)?
            .into_iter()
            .filter(|factor| factor.is_active)
            .collect();
        factors.sort_by(|left, right| {
            left.display_order
                .cmp(&right.display_order)
                .then_with(|| left.factor_key.cmp(&right.factor_key))
        });
        Ok(factors)
    }

    pub fn create_factor(
        &self,
        actor: &str,
        package_id: &PackageId,
        draft: FactorDraft,
    ) -> Result<ScopingFactor, ScopingServiceError> {
        let actor = require_actor(actor)?;
        self.require_package(package_id)?;
        let factor = draft.into_factor(next_factor_id(), package_id.clone())?;
        self.ensure_unique_key(&factor)?;

        let stored = self.repository.insert_factor(factor)?;
        self.record_audit(
            AuditTable::ScopingFactors,
            &stored.factor_id.0,
            AuditAction::Create,
            actor,
            None,
            Some(&stored),
        );
        Ok(stored)
    }

    pub fn update_factor(
        &self,
        actor: &str,
        factor_id: &FactorId,
        draft: FactorDraft,
    ) -> Result<ScopingFactor, ScopingServiceError> {
        let actor = require_actor(actor)?;
        let existing = self.require_factor(factor_id)?;
        let factor = draft.into_factor(factor_id.clone(), existing.package_id.clone())?;
        self.ensure_unique_key(&factor)?;
        self.replace_factor(actor, existing, factor)
    }

    pub fn set_factor_active(
        &self,
        actor: &str,
        factor_id: &FactorId,
        active: bool,
    ) -> Result<ScopingFactor, ScopingServiceError> {
        let actor = require_actor(actor)?;
        let existing = self.require_factor(factor_id)?;
        let factor = ScopingFactor {
            is_active: active,
            ..existing.clone()
        };
        self.replace_factor(actor, existing, factor)
    }

    pub fn delete_factor(
        &self,
        actor: &str,
        factor_id: &FactorId,
    ) -> Result<(), ScopingServiceError> {
        let actor = require_actor(actor)?;
        let existing = self.require_factor(factor_id)?;
        self.repository.delete_factor(factor_id)?;
        self.record_audit(
            AuditTable::ScopingFactors,
            &factor_id.0,
            AuditAction::Delete,
            actor,
            Some(&existing),
            None,
        );
        Ok(())
    }

    pub fn create_rule(
        &self,
        actor: &str,
        package_id: &PackageId,
        draft: RuleDraft,
    ) -> Result<ScopingRule, ScopingServiceError> {
        let actor = require_actor(actor)?;
        self.require_package(package_id)?;
        let rule = draft.into_rule(next_rule_id(), package_id.clone())?;
        self.ensure_known_factor(&rule)?;

        let stored = self.repository.insert_rule(rule)?;
        self.record_audit(
            AuditTable::ScopingRules,
            &stored.rule_id.0,
            AuditAction::Create,
            actor,
            None,
            Some(&stored),
        );
        Ok(stored)
    }

    pub fn update_rule(
        &self,
        actor: &str,
        rule_id: &RuleId,
        draft: RuleDraft,
    ) -> Result<ScopingRule, ScopingServiceError> {
        let actor = require_actor(actor)?;
        let existing = self.require_rule(rule_id)?;
        let rule = draft.into_rule(rule_id.clone(), existing.package_id.clone())?;
        self.ensure_known_factor(&rule)?;
        self.replace_rule(actor, existing, rule)
    }

    pub fn set_rule_active(
        &self,
        actor: &str,
        rule_id: &RuleId,
        active: bool,
    ) -> Result<ScopingRule, ScopingServiceError> {
        let actor = require_actor(actor)?;
        let existing = self.require_rule(rule_id)?;
        let rule = ScopingRule {
            is_active: active,
            ..existing.clone()
        };
        self.replace_rule(actor, existing, rule)
    }

    pub fn delete_rule(&self, actor: &str, rule_id: &RuleId) -> Result<(), ScopingServiceError> {
        let actor = require_actor(actor)?;
        let existing = self.require_rule(rule_id)?;
        self.repository.delete_rule(rule_id)?;
        self.record_audit(
            AuditTable::ScopingRules,
            &rule_id.0,
            AuditAction::Delete,
            actor,
            Some(&existing),
            None,
        );
        Ok(())
    }

    fn replace_factor(
        &self,
        actor: &str,
        existing: ScopingFactor,
        factor: ScopingFactor,
    ) -> Result<ScopingFactor, ScopingServiceError> {
        self.repository.update_factor(factor.clone())?;
        self.record_audit(
            AuditTable::ScopingFactors,
            &factor.factor_id.0,
            AuditAction::Update,
            actor,
            Some(&existing),
            Some(&factor),
        );
        Ok(factor)
    }

    fn replace_rule(
        &self,
        actor: &str,
        existing: ScopingRule,
        rule: ScopingRule,
    ) -> Result<ScopingRule, ScopingServiceError> {
        self.repository.update_rule(rule.clone())?;
        self.record_audit(
            AuditTable::ScopingRules,
            &rule.rule_id.0,
            AuditAction::Update,
            actor,
            Some(&existing),
            Some(&rule),
        );
        Ok(rule)
    }

    fn require_package(&self, package_id: &PackageId) -> Result<PackageBaseline, ScopingServiceError> {
        self.repository
            .package(package_id)?
            .ok_or_else(|| ScopingError::PackageNotFound(package_id.clone()).into())
    }

    fn require_factor(&self, factor_id: &FactorId) -> Result<ScopingFactor, ScopingServiceError> {
        Ok(self
            .repository
            .factor(factor_id)?
            .ok_or(RepositoryError::NotFound)?)
    }

    fn require_rule(&self, rule_id: &RuleId) -> Result<ScopingRule, ScopingServiceError> {
        Ok(self
            .repository
            .rule(rule_id)?
            .ok_or(RepositoryError::NotFound)?)
    }

    fn ensure_unique_key(&self, factor: &ScopingFactor) -> Result<(), ScopingServiceError> {
        let taken = self
            .repository
            .factors(&factor.package_id)?
            .iter()
            .any(|other| other.factor_key == factor.factor_key && other.factor_id != factor.factor_id);
        if taken {
            return Err(ScopingServiceError::DuplicateFactorKey {
                package_id: factor.package_id.clone(),
                factor_key: factor.factor_key.clone(),
            });
        }
        Ok(())
    }

    fn ensure_known_factor(&self, rule: &ScopingRule) -> Result<(), ScopingServiceError> {
        let known = self
            .repository
            .factors(&rule.package_id)?
            .iter()
            .any(|factor| factor.factor_key == rule.factor_key);
        if !known {
            return Err(ScopingServiceError::UnknownFactorKey {
                package_id: rule.package_id.clone(),
                factor_key: rule.factor_key.clone(),
            });
        }
        Ok(())
    }

    fn record_audit<T: Serialize>(
        &self,
        table: AuditTable,
        record_id: &str,
        action: AuditAction,
        actor: &str,
        before: Option<&T>,
        after: Option<&T>,
    ) {
        let snapshot = |record: &T| serde_json::to_value(record).unwrap_or(Value::Null);
        let entry = AuditEntry::new(
            table,
            record_id,
            action,
            actor,
            before.map(snapshot),
            after.map(snapshot),
        );

        info!(
            table = table.label(),
            record_id,
            action = action.label(),
            changed_by = actor,
            "scoping catalog changed"
        );
        if let Err(error) = self.audit.record(entry) {
            warn!(%error, table = table.label(), record_id, "audit log write failed");
        }
    }
}

fn require_actor(actor: &str) -> Result<&str, ScopingServiceError> {
    let actor = actor.trim();
    if actor.is_empty() {
        return Err(ScopingServiceError::MissingActor);
    }
    Ok(actor)
}

/// Error raised by the scoping service.
#[derive(Debug, thiserror::Error)]
pub enum ScopingServiceError {
    #[error(transparent)]
    Scoping(#[from] ScopingError),
    #[error(transparent)]
    Answer(#[from] AnswerViolation),
    #[error(transparent)]
    RuleDraft(#[from] RuleDraftError),
    #[error(transparent)]
    FactorDraft(#[from] FactorDraftError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("factor key '{factor_key}' already exists in package {package_id}")]
    DuplicateFactorKey {
        package_id: PackageId,
        factor_key: String,
    },
    #[error("package {package_id} has no factor '{factor_key}'")]
    UnknownFactorKey {
        package_id: PackageId,
        factor_key: String,
    },
    #[error("admin writes require an acting user")]
    MissingActor,
}
