use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::scoping::domain::{
    AdjustmentKind, Condition, FactorId, FactorInputType, FactorOption, PackageBaseline,
    PackageId, PriceAdjustment, RuleId, ScopingFactor, ScopingRule,
};
use crate::scoping::drafts::{FactorDraft, RuleDraft};
use crate::scoping::repository::{
    AuditEntry, AuditError, AuditLog, RepositoryError, ScopingRepository,
};
use crate::scoping::{scoping_router, ConditionOperator, EngineConfig, ScopingService};

pub(super) const ADMIN: &str = "ops@example.com";

pub(super) fn package_id() -> PackageId {
    PackageId("pkg-platform-audit".to_string())
}

pub(super) fn baseline(price: i64, weeks: Option<u32>) -> PackageBaseline {
    PackageBaseline {
        package_id: package_id(),
        name: "Platform Audit".to_string(),
        base_price: Decimal::from(price),
        base_timeline_weeks: weeks,
    }
}

pub(super) fn rule(
    id: &str,
    factor_key: &str,
    condition: Condition,
    price_adjustment: Option<(AdjustmentKind, Decimal)>,
    timeline_adjustment_weeks: Option<i32>,
    priority: i32,
) -> ScopingRule {
    ScopingRule {
        rule_id: RuleId(id.to_string()),
        package_id: package_id(),
        rule_name: format!("rule {id}"),
        factor_key: factor_key.to_string(),
        condition,
        price_adjustment: price_adjustment.map(|(kind, amount)| PriceAdjustment { kind, amount }),
        timeline_adjustment_weeks,
        adjustment_label: None,
        priority,
        is_active: true,
    }
}

pub(super) fn team_size_rule() -> ScopingRule {
    let mut rule = rule(
        "large-team",
        "team_size",
        Condition::GreaterThan(Decimal::from(50)),
        Some((AdjustmentKind::FixedAdd, Decimal::from(5000))),
        Some(2),
        1,
    );
    rule.rule_name = "Large team surcharge".to_string();
    rule.adjustment_label = Some("+$5,000 for teams over 50".to_string());
    rule
}

pub(super) fn team_size_draft() -> FactorDraft {
    FactorDraft {
        factor_key: "team_size".to_string(),
        question: "How many people are on the team?".to_string(),
        help_text: None,
        input_type: FactorInputType::Number,
        options: Vec::new(),
        range: None,
        is_required: true,
        display_order: 1,
        is_active: true,
    }
}

pub(super) fn hosting_draft() -> FactorDraft {
    FactorDraft {
        factor_key: "hosting".to_string(),
        question: "Where is the platform hosted?".to_string(),
        help_text: Some("Pick the primary environment".to_string()),
        input_type: FactorInputType::Select,
        options: vec![
            FactorOption {
                value: "cloud".to_string(),
                label: "Public cloud".to_string(),
            },
            FactorOption {
                value: "on_prem".to_string(),
                label: "On premises".to_string(),
            },
        ],
        range: None,
        is_required: false,
        display_order: 0,
        is_active: true,
    }
}

pub(super) fn team_size_rule_draft() -> RuleDraft {
    RuleDraft {
        rule_name: "Large team surcharge".to_string(),
        factor_key: "team_size".to_string(),
        operator: ConditionOperator::GreaterThan,
        condition_value: Some(json!(50)),
        adjustment_type: Some(AdjustmentKind::FixedAdd),
        adjustment_value: Some(Decimal::from(5000)),
        timeline_adjustment_weeks: Some(2),
        adjustment_label: Some("+$5,000 for teams over 50".to_string()),
        priority: 1,
        is_active: true,
    }
}

pub(super) fn factor(key: &str, input_type: FactorInputType, is_required: bool) -> ScopingFactor {
    ScopingFactor {
        factor_id: FactorId(format!("factor-{key}")),
        package_id: package_id(),
        factor_key: key.to_string(),
        question: format!("{key}?"),
        help_text: None,
        input_type,
        options: Vec::new(),
        range: None,
        is_required,
        display_order: 0,
        is_active: true,
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) packages: Arc<Mutex<HashMap<PackageId, PackageBaseline>>>,
    pub(super) factors: Arc<Mutex<HashMap<FactorId, ScopingFactor>>>,
    pub(super) rules: Arc<Mutex<HashMap<RuleId, ScopingRule>>>,
}

impl MemoryRepository {
    pub(super) fn with_package(package: PackageBaseline) -> Self {
        let repository = Self::default();
        repository
            .packages
            .lock()
            .expect("package mutex poisoned")
            .insert(package.package_id.clone(), package);
        repository
    }
}

impl ScopingRepository for MemoryRepository {
    fn package(&self, id: &PackageId) -> Result<Option<PackageBaseline>, RepositoryError> {
        let guard = self.packages.lock().expect("package mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn factors(&self, package_id: &PackageId) -> Result<Vec<ScopingFactor>, RepositoryError> {
        let guard = self.factors.lock().expect("factor mutex poisoned");
        Ok(guard
            .values()
            .filter(|factor| &factor.package_id == package_id)
            .cloned()
            .collect())
    }

    fn factor(&self, id: &FactorId) -> Result<Option<ScopingFactor>, RepositoryError> {
        let guard = self.factors.lock().expect("factor mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn insert_factor(&self, factor: ScopingFactor) -> Result<ScopingFactor, RepositoryError> {
        let mut guard = self.factors.lock().expect("factor mutex poisoned");
        if guard.contains_key(&factor.factor_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(factor.factor_id.clone(), factor.clone());
        Ok(factor)
    }

    fn update_factor(&self, factor: ScopingFactor) -> Result<(), RepositoryError> {
        let mut guard = self.factors.lock().expect("factor mutex poisoned");
        guard.insert(factor.factor_id.clone(), factor);
        Ok(())
    }

    fn delete_factor(&self, id: &FactorId) -> Result<(), RepositoryError> {
        let mut guard = self.factors.lock().expect("factor mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }

    fn active_rules(&self, package_id: &PackageId) -> Result<Vec<ScopingRule>, RepositoryError> {
        let guard = self.rules.lock().expect("rule mutex poisoned");
        let mut rules: Vec<ScopingRule> = guard
            .values()
            .filter(|rule| &rule.package_id == package_id && rule.is_active)
            .cloned()
            .collect();
        rules.sort_by(|left, right| {
            left.priority
                .cmp(&right.priority)
                .then_with(|| left.rule_id.cmp(&right.rule_id))
        });
        Ok(rules)
    }

    fn rule(&self, id: &RuleId) -> Result<Option<ScopingRule>, RepositoryError> {
        let guard = self.rules.lock().expect("rule mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn insert_rule(&self, rule: ScopingRule) -> Result<ScopingRule, RepositoryError> {
        let mut guard = self.rules.lock().expect("rule mutex poisoned");
        if guard.contains_key(&rule.rule_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(rule.rule_id.clone(), rule.clone());
        Ok(rule)
    }

    fn update_rule(&self, rule: ScopingRule) -> Result<(), RepositoryError> {
        let mut guard = self.rules.lock().expect("rule mutex poisoned");
        guard.insert(rule.rule_id.clone(), rule);
        Ok(())
    }

    fn delete_rule(&self, id: &RuleId) -> Result<(), RepositoryError> {
        let mut guard = self.rules.lock().expect("rule mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryAudit {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemoryAudit {
    pub(super) fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditLog for MemoryAudit {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        self.entries
            .lock()
            .expect("audit mutex poisoned")
            .push(entry);
        Ok(())
    }
}

pub(super) struct FailingAudit;

impl AuditLog for FailingAudit {
    fn record(&self, _entry: AuditEntry) -> Result<(), AuditError> {
        Err(AuditError::Transport("audit sink offline".to_string()))
    }
}

pub(super) struct UnavailableRepository;

impl ScopingRepository for UnavailableRepository {
    fn package(&self, _id: &PackageId) -> Result<Option<PackageBaseline>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn factors(&self, _package_id: &PackageId) -> Result<Vec<ScopingFactor>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn factor(&self, _id: &FactorId) -> Result<Option<ScopingFactor>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_factor(&self, _factor: ScopingFactor) -> Result<ScopingFactor, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_factor(&self, _factor: ScopingFactor) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete_factor(&self, _id: &FactorId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn active_rules(&self, _package_id: &PackageId) -> Result<Vec<ScopingRule>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn rule(&self, _id: &RuleId) -> Result<Option<ScopingRule>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_rule(&self, _rule: ScopingRule) -> Result<ScopingRule, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_rule(&self, _rule: ScopingRule) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete_rule(&self, _id: &RuleId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn build_service() -> (
    ScopingService<MemoryRepository, MemoryAudit>,
    Arc<MemoryRepository>,
    Arc<MemoryAudit>,
) {
    let repository = Arc::new(MemoryRepository::with_package(baseline(20000, Some(8))));
    let audit = Arc::new(MemoryAudit::default());
    let service = ScopingService::new(repository.clone(), audit.clone(), EngineConfig::default());
    (service, repository, audit)
}

/// Service with the team-size factor and surcharge rule already authored.
pub(super) fn seeded_service() -> (
    ScopingService<MemoryRepository, MemoryAudit>,
    Arc<MemoryRepository>,
    Arc<MemoryAudit>,
) {
    let (service, repository, audit) = build_service();
    service
        .create_factor(ADMIN, &package_id(), team_size_draft())
        .expect("factor created");
    service
        .create_rule(ADMIN, &package_id(), team_size_rule_draft())
        .expect("rule created");
    (service, repository, audit)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn router_with_service(
    service: ScopingService<MemoryRepository, MemoryAudit>,
) -> axum::Router {
    scoping_router(Arc::new(service))
}
