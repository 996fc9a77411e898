use metrics_exporter_prometheus::PrometheusHandle;
use package_scoping::scoping::{
    AdjustmentKind, AuditEntry, AuditError, AuditLog, ConditionOperator, FactorDraft, FactorId,
    FactorInputType, FactorOption, PackageBaseline, PackageId, RepositoryError, RuleDraft, RuleId,
    ScopingEngine, ScopingFactor, ScopingInputs, ScopingRepository, ScopingRule, ScopingService,
    ScopingServiceError,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

pub(crate) type DemoService = ScopingService<InMemoryScopingRepository, TracingAuditLog>;

/// Actor recorded in the audit trail for catalog seeding.
pub(crate) const SEED_ACTOR: &str = "catalog-seed";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) engine: Arc<ScopingEngine>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{name} store lock poisoned")))
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryScopingRepository {
    packages: Arc<Mutex<HashMap<PackageId, PackageBaseline>>>,
    factors: Arc<Mutex<HashMap<FactorId, ScopingFactor>>>,
    rules: Arc<Mutex<HashMap<RuleId, ScopingRule>>>,
}

impl InMemoryScopingRepository {
    pub(crate) fn insert_package(&self, package: PackageBaseline) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.packages, "package")?;
        if guard.contains_key(&package.package_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(package.package_id.clone(), package);
        Ok(())
    }
}

impl ScopingRepository for InMemoryScopingRepository {
    fn package(&self, id: &PackageId) -> Result<Option<PackageBaseline>, RepositoryError> {
        Ok(lock(&self.packages, "package")?.get(id).cloned())
    }

    fn factors(&self, package_id: &PackageId) -> Result<Vec<ScopingFactor>, RepositoryError> {
        let guard = lock(&self.factors, "factor")?;
        Ok(guard
            .values()
            .filter(|factor| &factor.package_id == package_id)
            .cloned()
            .collect())
    }

    fn factor(&self, id: &FactorId) -> Result<Option<ScopingFactor>, RepositoryError> {
        Ok(lock(&self.factors, "factor")?.get(id).cloned())
    }

    fn insert_factor(&self, factor: ScopingFactor) -> Result<ScopingFactor, RepositoryError> {
        let mut guard = lock(&self.factors, "factor")?;
        if guard.contains_key(&factor.factor_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(factor.factor_id.clone(), factor.clone());
        Ok(factor)
    }

    fn update_factor(&self, factor: ScopingFactor) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.factors, "factor")?;
        match guard.get_mut(&factor.factor_id) {
            Some(slot) => {
                *slot = factor;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete_factor(&self, id: &FactorId) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.factors, "factor")?;
        guard.remove(id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }

    /// Snapshot taken under one lock so a concurrent edit is never half-read.
    fn active_rules(&self, package_id: &PackageId) -> Result<Vec<ScopingRule>, RepositoryError> {
        let guard = lock(&self.rules, "rule")?;
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
        Ok(lock(&self.rules, "rule")?.get(id).cloned())
    }

    fn insert_rule(&self, rule: ScopingRule) -> Result<ScopingRule, RepositoryError> {
        let mut guard = lock(&self.rules, "rule")?;
        if guard.contains_key(&rule.rule_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(rule.rule_id.clone(), rule.clone());
        Ok(rule)
    }

    fn update_rule(&self, rule: ScopingRule) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.rules, "rule")?;
        match guard.get_mut(&rule.rule_id) {
            Some(slot) => {
                *slot = rule;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete_rule(&self, id: &RuleId) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.rules, "rule")?;
        guard.remove(id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }
}

/// Audit log that keeps entries in memory and mirrors them to tracing.
#[derive(Default, Clone)]
pub(crate) struct TracingAuditLog {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl AuditLog for TracingAuditLog {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        info!(
            table = entry.table.label(),
            record_id = %entry.record_id,
            action = entry.action.label(),
            changed_by = %entry.changed_by,
            changed_fields = entry.changed_fields.len(),
            "audit entry recorded"
        );
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| AuditError::Transport("audit buffer lock poisoned".to_string()))?;
        guard.push(entry);
        Ok(())
    }
}

impl TracingAuditLog {
    pub(crate) fn entries(&self) -> Result<Vec<AuditEntry>, AuditError> {
        self.entries
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| AuditError::Transport("audit buffer lock poisoned".to_string()))
    }
}

/// Ad hoc quote input: a baseline, rule drafts and answers, no catalog lookup.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct QuoteRequest {
    pub(crate) baseline: PackageBaseline,
    #[serde(default)]
    pub(crate) rules: Vec<RuleDraft>,
    #[serde(default)]
    pub(crate) answers: ScopingInputs,
}

impl QuoteRequest {
    /// Turn the drafts into rules for the request's package, in file order.
    pub(crate) fn build_rules(&self) -> Result<Vec<ScopingRule>, ScopingServiceError> {
        self.rules
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, draft)| {
                draft
                    .into_rule(
                        RuleId(format!("quote-rule-{:03}", index + 1)),
                        self.baseline.package_id.clone(),
                    )
                    .map_err(ScopingServiceError::from)
            })
            .collect()
    }
}

pub(crate) fn demo_package_id() -> PackageId {
    PackageId("pkg-managed-cloud".to_string())
}

fn demo_baseline() -> PackageBaseline {
    PackageBaseline {
        package_id: demo_package_id(),
        name: "Managed Cloud Migration".to_string(),
        base_price: Decimal::from(20000),
        base_timeline_weeks: Some(8),
    }
}

fn option(value: &str, label: &str) -> FactorOption {
    FactorOption {
        value: value.to_string(),
        label: label.to_string(),
    }
}

fn demo_factors() -> Vec<FactorDraft> {
    vec![
        FactorDraft {
            factor_key: "team_size".to_string(),
            question: "How many engineers will use the migrated platform?".to_string(),
            help_text: Some("Count everyone who deploys or operates workloads.".to_string()),
            input_type: FactorInputType::Number,
            options: Vec::new(),
            range: None,
            is_required: true,
            display_order: 1,
            is_active: true,
        },
        FactorDraft {
            factor_key: "compliance".to_string(),
            question: "Which compliance regimes apply?".to_string(),
            help_text: None,
            input_type: FactorInputType::Select,
            options: vec![
                option("soc2", "SOC 2"),
                option("hipaa", "HIPAA"),
                option("pci", "PCI DSS"),
            ],
            range: None,
            is_required: false,
            display_order: 2,
            is_active: true,
        },
        FactorDraft {
            factor_key: "returning_customer".to_string(),
            question: "Have you bought an engagement from us before?".to_string(),
            help_text: None,
            input_type: FactorInputType::Boolean,
            options: Vec::new(),
            range: None,
            is_required: false,
            display_order: 3,
            is_active: true,
        },
    ]
}

#[allow(clippy::too_many_arguments)]
fn demo_rule(
    rule_name: &str,
    factor_key: &str,
    operator: ConditionOperator,
    condition_value: serde_json::Value,
    adjustment: Option<(AdjustmentKind, Decimal)>,
    timeline_adjustment_weeks: Option<i32>,
    adjustment_label: &str,
    priority: i32,
) -> RuleDraft {
    RuleDraft {
        rule_name: rule_name.to_string(),
        factor_key: factor_key.to_string(),
        operator,
        condition_value: Some(condition_value),
        adjustment_type: adjustment.map(|(kind, _)| kind),
        adjustment_value: adjustment.map(|(_, amount)| amount),
        timeline_adjustment_weeks,
        adjustment_label: Some(adjustment_label.to_string()),
        priority,
        is_active: true,
    }
}

fn demo_rules() -> Vec<RuleDraft> {
    vec![
        demo_rule(
            "Large team surcharge",
            "team_size",
            ConditionOperator::GreaterThan,
            json!(50),
            Some((AdjustmentKind::FixedAdd, Decimal::from(5000))),
            Some(2),
            "+$5,000 for teams over 50",
            10,
        ),
        demo_rule(
            "Small team discount",
            "team_size",
            ConditionOperator::LessThan,
            json!(10),
            Some((AdjustmentKind::FixedSubtract, Decimal::from(2000))),
            Some(-1),
            "-$2,000 for teams under 10",
            15,
        ),
        demo_rule(
            "Regulated workloads",
            "compliance",
            ConditionOperator::Contains,
            json!("hipaa"),
            Some((AdjustmentKind::Multiplier, Decimal::new(125, 2))),
            Some(3),
            "x1.25 for HIPAA controls",
            20,
        ),
        demo_rule(
            "Returning customer credit",
            "returning_customer",
            ConditionOperator::Equals,
            json!(true),
            Some((AdjustmentKind::FixedSubtract, Decimal::from(1250))),
            None,
            "-$1,250 returning customer credit",
            30,
        ),
    ]
}

/// Load the demo package, its questionnaire and its rules through the service.
pub(crate) fn seed_demo_catalog(
    repository: &InMemoryScopingRepository,
    service: &DemoService,
) -> Result<PackageId, ScopingServiceError> {
    let package_id = demo_package_id();
    repository.insert_package(demo_baseline())?;

    for draft in demo_factors() {
        service.create_factor(SEED_ACTOR, &package_id, draft)?;
    }
    for draft in demo_rules() {
        service.create_rule(SEED_ACTOR, &package_id, draft)?;
    }

    info!(package_id = %package_id, "demo scoping catalog seeded");
    Ok(package_id)
}

/// Repository, audit log and service wired together with the demo catalog.
pub(crate) fn demo_service(
    engine: package_scoping::scoping::EngineConfig,
) -> Result<(Arc<DemoService>, TracingAuditLog, PackageId), ScopingServiceError> {
    let repository = Arc::new(InMemoryScopingRepository::default());
    let audit = Arc::new(TracingAuditLog::default());
    let service = ScopingService::new(repository.clone(), audit.clone(), engine);
    let package_id = seed_demo_catalog(&repository, &service)?;
    Ok((Arc::new(service), audit.as_ref().clone(), package_id))
}
