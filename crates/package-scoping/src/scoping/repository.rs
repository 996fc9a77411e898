use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{
    FactorId, PackageBaseline, PackageId, RuleId, ScopingFactor, ScopingRule,
};

/// Record store for packages, factors and rules.
///
/// `active_rules` must return a consistent snapshot ordered by ascending
/// priority so a rule edited mid-calculation is never half-read.
pub trait ScopingRepository: Send + Sync {
    fn package(&self, id: &PackageId) -> Result<Option<PackageBaseline>, RepositoryError>;

    fn factors(&self, package_id: &PackageId) -> Result<Vec<ScopingFactor>, RepositoryError>;
    fn factor(&self, id: &FactorId) -> Result<Option<ScopingFactor>, RepositoryError>;
    fn insert_factor(&self, factor: ScopingFactor) -> Result<ScopingFactor, RepositoryError>;
    fn update_factor(&self, factor: ScopingFactor) -> Result<(), RepositoryError>;
    fn delete_factor(&self, id: &FactorId) -> Result<(), RepositoryError>;

    fn active_rules(&self, package_id: &PackageId) -> Result<Vec<ScopingRule>, RepositoryError>;
    fn rule(&self, id: &RuleId) -> Result<Option<ScopingRule>, RepositoryError>;
    fn insert_rule(&self, rule: ScopingRule) -> Result<ScopingRule, RepositoryError>;
    fn update_rule(&self, rule: ScopingRule) -> Result<(), RepositoryError>;
    fn delete_rule(&self, id: &RuleId) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Append-only change history written by the administration layer.
pub trait AuditLog: Send + Sync {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditTable {
    ScopingFactors,
    ScopingRules,
}

impl AuditTable {
    pub const fn label(self) -> &'static str {
        match self {
            AuditTable::ScopingFactors => "scoping_factors",
            AuditTable::ScopingRules => "scoping_rules",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub const fn label(self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
        }
    }
}

/// One admin write. `changed_fields` holds the whole record on create and
/// delete, and only the differing fields on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub table: AuditTable,
    pub record_id: String,
    pub action: AuditAction,
    pub changed_by: String,
    pub changed_fields: BTreeMap<String, Value>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        table: AuditTable,
        record_id: impl Into<String>,
        action: AuditAction,
        changed_by: impl Into<String>,
        before: Option<Value>,
        after: Option<Value>,
    ) -> Self {
        Self {
            table,
            record_id: record_id.into(),
            action,
            changed_by: changed_by.into(),
            changed_fields: changed_fields(before, after),
            recorded_at: Utc::now(),
        }
    }
}

fn changed_fields(before: Option<Value>, after: Option<Value>) -> BTreeMap<String, Value> {
    match (before, after) {
        (Some(Value::Object(before)), Some(Value::Object(mut after))) => {
            let cleared: Vec<String> = before
                .keys()
                .filter(|field| !after.contains_key(*field))
                .cloned()
                .collect();
            // Optional fields are skipped when unset, so a missing key means it was cleared.
            for field in cleared {
                after.insert(field, Value::Null);
            }
            after
                .into_iter()
                .filter(|(field, value)| before.get(field).unwrap_or(&Value::Null) != value)
                .collect()
        }
        (None, Some(Value::Object(record))) | (Some(Value::Object(record)), None) => {
            record.into_iter().collect()
        }
        _ => BTreeMap::new(),
    }
}

/// Audit transport error.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit log unavailable: {0}")]
    Transport(String),
}
