use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{
    decimal_from_json, AdjustmentKind, Condition, ConditionOperator, FactorId, FactorInputType,
    FactorOption, NumericRange, PackageId, PriceAdjustment, RuleId, Scalar, ScopingFactor,
    ScopingRule,
};

/// Rejections raised while turning an admin rule payload into a rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleDraftError {
    #[error("rule name must not be blank")]
    BlankName,
    #[error("rule must reference a factor key")]
    BlankFactorKey,
    #[error("{} condition requires a condition_value", .0.label())]
    MissingConditionValue(ConditionOperator),
    #[error("invalid {} condition_value: {reason}", .operator.label())]
    InvalidConditionValue {
        operator: ConditionOperator,
        reason: String,
    },
    #[error("in_range condition has min {min} above max {max}")]
    InvertedRange { min: Decimal, max: Decimal },
    #[error("{} adjustment is missing its amount", .0.label())]
    MissingAdjustmentAmount(AdjustmentKind),
    #[error("adjustment amount {0} was given without an adjustment type")]
    MissingAdjustmentKind(Decimal),
    #[error("adjustment amount must not be negative (found {0})")]
    NegativeAmount(Decimal),
}

/// Admin payload for creating or replacing a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDraft {
    pub rule_name: String,
    pub factor_key: String,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub condition_value: Option<Value>,
    #[serde(default)]
    pub adjustment_type: Option<AdjustmentKind>,
    #[serde(default)]
    pub adjustment_value: Option<Decimal>,
    #[serde(default)]
    pub timeline_adjustment_weeks: Option<i32>,
    #[serde(default)]
    pub adjustment_label: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl RuleDraft {
    pub fn into_rule(
        self,
        rule_id: RuleId,
        package_id: PackageId,
    ) -> Result<ScopingRule, RuleDraftError> {
        let rule_name = self.rule_name.trim().to_string();
        if rule_name.is_empty() {
            return Err(RuleDraftError::BlankName);
        }
        let factor_key = self.factor_key.trim().to_string();
        if factor_key.is_empty() {
            return Err(RuleDraftError::BlankFactorKey);
        }

        let condition = parse_condition(self.operator, self.condition_value)?;
        let price_adjustment = match (self.adjustment_type, self.adjustment_value) {
            (Some(_), Some(amount)) if amount.is_sign_negative() && !amount.is_zero() => {
                return Err(RuleDraftError::NegativeAmount(amount))
            }
            (Some(kind), Some(amount)) => Some(PriceAdjustment { kind, amount }),
            (Some(kind), None) => return Err(RuleDraftError::MissingAdjustmentAmount(kind)),
            (None, Some(amount)) => return Err(RuleDraftError::MissingAdjustmentKind(amount)),
            (None, None) => None,
        };

        let adjustment_label = self
            .adjustment_label
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty());

        Ok(ScopingRule {
            rule_id,
            package_id,
            rule_name,
            factor_key,
            condition,
            price_adjustment,
            timeline_adjustment_weeks: self.timeline_adjustment_weeks,
            adjustment_label,
            priority: self.priority,
            is_active: self.is_active,
        })
    }
}

fn parse_condition(
    operator: ConditionOperator,
    value: Option<Value>,
) -> Result<Condition, RuleDraftError> {
    let value = match value {
        Some(Value::Null) | None => return Err(RuleDraftError::MissingConditionValue(operator)),
        Some(value) => value,
    };
    let invalid = |reason: String| RuleDraftError::InvalidConditionValue { operator, reason };

    match operator {
        ConditionOperator::Equals => Scalar::try_from(value).map(Condition::Equals).map_err(invalid),
        ConditionOperator::Contains => {
            Scalar::try_from(value).map(Condition::Contains).map_err(invalid)
        }
        ConditionOperator::GreaterThan => number(&value)
            .map(Condition::GreaterThan)
            .map_err(invalid),
        ConditionOperator::LessThan => number(&value).map(Condition::LessThan).map_err(invalid),
        ConditionOperator::InRange => {
            let bound = |name: &str| {
                value
                    .get(name)
                    .ok_or_else(|| format!("expected an object with '{name}'"))
                    .and_then(number)
            };
            let min = bound("min").map_err(invalid)?;
            let max = bound("max").map_err(invalid)?;
            if min > max {
                return Err(RuleDraftError::InvertedRange { min, max });
            }
            Ok(Condition::InRange { min, max })
        }
    }
}

fn number(value: &Value) -> Result<Decimal, String> {
    match value {
        Value::Number(number) => {
            decimal_from_json(number).ok_or_else(|| format!("{number} is out of range"))
        }
        other => Err(format!("expected a number, found {other}")),
    }
}

/// Rejections raised while turning an admin factor payload into a factor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FactorDraftError {
    #[error("factor key '{0}' must be lowercase letters, digits or underscores")]
    InvalidFactorKey(String),
    #[error("factor question must not be blank")]
    BlankQuestion,
    #[error("select factors need at least one option")]
    MissingOptions,
    #[error("option '{0}' is listed more than once")]
    DuplicateOption(String),
    #[error("range has min {min} above max {max}")]
    InvertedRange { min: Decimal, max: Decimal },
}

/// Admin payload for creating or replacing a questionnaire factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorDraft {
    pub factor_key: String,
    pub question: String,
    #[serde(default)]
    pub help_text: Option<String>,
    pub input_type: FactorInputType,
    #[serde(default)]
    pub options: Vec<FactorOption>,
    #[serde(default)]
    pub range: Option<NumericRange>,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl FactorDraft {
    pub fn into_factor(
        self,
        factor_id: FactorId,
        package_id: PackageId,
    ) -> Result<ScopingFactor, FactorDraftError> {
        let factor_key = self.factor_key.trim().to_string();
        let key_is_valid = !factor_key.is_empty()
            && factor_key
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !key_is_valid {
            return Err(FactorDraftError::InvalidFactorKey(factor_key));
        }

        let question = self.question.trim().to_string();
        if question.is_empty() {
            return Err(FactorDraftError::BlankQuestion);
        }

        if self.input_type == FactorInputType::Select && self.options.is_empty() {
            return Err(FactorDraftError::MissingOptions);
        }
        let mut seen = BTreeSet::new();
        for option in &self.options {
            if !seen.insert(option.value.as_str()) {
                return Err(FactorDraftError::DuplicateOption(option.value.clone()));
            }
        }

        if let Some(range) = &self.range {
            if range.min > range.max {
                return Err(FactorDraftError::InvertedRange {
                    min: range.min,
                    max: range.max,
                });
            }
        }

        Ok(ScopingFactor {
            factor_id,
            package_id,
            factor_key,
            question,
            help_text: self.help_text.filter(|text| !text.trim().is_empty()),
            input_type: self.input_type,
            options: self.options,
            range: self.range,
            is_required: self.is_required,
            display_order: self.display_order,
            is_active: self.is_active,
        })
    }
}
