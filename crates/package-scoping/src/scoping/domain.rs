use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Identifier wrapper for catalog packages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageId(pub String);

/// Identifier wrapper for questionnaire factors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FactorId(pub String);

/// Identifier wrapper for scoping rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId(pub String);

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for FactorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Catalog snapshot the engine prices from. Owned by the package catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageBaseline {
    pub package_id: PackageId,
    pub name: String,
    pub base_price: Decimal,
    #[serde(default)]
    pub base_timeline_weeks: Option<u32>,
}

impl PackageBaseline {
    pub fn timeline_weeks(&self) -> u32 {
        self.base_timeline_weeks.unwrap_or(0)
    }
}

/// How a questionnaire factor is rendered and what answer shape it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorInputType {
    Select,
    Number,
    Boolean,
    Range,
}

impl FactorInputType {
    pub const fn label(self) -> &'static str {
        match self {
            FactorInputType::Select => "select",
            FactorInputType::Number => "number",
            FactorInputType::Boolean => "boolean",
            FactorInputType::Range => "range",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorOption {
    pub value: String,
    pub label: String,
}

/// Inclusive numeric bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl NumericRange {
    pub fn contains(&self, value: &Decimal) -> bool {
        self.min <= *value && *value <= self.max
    }
}

/// One questionnaire input. Never touched by the engine's arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopingFactor {
    pub factor_id: FactorId,
    pub package_id: PackageId,
    pub factor_key: String,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    pub input_type: FactorInputType,
    #[serde(default)]
    pub options: Vec<FactorOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<NumericRange>,
    pub is_required: bool,
    pub display_order: i32,
    pub is_active: bool,
}

/// Price movement applied by a matched rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    /// Plain factor, `1.15` raises the running price by 15%.
    Multiplier,
    FixedAdd,
    FixedSubtract,
}

impl AdjustmentKind {
    pub const fn label(self) -> &'static str {
        match self {
            AdjustmentKind::Multiplier => "multiplier",
            AdjustmentKind::FixedAdd => "fixed_add",
            AdjustmentKind::FixedSubtract => "fixed_subtract",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAdjustment {
    pub kind: AdjustmentKind,
    pub amount: Decimal,
}

/// Operator tags accepted from rule authors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    GreaterThan,
    LessThan,
    InRange,
    Contains,
}

impl ConditionOperator {
    pub const fn label(self) -> &'static str {
        match self {
            ConditionOperator::Equals => "equals",
            ConditionOperator::GreaterThan => "greater_than",
            ConditionOperator::LessThan => "less_than",
            ConditionOperator::InRange => "in_range",
            ConditionOperator::Contains => "contains",
        }
    }
}

/// Rule condition; each operator carries exactly the payload it compares against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operator", content = "condition_value", rename_all = "snake_case")]
pub enum Condition {
    Equals(Scalar),
    GreaterThan(Decimal),
    LessThan(Decimal),
    InRange { min: Decimal, max: Decimal },
    Contains(Scalar),
}

impl Condition {
    pub const fn operator(&self) -> ConditionOperator {
        match self {
            Condition::Equals(_) => ConditionOperator::Equals,
            Condition::GreaterThan(_) => ConditionOperator::GreaterThan,
            Condition::LessThan(_) => ConditionOperator::LessThan,
            Condition::InRange { .. } => ConditionOperator::InRange,
            Condition::Contains(_) => ConditionOperator::Contains,
        }
    }
}

/// Conditional adjustment tied to one factor's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopingRule {
    pub rule_id: RuleId,
    pub package_id: PackageId,
    pub rule_name: String,
    pub factor_key: String,
    pub condition: Condition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_adjustment: Option<PriceAdjustment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline_adjustment_weeks: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjustment_label: Option<String>,
    pub priority: i32,
    pub is_active: bool,
}

/// Single answer element. Text never coerces to a number.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(Decimal),
    Text(String),
    Boolean(bool),
}

/// Buyer answer to one factor.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerValue {
    Number(Decimal),
    Text(String),
    Boolean(bool),
    List(Vec<Scalar>),
}

impl AnswerValue {
    pub fn as_number(&self) -> Option<&Decimal> {
        match self {
            AnswerValue::Number(value) => Some(value),
            _ => None,
        }
    }
}

impl From<Scalar> for AnswerValue {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Number(number) => AnswerValue::Number(number),
            Scalar::Text(text) => AnswerValue::Text(text),
            Scalar::Boolean(flag) => AnswerValue::Boolean(flag),
        }
    }
}

impl From<Decimal> for AnswerValue {
    fn from(value: Decimal) -> Self {
        AnswerValue::Number(value)
    }
}

impl From<i64> for AnswerValue {
    fn from(value: i64) -> Self {
        AnswerValue::Number(Decimal::from(value))
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_string())
    }
}

impl From<bool> for AnswerValue {
    fn from(value: bool) -> Self {
        AnswerValue::Boolean(value)
    }
}

pub(crate) fn decimal_from_json(number: &serde_json::Number) -> Option<Decimal> {
    if let Some(value) = number.as_i64() {
        return Some(Decimal::from(value));
    }
    if let Some(value) = number.as_u64() {
        return Some(Decimal::from(value));
    }
    let value = number.as_f64()?;
    Decimal::from_str(&value.to_string())
        .ok()
        .or_else(|| Decimal::from_f64_retain(value))
}

fn decimal_to_json(value: &Decimal) -> Value {
    if value.fract().is_zero() {
        if let Some(integer) = value.to_i64() {
            return Value::from(integer);
        }
    }
    value
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(value.to_string()))
}

impl TryFrom<Value> for Scalar {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Number(number) => decimal_from_json(&number)
                .map(Scalar::Number)
                .ok_or_else(|| format!("number {number} is outside the decimal range")),
            Value::String(text) => Ok(Scalar::Text(text)),
            Value::Bool(flag) => Ok(Scalar::Boolean(flag)),
            Value::Null => Err("expected a number, string or boolean, found null".to_string()),
            Value::Array(_) => Err("expected a number, string or boolean, found a list".to_string()),
            Value::Object(_) => {
                Err("expected a number, string or boolean, found an object".to_string())
            }
        }
    }
}

impl TryFrom<Value> for AnswerValue {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(Scalar::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(AnswerValue::List),
            other => Scalar::try_from(other).map(AnswerValue::from),
        }
    }
}

impl From<&Scalar> for Value {
    fn from(value: &Scalar) -> Self {
        match value {
            Scalar::Number(number) => decimal_to_json(number),
            Scalar::Text(text) => Value::String(text.clone()),
            Scalar::Boolean(flag) => Value::Bool(*flag),
        }
    }
}

impl From<&AnswerValue> for Value {
    fn from(value: &AnswerValue) -> Self {
        match value {
            AnswerValue::Number(number) => decimal_to_json(number),
            AnswerValue::Text(text) => Value::String(text.clone()),
            AnswerValue::Boolean(flag) => Value::Bool(*flag),
            AnswerValue::List(items) => Value::Array(items.iter().map(Value::from).collect()),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Value::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Scalar::try_from(value).map_err(serde::de::Error::custom)
    }
}

impl Serialize for AnswerValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Value::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AnswerValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        AnswerValue::try_from(value).map_err(serde::de::Error::custom)
    }
}

/// Answers keyed by `factor_key`, supplied fresh for every calculation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopingInputs(BTreeMap<String, AnswerValue>);

impl ScopingInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, factor_key: impl Into<String>, answer: impl Into<AnswerValue>) -> Self {
        self.insert(factor_key, answer);
        self
    }

    pub fn insert(&mut self, factor_key: impl Into<String>, answer: impl Into<AnswerValue>) {
        self.0.insert(factor_key.into(), answer.into());
    }

    pub fn get(&self, factor_key: &str) -> Option<&AnswerValue> {
        self.0.get(factor_key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, AnswerValue>> for ScopingInputs {
    fn from(value: BTreeMap<String, AnswerValue>) -> Self {
        Self(value)
    }
}

impl<K: Into<String>> FromIterator<(K, AnswerValue)> for ScopingInputs {
    fn from_iter<T: IntoIterator<Item = (K, AnswerValue)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(key, value)| (key.into(), value)).collect())
    }
}

/// Trail entry for one matched rule. Deltas, not running totals, so the trail sums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedRule {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub factor_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjustment_label: Option<String>,
    pub price_delta: Decimal,
    pub timeline_delta_weeks: i32,
}

impl AppliedRule {
    pub fn display_label(&self) -> &str {
        self.adjustment_label.as_deref().unwrap_or(&self.rule_name)
    }
}

/// Engine output: the adjusted quote and why it moved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopingCalculationResult {
    pub package_id: PackageId,
    pub base_price: Decimal,
    pub adjusted_price: Decimal,
    pub base_timeline_weeks: u32,
    pub adjusted_timeline_weeks: u32,
    pub applied_rules: Vec<AppliedRule>,
}

impl ScopingCalculationResult {
    /// `None` when the difference is out of decimal range.
    pub fn price_change(&self) -> Option<Decimal> {
        self.adjusted_price.checked_sub(self.base_price)
    }

    pub fn summary(&self) -> String {
        if self.applied_rules.is_empty() {
            return format!(
                "base quote {} over {} week(s)",
                self.adjusted_price, self.adjusted_timeline_weeks
            );
        }

        let labels: Vec<&str> = self
            .applied_rules
            .iter()
            .map(AppliedRule::display_label)
            .collect();
        format!(
            "adjusted quote {} over {} week(s): {}",
            self.adjusted_price,
            self.adjusted_timeline_weeks,
            labels.join(", ")
        )
    }
}
