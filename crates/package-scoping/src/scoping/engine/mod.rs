mod adjustment;
mod condition;
mod config;

pub use adjustment::{apply as apply_adjustment, Accumulator, AdjustmentOverflow};
pub use condition::evaluate as evaluate_condition;
pub use config::{EngineConfig, DEFAULT_CURRENCY_SCALE};

use rust_decimal::Decimal;
use tracing::debug;

use super::domain::{
    AppliedRule, PackageBaseline, PackageId, RuleId, ScopingCalculationResult, ScopingInputs,
    ScopingRule,
};

/// Configuration problems that reject a calculation outright.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopingError {
    #[error("package {0} not found")]
    PackageNotFound(PackageId),
    #[error("rule {rule_id} belongs to package {rule_package}, not {package_id}")]
    ForeignRule {
        rule_id: RuleId,
        rule_package: PackageId,
        package_id: PackageId,
    },
    #[error("rule {rule_id} could not be applied: {source}")]
    Overflow {
        rule_id: RuleId,
        #[source]
        source: AdjustmentOverflow,
    },
}

/// Stateless engine folding matched rules into a package baseline.
#[derive(Debug, Clone, Default)]
pub struct ScopingEngine {
    config: EngineConfig,
}

impl ScopingEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Price a package against one set of answers.
    ///
    /// Active rules run in ascending priority; ties keep the order they were
    /// supplied in. A rule whose factor has no answer is skipped. Any
    /// configuration error aborts the whole calculation.
    pub fn calculate(
        &self,
        baseline: &PackageBaseline,
        rules: &[ScopingRule],
        inputs: &ScopingInputs,
    ) -> Result<ScopingCalculationResult, ScopingError> {
        let mut ordered: Vec<&ScopingRule> = rules.iter().filter(|rule| rule.is_active).collect();
        ordered.sort_by_key(|rule| rule.priority);

        let mut accumulator = Accumulator::from_baseline(baseline);
        let mut applied_rules = Vec::new();

        for rule in ordered {
            if rule.package_id != baseline.package_id {
                return Err(ScopingError::ForeignRule {
                    rule_id: rule.rule_id.clone(),
                    rule_package: rule.package_id.clone(),
                    package_id: baseline.package_id.clone(),
                });
            }

            let Some(answer) = inputs.get(&rule.factor_key) else {
                continue;
            };
            if !evaluate_condition(answer, &rule.condition) {
                continue;
            }

            let overflow = |source: AdjustmentOverflow| ScopingError::Overflow {
                rule_id: rule.rule_id.clone(),
                source,
            };
            let next = apply_adjustment(
                accumulator,
                rule.price_adjustment.as_ref(),
                rule.timeline_adjustment_weeks,
            )
            .map_err(overflow)?;

            let price_delta = match &rule.price_adjustment {
                Some(adjustment) => next
                    .price
                    .checked_sub(accumulator.price)
                    .ok_or(AdjustmentOverflow {
                        kind: adjustment.kind,
                        amount: adjustment.amount,
                    })
                    .map_err(overflow)?,
                None => Decimal::ZERO,
            };
            let timeline_delta_weeks = rule.timeline_adjustment_weeks.unwrap_or(0);

            debug!(
                rule_id = %rule.rule_id,
                factor_key = %rule.factor_key,
                operator = rule.condition.operator().label(),
                %price_delta,
                timeline_delta_weeks,
                "scoping rule matched"
            );

            applied_rules.push(AppliedRule {
                rule_id: rule.rule_id.clone(),
                rule_name: rule.rule_name.clone(),
                factor_key: rule.factor_key.clone(),
                adjustment_label: rule.adjustment_label.clone(),
                price_delta,
                timeline_delta_weeks,
            });
            accumulator = next;
        }

        Ok(ScopingCalculationResult {
            package_id: baseline.package_id.clone(),
            base_price: baseline.base_price,
            adjusted_price: accumulator.rounded_price(self.config.currency_scale),
            base_timeline_weeks: baseline.timeline_weeks(),
            adjusted_timeline_weeks: accumulator.clamped_timeline(),
            applied_rules,
        })
    }
}
