use rust_decimal::Decimal;

use super::domain::{AnswerValue, FactorInputType, Scalar, ScopingFactor, ScopingInputs};

/// Answer problems caught before the engine runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnswerViolation {
    #[error("required factor '{factor_key}' was not answered")]
    MissingRequired { factor_key: String },
    #[error("factor '{factor_key}' expects a {} answer", .expected.label())]
    TypeMismatch {
        factor_key: String,
        expected: FactorInputType,
    },
    #[error("'{value}' is not an option for factor '{factor_key}'")]
    UnknownOption { factor_key: String, value: String },
    #[error("{value} is outside {min}..={max} for factor '{factor_key}'")]
    OutOfRange {
        factor_key: String,
        value: Decimal,
        min: Decimal,
        max: Decimal,
    },
}

/// Check buyer answers against the package's active factors.
///
/// Answers for unknown or inactive factors are left alone; the engine
/// simply never matches them.
pub fn validate_answers(
    factors: &[ScopingFactor],
    inputs: &ScopingInputs,
) -> Result<(), AnswerViolation> {
    for factor in factors.iter().filter(|factor| factor.is_active) {
        match inputs.get(&factor.factor_key) {
            Some(answer) => check_answer(factor, answer)?,
            None if factor.is_required => {
                return Err(AnswerViolation::MissingRequired {
                    factor_key: factor.factor_key.clone(),
                })
            }
            None => {}
        }
    }
    Ok(())
}

fn check_answer(factor: &ScopingFactor, answer: &AnswerValue) -> Result<(), AnswerViolation> {
    let mismatch = || AnswerViolation::TypeMismatch {
        factor_key: factor.factor_key.clone(),
        expected: factor.input_type,
    };

    match factor.input_type {
        FactorInputType::Select => match answer {
            AnswerValue::Text(value) => check_option(factor, value),
            AnswerValue::List(items) => items.iter().try_for_each(|item| match item {
                Scalar::Text(value) => check_option(factor, value),
                _ => Err(mismatch()),
            }),
            _ => Err(mismatch()),
        },
        FactorInputType::Number => answer.as_number().map(|_| ()).ok_or_else(mismatch),
        FactorInputType::Boolean => match answer {
            AnswerValue::Boolean(_) => Ok(()),
            _ => Err(mismatch()),
        },
        FactorInputType::Range => {
            let value = answer.as_number().ok_or_else(mismatch)?;
            match &factor.range {
                Some(range) if !range.contains(value) => Err(AnswerViolation::OutOfRange {
                    factor_key: factor.factor_key.clone(),
                    value: *value,
                    min: range.min,
                    max: range.max,
                }),
                _ => Ok(()),
            }
        }
    }
}

fn check_option(factor: &ScopingFactor, value: &str) -> Result<(), AnswerViolation> {
    if factor.options.is_empty() || factor.options.iter().any(|option| option.value == value) {
        Ok(())
    } else {
        Err(AnswerViolation::UnknownOption {
            factor_key: factor.factor_key.clone(),
            value: value.to_string(),
        })
    }
}
