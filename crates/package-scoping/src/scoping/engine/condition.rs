use super::super::domain::{AnswerValue, Condition, Scalar};

/// Match one answer against a rule condition.
///
/// Shape mismatches are a soft "no match": a text answer never satisfies a
/// numeric comparison and a boolean never contains anything.
pub fn evaluate(answer: &AnswerValue, condition: &Condition) -> bool {
    match condition {
        Condition::Equals(expected) => equals(answer, expected),
        Condition::GreaterThan(threshold) => answer
            .as_number()
            .map_or(false, |value| value > threshold),
        Condition::LessThan(threshold) => answer
            .as_number()
            .map_or(false, |value| value < threshold),
        Condition::InRange { min, max } => answer
            .as_number()
            .map_or(false, |value| min <= value && value <= max),
        Condition::Contains(needle) => contains(answer, needle),
    }
}

fn equals(answer: &AnswerValue, expected: &Scalar) -> bool {
    match (answer, expected) {
        (AnswerValue::Number(value), Scalar::Number(expected)) => value == expected,
        (AnswerValue::Text(value), Scalar::Text(expected)) => value == expected,
        (AnswerValue::Boolean(value), Scalar::Boolean(expected)) => value == expected,
        _ => false,
    }
}

fn contains(answer: &AnswerValue, needle: &Scalar) -> bool {
    match (answer, needle) {
        (AnswerValue::Text(haystack), Scalar::Text(needle)) => haystack.contains(needle.as_str()),
        (AnswerValue::List(items), needle) => items.contains(needle),
        _ => false,
    }
}
