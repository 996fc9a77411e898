use serde::{Deserialize, Serialize};

/// Decimal places of the currency's minimum unit (cents).
pub const DEFAULT_CURRENCY_SCALE: u32 = 2;

/// Rounding settings applied to the final adjusted price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub currency_scale: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            currency_scale: DEFAULT_CURRENCY_SCALE,
        }
    }
}
