use {
    super::error::ReconcileError,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Amount in minor units. The gateway reports decimals (`149.90`); we keep
/// cents so snapshots compare exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoneyAmount(i64);

impl MoneyAmount {
    pub fn new(cents: i64) -> Result<Self, ReconcileError> {
        if cents < 0 {
            return Err(ReconcileError::Validation(format!(
                "MoneyAmount cannot be negative, got: {cents}"
            )));
        }
        Ok(Self(cents))
    }

    pub fn from_decimal(amount: f64) -> Result<Self, ReconcileError> {
        if !amount.is_finite() {
            return Err(ReconcileError::Validation(format!(
                "MoneyAmount must be finite, got: {amount}"
            )));
        }
        let cents = (amount * 100.0).round();
        if cents > i64::MAX as f64 {
            return Err(ReconcileError::Validation(format!(
                "MoneyAmount out of range: {amount}"
            )));
        }
        Self::new(cents as i64)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}
