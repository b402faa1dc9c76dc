use serde::{Deserialize, Serialize};

use refpay_core::DomainError;

/// Commission configuration, sourced once by the host and passed into the
/// reconciliation services at build time.
///
/// Amounts are in smallest currency unit (e.g., cents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionPolicy {
    installation_amount: i64,
    monthly_amount: i64,
    months_to_earn: u32,
    currency: String,
}

impl CommissionPolicy {
    pub fn new(
        installation_amount: i64,
        monthly_amount: i64,
        months_to_earn: u32,
        currency: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let currency = currency.into();

        if installation_amount <= 0 || monthly_amount <= 0 {
            return Err(DomainError::validation(
                "commission amounts must be positive",
            ));
        }
        if months_to_earn == 0 {
            return Err(DomainError::validation("months to earn must be at least 1"));
        }
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(DomainError::validation(
                "currency must be a 3-letter ISO code",
            ));
        }

        Ok(Self {
            installation_amount,
            monthly_amount,
            months_to_earn,
            currency,
        })
    }

    pub fn installation_amount(&self) -> i64 {
        self.installation_amount
    }

    pub fn monthly_amount(&self) -> i64 {
        self.monthly_amount
    }

    /// Cap on the number of monthly commissions a single referral earns.
    pub fn months_to_earn(&self) -> u32 {
        self.months_to_earn
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_policy_is_accepted() {
        let policy = CommissionPolicy::new(300_00, 150_00, 6, "MXN").unwrap();
        assert_eq!(policy.installation_amount(), 300_00);
        assert_eq!(policy.monthly_amount(), 150_00);
        assert_eq!(policy.months_to_earn(), 6);
        assert_eq!(policy.currency(), "MXN");
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        assert!(CommissionPolicy::new(0, 150_00, 6, "MXN").is_err());
        assert!(CommissionPolicy::new(300_00, -1, 6, "MXN").is_err());
    }

    #[test]
    fn zero_months_to_earn_is_rejected() {
        let err = CommissionPolicy::new(300_00, 150_00, 0, "MXN").unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("months to earn") => {}
            _ => panic!("Expected Validation error for zero cap"),
        }
    }

    #[test]
    fn malformed_currency_is_rejected() {
        assert!(CommissionPolicy::new(300_00, 150_00, 6, "mxn").is_err());
        assert!(CommissionPolicy::new(300_00, 150_00, 6, "PESO").is_err());
    }
}

