use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use refpay_core::{ActorId, ClientId, CommissionId, DomainError, Entity, ReferralId};

/// Status reason recorded on commissions generated while the referring
/// client is behind on their own payments.
pub const REFERRER_NOT_CURRENT_REASON: &str = "referring client is not current on payments";

/// Commission kind: one-time installation credit or recurring monthly credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommissionKind {
    Installation,
    Monthly,
}

/// Commission status lifecycle.
///
/// `Pending → Earned → Active → Applied` (terminal), with `Cancelled`
/// (terminal) reachable from any non-terminal state. `Earned → Active` is
/// driven only by the referrer's payment standing, never by time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommissionStatus {
    Pending,
    Earned,
    Active,
    Applied,
    Cancelled,
}

/// Calendar-month identity of a monthly commission (deduplication unit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn from_date(date: DateTime<Utc>) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl core::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// A commission owed to a referring client for one of its referrals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commission {
    id: CommissionId,
    client_id: ClientId,
    referral_id: ReferralId,
    kind: CommissionKind,
    /// 1-based sequence among the referral's monthly commissions.
    month_number: Option<u32>,
    /// Invoice date the monthly commission was generated from.
    month_date: Option<DateTime<Utc>>,
    /// Amount in smallest currency unit (e.g., cents).
    amount: i64,
    status: CommissionStatus,
    status_reason: Option<String>,
    applied_invoice_id: Option<String>,
    applied_amount: Option<i64>,
    applied_at: Option<DateTime<Utc>>,
    applied_by: Option<ActorId>,
    created_at: DateTime<Utc>,
}

impl Commission {
    /// One-time installation commission, granted when a referral's install
    /// completes. Always starts `Earned`; it activates through the
    /// referrer's payment path.
    pub fn installation(
        id: CommissionId,
        client_id: ClientId,
        referral_id: ReferralId,
        amount: i64,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if amount <= 0 {
            return Err(DomainError::validation("commission amount must be positive"));
        }

        Ok(Self {
            id,
            client_id,
            referral_id,
            kind: CommissionKind::Installation,
            month_number: None,
            month_date: None,
            amount,
            status: CommissionStatus::Earned,
            status_reason: None,
            applied_invoice_id: None,
            applied_amount: None,
            applied_at: None,
            applied_by: None,
            created_at,
        })
    }

    /// Recurring monthly commission generated from a paid referral invoice.
    ///
    /// Starts `Active` when the referring client is current on payments at
    /// generation time, `Earned` with a status reason otherwise.
    pub fn monthly(
        id: CommissionId,
        client_id: ClientId,
        referral_id: ReferralId,
        month_number: u32,
        month_date: DateTime<Utc>,
        amount: i64,
        referrer_is_current: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if amount <= 0 {
            return Err(DomainError::validation("commission amount must be positive"));
        }
        if month_number == 0 {
            return Err(DomainError::validation("month number is 1-based"));
        }

        let (status, status_reason) = if referrer_is_current {
            (CommissionStatus::Active, None)
        } else {
            (
                CommissionStatus::Earned,
                Some(REFERRER_NOT_CURRENT_REASON.to_string()),
            )
        };

        Ok(Self {
            id,
            client_id,
            referral_id,
            kind: CommissionKind::Monthly,
            month_number: Some(month_number),
            month_date: Some(month_date),
            amount,
            status,
            status_reason,
            applied_invoice_id: None,
            applied_amount: None,
            applied_at: None,
            applied_by: None,
            created_at,
        })
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn referral_id(&self) -> ReferralId {
        self.referral_id
    }

    pub fn kind(&self) -> CommissionKind {
        self.kind
    }

    pub fn month_number(&self) -> Option<u32> {
        self.month_number
    }

    pub fn month_date(&self) -> Option<DateTime<Utc>> {
        self.month_date
    }

    /// Calendar month key of a monthly commission (None for installation).
    pub fn month_key(&self) -> Option<MonthKey> {
        self.month_date.map(MonthKey::from_date)
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn status(&self) -> CommissionStatus {
        self.status
    }

    pub fn status_reason(&self) -> Option<&str> {
        self.status_reason.as_deref()
    }

    pub fn applied_invoice_id(&self) -> Option<&str> {
        self.applied_invoice_id.as_deref()
    }

    pub fn applied_amount(&self) -> Option<i64> {
        self.applied_amount
    }

    pub fn applied_at(&self) -> Option<DateTime<Utc>> {
        self.applied_at
    }

    pub fn applied_by(&self) -> Option<ActorId> {
        self.applied_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Amount not yet consumed by an application (partial applies leave a
    /// remainder).
    pub fn remaining_amount(&self) -> i64 {
        self.amount - self.applied_amount.unwrap_or(0)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            CommissionStatus::Applied | CommissionStatus::Cancelled
        )
    }

    /// Transition `Earned → Active` (the referrer became payment-current).
    pub fn activate(&mut self) -> Result<(), DomainError> {
        if self.status != CommissionStatus::Earned {
            return Err(DomainError::invariant(
                "commission must be earned to be activated",
            ));
        }
        self.status = CommissionStatus::Active;
        self.status_reason = None;
        Ok(())
    }

    /// Apply the commission against an invoice. Valid only from `Active`.
    ///
    /// `amount` defaults to the full commission amount; a partial amount
    /// must be positive and no greater than the commission amount. Returns
    /// the amount actually applied.
    pub fn apply_to_invoice(
        &mut self,
        invoice_id: impl Into<String>,
        amount: Option<i64>,
        at: DateTime<Utc>,
        by: ActorId,
    ) -> Result<i64, DomainError> {
        if self.status != CommissionStatus::Active {
            return Err(DomainError::invariant(
                "commission must be active to be applied to an invoice",
            ));
        }

        let invoice_id = invoice_id.into();
        if invoice_id.trim().is_empty() {
            return Err(DomainError::validation("invoice id cannot be empty"));
        }

        let applied = amount.unwrap_or(self.amount);
        if applied <= 0 {
            return Err(DomainError::validation("applied amount must be positive"));
        }
        if applied > self.amount {
            return Err(DomainError::validation(
                "applied amount cannot exceed the commission amount",
            ));
        }

        self.status = CommissionStatus::Applied;
        self.applied_invoice_id = Some(invoice_id);
        self.applied_amount = Some(applied);
        self.applied_at = Some(at);
        self.applied_by = Some(by);
        Ok(applied)
    }

    /// Cancel a non-terminal commission with a mandatory audit reason.
    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(DomainError::validation("cancellation reason is required"));
        }

        match self.status {
            CommissionStatus::Pending | CommissionStatus::Earned | CommissionStatus::Active => {
                self.status = CommissionStatus::Cancelled;
                self.status_reason = Some(reason);
                Ok(())
            }
            CommissionStatus::Applied => Err(DomainError::invariant(
                "applied commission is terminal and cannot be cancelled",
            )),
            CommissionStatus::Cancelled => {
                Err(DomainError::conflict("commission is already cancelled"))
            }
        }
    }
}

impl Entity for Commission {
    type Id = CommissionId;

    fn id(&self) -> CommissionId {
        self.id
    }
}
