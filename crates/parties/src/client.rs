use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use refpay_core::{ClientId, DomainError, Entity};

use crate::payment::PaymentStatus;

/// Contact information for a client or referral.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A referring client: an existing subscriber who refers leads and earns
/// commissions on them.
///
/// `external_id` is the subscriber id in the external billing system and is
/// what invoice CSV rows are matched against. The running totals are
/// denormalized sums over the client's commissions (earned = non-cancelled,
/// active = currently applicable, applied = already consumed against
/// invoices); every mutation path keeps them reconcilable with a fresh
/// aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    id: ClientId,
    external_id: String,
    referral_code: String,
    name: String,
    contact: ContactInfo,
    is_payment_current: bool,
    last_invoice_status: Option<PaymentStatus>,
    last_invoice_date: Option<DateTime<Utc>>,
    total_earned: i64,
    total_active: i64,
    total_applied: i64,
    created_at: DateTime<Utc>,
}

impl Client {
    /// Register a new referrer.
    pub fn new(
        id: ClientId,
        external_id: impl Into<String>,
        referral_code: impl Into<String>,
        name: impl Into<String>,
        contact: ContactInfo,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let external_id = external_id.into();
        let referral_code = referral_code.into();
        let name = name.into();

        if external_id.trim().is_empty() {
            return Err(DomainError::validation("external id cannot be empty"));
        }
        if referral_code.trim().is_empty() {
            return Err(DomainError::validation("referral code cannot be empty"));
        }
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(Self {
            id,
            external_id,
            referral_code,
            name,
            contact,
            is_payment_current: false,
            last_invoice_status: None,
            last_invoice_date: None,
            total_earned: 0,
            total_active: 0,
            total_applied: 0,
            created_at,
        })
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn referral_code(&self) -> &str {
        &self.referral_code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    /// Whether the client is current on their own subscription payments.
    ///
    /// This is the gate that decides whether newly generated commissions for
    /// this client start `Active` or stay `Earned`.
    pub fn is_payment_current(&self) -> bool {
        self.is_payment_current
    }

    pub fn last_invoice_status(&self) -> Option<PaymentStatus> {
        self.last_invoice_status
    }

    pub fn last_invoice_date(&self) -> Option<DateTime<Utc>> {
        self.last_invoice_date
    }

    pub fn total_earned(&self) -> i64 {
        self.total_earned
    }

    pub fn total_active(&self) -> i64 {
        self.total_active
    }

    pub fn total_applied(&self) -> i64 {
        self.total_applied
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Record the client's own latest reconciled invoice.
    ///
    /// Sets the payment-current flag from the normalized status and mirrors
    /// status/date for display.
    pub fn record_invoice(&mut self, status: PaymentStatus, date: DateTime<Utc>) {
        self.is_payment_current = status.is_paid();
        self.last_invoice_status = Some(status);
        self.last_invoice_date = Some(date);
    }

    /// Mark the client payment-current outside of a CSV cycle (manual
    /// remediation path).
    pub fn mark_payment_current(&mut self) {
        self.is_payment_current = true;
    }

    /// Increase lifetime earned total (commission created).
    pub fn credit_earned(&mut self, amount: i64) -> Result<(), DomainError> {
        self.total_earned = checked_add(self.total_earned, amount, "total_earned")?;
        Ok(())
    }

    /// Decrease lifetime earned total (commission cancelled).
    pub fn debit_earned(&mut self, amount: i64) -> Result<(), DomainError> {
        self.total_earned = checked_sub(self.total_earned, amount, "total_earned")?;
        Ok(())
    }

    /// Increase active total (commission became applicable).
    pub fn credit_active(&mut self, amount: i64) -> Result<(), DomainError> {
        self.total_active = checked_add(self.total_active, amount, "total_active")?;
        Ok(())
    }

    /// Decrease active total (commission applied or cancelled).
    pub fn debit_active(&mut self, amount: i64) -> Result<(), DomainError> {
        self.total_active = checked_sub(self.total_active, amount, "total_active")?;
        Ok(())
    }

    /// Increase applied total (commission consumed against an invoice).
    pub fn credit_applied(&mut self, amount: i64) -> Result<(), DomainError> {
        self.total_applied = checked_add(self.total_applied, amount, "total_applied")?;
        Ok(())
    }
}

impl Entity for Client {
    type Id = ClientId;

    fn id(&self) -> ClientId {
        self.id
    }
}

fn checked_add(total: i64, amount: i64, field: &str) -> Result<i64, DomainError> {
    if amount < 0 {
        return Err(DomainError::validation(format!(
            "{field} adjustment must be non-negative"
        )));
    }
    total
        .checked_add(amount)
        .ok_or_else(|| DomainError::invariant(format!("{field} overflow")))
}

fn checked_sub(total: i64, amount: i64, field: &str) -> Result<i64, DomainError> {
    if amount < 0 {
        return Err(DomainError::validation(format!(
            "{field} adjustment must be non-negative"
        )));
    }
    let next = total
        .checked_sub(amount)
        .ok_or_else(|| DomainError::invariant(format!("{field} overflow")))?;
    if next < 0 {
        return Err(DomainError::invariant(format!(
            "{field} cannot go negative"
        )));
    }
    Ok(next)
}
