//! Commission lifecycle operations.
//!
//! The admin-facing operations around a commission's life: the installation
//! trigger fired when a lead's install completes, applying a commission to
//! an invoice, cancelling it, and the manual activation path for a referrer
//! who settled their balance outside a CSV cycle.

use chrono::{DateTime, Utc};

use refpay_commissions::{Commission, CommissionKind, CommissionPolicy, CommissionStatus};
use refpay_core::{ActorId, ClientId, CommissionId, DomainError, DomainResult, ReferralId};
use refpay_infra::{ClientStore, CommissionStore, ReferralStore};

use crate::context::Stores;

/// Result of bulk-activating a client's earned commissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivationOutcome {
    pub activated: u32,
    /// Sum of activated commission amounts (smallest currency unit).
    pub amount: i64,
}

/// Commission lifecycle service.
pub struct CommissionOps {
    stores: Stores,
    policy: CommissionPolicy,
}

impl CommissionOps {
    pub fn new(stores: Stores, policy: CommissionPolicy) -> Self {
        Self { stores, policy }
    }

    /// Complete a referral's installation and grant the one-time
    /// installation commission.
    ///
    /// Idempotent on the commission side: if the referral is already
    /// installed and its installation commission exists, that commission is
    /// returned unchanged.
    pub fn complete_installation(
        &self,
        referral_id: ReferralId,
        external_id: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<Commission> {
        let mut referral = self
            .stores
            .referrals
            .get(referral_id)
            .ok_or_else(|| DomainError::not_found(format!("referral {referral_id}")))?;

        if !referral.is_installed() {
            referral.complete_installation(external_id, at)?;
            self.stores.referrals.upsert(referral.clone());
            tracing::info!(%referral_id, external_id, "referral installation completed");
        }

        self.grant_installation_commission(referral_id, at)
    }

    /// Grant the installation commission for an installed referral
    /// (idempotent).
    pub fn grant_installation_commission(
        &self,
        referral_id: ReferralId,
        at: DateTime<Utc>,
    ) -> DomainResult<Commission> {
        let referral = self
            .stores
            .referrals
            .get(referral_id)
            .ok_or_else(|| DomainError::not_found(format!("referral {referral_id}")))?;

        if !referral.is_installed() {
            return Err(DomainError::invariant(
                "referral must be installed to earn an installation commission",
            ));
        }

        if let Some(existing) = self
            .stores
            .commissions
            .find_by_referral_and_kind(referral_id, CommissionKind::Installation)
        {
            return Ok(existing);
        }

        let commission = Commission::installation(
            CommissionId::new(),
            referral.client_id(),
            referral_id,
            self.policy.installation_amount(),
            at,
        )?;

        match self.stores.commissions.insert(commission.clone()) {
            Ok(()) => {}
            Err(DomainError::Conflict(_)) => {
                // Raced another grant: return whichever one landed.
                return self
                    .stores
                    .commissions
                    .find_by_referral_and_kind(referral_id, CommissionKind::Installation)
                    .ok_or_else(|| {
                        DomainError::not_found(format!(
                            "installation commission for referral {referral_id}"
                        ))
                    });
            }
            Err(e) => return Err(e),
        }

        let mut client = self
            .stores
            .clients
            .get(referral.client_id())
            .ok_or_else(|| {
                DomainError::not_found(format!("client {}", referral.client_id()))
            })?;
        client.credit_earned(commission.amount())?;
        self.stores.clients.upsert(client);

        tracing::info!(%referral_id, amount = commission.amount(), "installation commission granted");
        Ok(commission)
    }

    /// Apply an active commission against an external invoice.
    ///
    /// `amount` defaults to the full commission amount.
    pub fn apply_to_invoice(
        &self,
        commission_id: CommissionId,
        invoice_id: &str,
        amount: Option<i64>,
        applied_by: ActorId,
        at: DateTime<Utc>,
    ) -> DomainResult<Commission> {
        let mut commission = self
            .stores
            .commissions
            .get(commission_id)
            .ok_or_else(|| DomainError::not_found(format!("commission {commission_id}")))?;

        let applied = commission.apply_to_invoice(invoice_id, amount, at, applied_by)?;
        self.stores.commissions.update(commission.clone())?;

        let mut client = self
            .stores
            .clients
            .get(commission.client_id())
            .ok_or_else(|| {
                DomainError::not_found(format!("client {}", commission.client_id()))
            })?;
        client.debit_active(commission.amount())?;
        client.credit_applied(applied)?;
        self.stores.clients.upsert(client);

        tracing::info!(%commission_id, invoice_id, applied, "commission applied to invoice");
        Ok(commission)
    }

    /// Cancel a non-terminal commission with an audit reason.
    pub fn cancel(&self, commission_id: CommissionId, reason: &str) -> DomainResult<Commission> {
        let mut commission = self
            .stores
            .commissions
            .get(commission_id)
            .ok_or_else(|| DomainError::not_found(format!("commission {commission_id}")))?;

        let was_active = commission.status() == CommissionStatus::Active;
        commission.cancel(reason)?;
        self.stores.commissions.update(commission.clone())?;

        let mut client = self
            .stores
            .clients
            .get(commission.client_id())
            .ok_or_else(|| {
                DomainError::not_found(format!("client {}", commission.client_id()))
            })?;
        client.debit_earned(commission.amount())?;
        if was_active {
            client.debit_active(commission.amount())?;
        }
        self.stores.clients.upsert(client);

        tracing::info!(%commission_id, reason, "commission cancelled");
        Ok(commission)
    }

    /// Manual remediation: a referrer settled their balance outside of a CSV
    /// cycle. Marks the client payment-current and activates every earned
    /// commission. Running it again is a no-op.
    pub fn mark_client_payment_received(
        &self,
        client_id: ClientId,
    ) -> DomainResult<ActivationOutcome> {
        let mut client = self
            .stores
            .clients
            .get(client_id)
            .ok_or_else(|| DomainError::not_found(format!("client {client_id}")))?;

        client.mark_payment_current();

        let mut outcome = ActivationOutcome::default();
        for mut commission in self.stores.commissions.list_earned_by_client(client_id) {
            commission.activate()?;
            self.stores.commissions.update(commission.clone())?;
            outcome.activated += 1;
            outcome.amount = outcome
                .amount
                .checked_add(commission.amount())
                .ok_or_else(|| DomainError::invariant("activated amount overflow"))?;
        }

        client.credit_active(outcome.amount)?;
        self.stores.clients.upsert(client);

        tracing::info!(
            %client_id,
            activated = outcome.activated,
            amount = outcome.amount,
            "earned commissions activated on payment"
        );
        Ok(outcome)
    }
}
