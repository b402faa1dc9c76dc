//! Commission generation and activation engine.
//!
//! For every paid referral invoice in an upload, generates the next
//! sequential monthly commission — bounded by the policy cap, deduplicated
//! by calendar month, and gated on the referring client's own payment
//! standing. The engine is idempotent against re-uploads: cap and month
//! guards skip silently, and a store-level uniqueness conflict is treated
//! the same way.

use chrono::{DateTime, Utc};

use refpay_commissions::{Commission, CommissionPolicy, MonthKey};
use refpay_core::{CommissionId, DomainError, Entity};
use refpay_imports::InvoiceRecord;
use refpay_infra::{ClientStore, CommissionStore, InvoiceRecordStore, ReferralStore};
use refpay_parties::ExternalIdMatcher;

use crate::context::Stores;

/// Counters produced by one engine run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationOutcome {
    /// Monthly commissions created.
    pub generated: u32,
    /// Subset of `generated` created directly in `Active` status.
    pub activated: u32,
}

/// Run the engine over an upload's records.
///
/// Mutates `records` in place to link matched referrals/commissions and
/// persists every touched entity. Per-record problems land in the returned
/// error list; they never abort the run.
pub fn generate_commissions(
    records: &mut [InvoiceRecord],
    stores: &Stores,
    matcher: &ExternalIdMatcher,
    policy: &CommissionPolicy,
    now: DateTime<Utc>,
) -> (GenerationOutcome, Vec<String>) {
    let mut outcome = GenerationOutcome::default();
    let mut errors = Vec::new();

    for record in records
        .iter_mut()
        .filter(|r| r.is_referral() && r.status().is_paid())
    {
        let Some(mut referral) = stores
            .referrals
            .find_installed_by_external_id(record.external_client_id(), matcher)
        else {
            // Classified earlier in the batch but no longer resolvable
            // (e.g. cancelled between steps): skip, nothing to reconcile.
            continue;
        };

        // Mirror fields update regardless of commission outcome.
        referral.record_invoice(record.status(), record.issued_at());
        stores.referrals.upsert(referral.clone());

        let existing = stores.commissions.list_monthly_by_referral(referral.id());

        if existing.len() as u32 >= policy.months_to_earn() {
            tracing::debug!(
                referral_external_id = record.external_client_id(),
                cap = policy.months_to_earn(),
                "monthly commission cap reached, skipping"
            );
            record.mark_matched(referral.id(), None);
            stores.records.upsert(record.clone());
            continue;
        }

        let month_key = MonthKey::from_date(record.issued_at());
        if existing.iter().any(|c| c.month_key() == Some(month_key)) {
            tracing::debug!(
                referral_external_id = record.external_client_id(),
                %month_key,
                "monthly commission already exists for this month, skipping"
            );
            record.mark_matched(referral.id(), None);
            stores.records.upsert(record.clone());
            continue;
        }

        let Some(mut client) = stores.clients.get(referral.client_id()) else {
            errors.push(format!(
                "Invoice {}: referring client missing for referral {}",
                record.external_invoice_id(),
                referral.id()
            ));
            continue;
        };

        let commission = match Commission::monthly(
            CommissionId::new(),
            client.id(),
            referral.id(),
            existing.len() as u32 + 1,
            record.issued_at(),
            policy.monthly_amount(),
            client.is_payment_current(),
            now,
        ) {
            Ok(commission) => commission,
            Err(e) => {
                errors.push(format!(
                    "Invoice {}: {e}",
                    record.external_invoice_id()
                ));
                continue;
            }
        };

        let created_active = client.is_payment_current();
        match stores.commissions.insert(commission.clone()) {
            Ok(()) => {}
            Err(DomainError::Conflict(_)) => {
                // Lost the race to another writer: already generated.
                record.mark_matched(referral.id(), None);
                stores.records.upsert(record.clone());
                continue;
            }
            Err(e) => {
                errors.push(format!("Invoice {}: {e}", record.external_invoice_id()));
                continue;
            }
        }

        if let Err(e) = credit_client(&mut client, commission.amount(), created_active) {
            errors.push(format!("Invoice {}: {e}", record.external_invoice_id()));
            continue;
        }
        stores.clients.upsert(client);

        record.mark_matched(referral.id(), Some(commission.id()));
        stores.records.upsert(record.clone());

        outcome.generated += 1;
        if created_active {
            outcome.activated += 1;
        }
    }

    (outcome, errors)
}

fn credit_client(
    client: &mut refpay_parties::Client,
    amount: i64,
    created_active: bool,
) -> Result<(), DomainError> {
    client.credit_earned(amount)?;
    if created_active {
        client.credit_active(amount)?;
    }
    Ok(())
}
