//! Referrer payment-status update.
//!
//! Only the latest invoice per referrer in an upload decides the final flag
//! value; earlier invoices for the same client are mirror-only noise.

use std::collections::HashMap;

use refpay_core::{ClientId, Entity};
use refpay_imports::InvoiceRecord;
use refpay_infra::ClientStore;
use refpay_parties::{Client, ExternalIdMatcher};

use crate::context::Stores;

/// Set each referrer's `is_payment_current` flag from their most recent
/// invoice in `records`, mirroring status and date. Returns the number of
/// clients updated.
pub fn update_referrer_payment_status(
    records: &[InvoiceRecord],
    stores: &Stores,
    matcher: &ExternalIdMatcher,
) -> u32 {
    let mut latest: HashMap<ClientId, (&InvoiceRecord, Client)> = HashMap::new();

    for record in records.iter().filter(|r| r.is_referrer()) {
        let Some(client) = stores
            .clients
            .find_by_external_id(record.external_client_id(), matcher)
        else {
            continue;
        };

        match latest.get(&client.id()) {
            Some((existing, _)) if existing.issued_at() >= record.issued_at() => {}
            _ => {
                latest.insert(client.id(), (record, client));
            }
        }
    }

    let mut updated = 0;
    for (_, (record, mut client)) in latest {
        client.record_invoice(record.status(), record.issued_at());
        tracing::debug!(
            client_external_id = client.external_id(),
            payment_current = client.is_payment_current(),
            "referrer payment status updated"
        );
        stores.clients.upsert(client);
        updated += 1;
    }

    updated
}
