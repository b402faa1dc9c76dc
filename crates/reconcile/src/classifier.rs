//! Invoice record classification.
//!
//! Each parsed row is checked against known referrers and installed
//! referrals; the outcome is persisted as one `InvoiceRecord` per row under
//! the current upload. A row may match neither, either, or (rarely) both.

use refpay_core::{InvoiceRecordId, UploadId};
use refpay_imports::{InvoiceRecord, ParsedInvoiceRow};
use refpay_infra::{ClientStore, InvoiceRecordStore, ReferralStore};
use refpay_parties::ExternalIdMatcher;

use crate::context::Stores;

/// Classify rows and persist one invoice record per row.
///
/// Classification never aborts the batch; rows that match nothing are still
/// persisted (unclassified) for audit.
pub fn classify_and_store_rows(
    rows: &[ParsedInvoiceRow],
    upload_id: UploadId,
    stores: &Stores,
    matcher: &ExternalIdMatcher,
) -> Vec<InvoiceRecord> {
    let mut records = Vec::with_capacity(rows.len());

    for row in rows {
        let is_referrer = stores
            .clients
            .find_by_external_id(&row.service_id, matcher)
            .is_some();
        let is_referral = stores
            .referrals
            .find_installed_by_external_id(&row.service_id, matcher)
            .is_some();

        let record =
            InvoiceRecord::from_row(InvoiceRecordId::new(), upload_id, row, is_referrer, is_referral);
        stores.records.upsert(record.clone());
        records.push(record);
    }

    records
}
