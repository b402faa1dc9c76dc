use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use refpay_core::{CommissionId, Entity, InvoiceRecordId, ReferralId, UploadId};
use refpay_parties::PaymentStatus;

use crate::parser::ParsedInvoiceRow;

/// One classified invoice row persisted under an upload.
///
/// A row may match a referrer, an installed referral, both (rare), or
/// neither; the classification flags record the outcome. When the
/// commission engine generates a commission from this record the matched
/// links are filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    id: InvoiceRecordId,
    upload_id: UploadId,
    external_client_id: String,
    external_invoice_id: String,
    client_name: String,
    issued_at: DateTime<Utc>,
    due_at: DateTime<Utc>,
    /// Amount in smallest currency unit (e.g., cents).
    amount: i64,
    status: PaymentStatus,
    in_review: bool,
    is_referrer: bool,
    is_referral: bool,
    matched_referral_id: Option<ReferralId>,
    matched_commission_id: Option<CommissionId>,
}

impl InvoiceRecord {
    /// Build a record from a parsed row plus its classification flags.
    pub fn from_row(
        id: InvoiceRecordId,
        upload_id: UploadId,
        row: &ParsedInvoiceRow,
        is_referrer: bool,
        is_referral: bool,
    ) -> Self {
        Self {
            id,
            upload_id,
            external_client_id: row.service_id.clone(),
            external_invoice_id: row.invoice_number.clone(),
            client_name: row.client_name.clone(),
            issued_at: row.issued_at,
            due_at: row.due_at,
            amount: row.amount,
            status: row.status,
            in_review: row.in_review,
            is_referrer,
            is_referral,
            matched_referral_id: None,
            matched_commission_id: None,
        }
    }

    pub fn upload_id(&self) -> UploadId {
        self.upload_id
    }

    pub fn external_client_id(&self) -> &str {
        &self.external_client_id
    }

    pub fn external_invoice_id(&self) -> &str {
        &self.external_invoice_id
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn due_at(&self) -> DateTime<Utc> {
        self.due_at
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn in_review(&self) -> bool {
        self.in_review
    }

    pub fn is_referrer(&self) -> bool {
        self.is_referrer
    }

    pub fn is_referral(&self) -> bool {
        self.is_referral
    }

    pub fn matched_referral_id(&self) -> Option<ReferralId> {
        self.matched_referral_id
    }

    pub fn matched_commission_id(&self) -> Option<CommissionId> {
        self.matched_commission_id
    }

    /// Link the record to the referral (and commission, when one was
    /// generated) it reconciled against.
    pub fn mark_matched(&mut self, referral_id: ReferralId, commission_id: Option<CommissionId>) {
        self.matched_referral_id = Some(referral_id);
        if commission_id.is_some() {
            self.matched_commission_id = commission_id;
        }
    }
}

impl Entity for InvoiceRecord {
    type Id = InvoiceRecordId;

    fn id(&self) -> InvoiceRecordId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_row() -> ParsedInvoiceRow {
        ParsedInvoiceRow {
            row: 1,
            invoice_number: "FAC-100".to_string(),
            client_name: "Maria Lopez".to_string(),
            service_id: "SVC-1001".to_string(),
            issued_at: Utc::now(),
            due_at: Utc::now(),
            status: PaymentStatus::Paid,
            in_review: false,
            amount: 125_000,
        }
    }

    #[test]
    fn from_row_copies_fields_and_flags() {
        let upload_id = UploadId::new();
        let record =
            InvoiceRecord::from_row(InvoiceRecordId::new(), upload_id, &test_row(), true, false);
        assert_eq!(record.upload_id(), upload_id);
        assert_eq!(record.external_client_id(), "SVC-1001");
        assert_eq!(record.external_invoice_id(), "FAC-100");
        assert!(record.is_referrer());
        assert!(!record.is_referral());
        assert_eq!(record.matched_referral_id(), None);
    }

    #[test]
    fn mark_matched_keeps_existing_commission_link() {
        let mut record = InvoiceRecord::from_row(
            InvoiceRecordId::new(),
            UploadId::new(),
            &test_row(),
            false,
            true,
        );
        let referral_id = ReferralId::new();
        let commission_id = CommissionId::new();

        record.mark_matched(referral_id, Some(commission_id));
        assert_eq!(record.matched_commission_id(), Some(commission_id));

        // A later mirror-only match must not clear the commission link.
        record.mark_matched(referral_id, None);
        assert_eq!(record.matched_commission_id(), Some(commission_id));
    }
}

