use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use refpay_core::{ActorId, Entity, UploadId};

/// Aggregate statistics for one processed upload.
///
/// This is the payload shape the admin UI consumes; field names are part of
/// the contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadStats {
    pub total_invoices: u32,
    pub referrer_invoices: u32,
    pub referral_invoices: u32,
    pub commissions_generated: u32,
    pub commissions_activated: u32,
    pub errors: Vec<String>,
}

/// Result of processing (or reprocessing) one upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub upload_id: UploadId,
    pub stats: UploadStats,
}

/// Audit record for one invoice CSV import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceUpload {
    id: UploadId,
    uploaded_by: ActorId,
    source_file: String,
    period_start: Option<DateTime<Utc>>,
    period_end: Option<DateTime<Utc>>,
    total_invoices: u32,
    paid_invoices: u32,
    pending_invoices: u32,
    referrer_invoices: u32,
    referral_invoices: u32,
    commissions_generated: u32,
    commissions_activated: u32,
    errors: Vec<String>,
    processed: bool,
    processed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl InvoiceUpload {
    pub fn new(
        id: UploadId,
        uploaded_by: ActorId,
        source_file: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            uploaded_by,
            source_file: source_file.into(),
            period_start: None,
            period_end: None,
            total_invoices: 0,
            paid_invoices: 0,
            pending_invoices: 0,
            referrer_invoices: 0,
            referral_invoices: 0,
            commissions_generated: 0,
            commissions_activated: 0,
            errors: Vec::new(),
            processed: false,
            processed_at: None,
            created_at,
        }
    }

    pub fn uploaded_by(&self) -> ActorId {
        self.uploaded_by
    }

    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    pub fn period_start(&self) -> Option<DateTime<Utc>> {
        self.period_start
    }

    pub fn period_end(&self) -> Option<DateTime<Utc>> {
        self.period_end
    }

    pub fn total_invoices(&self) -> u32 {
        self.total_invoices
    }

    pub fn paid_invoices(&self) -> u32 {
        self.paid_invoices
    }

    pub fn pending_invoices(&self) -> u32 {
        self.pending_invoices
    }

    pub fn referrer_invoices(&self) -> u32 {
        self.referrer_invoices
    }

    pub fn referral_invoices(&self) -> u32 {
        self.referral_invoices
    }

    pub fn commissions_generated(&self) -> u32 {
        self.commissions_generated
    }

    pub fn commissions_activated(&self) -> u32 {
        self.commissions_activated
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn is_processed(&self) -> bool {
        self.processed
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Widen the period bounds to include an invoice issue date.
    pub fn observe_invoice_date(&mut self, date: DateTime<Utc>) {
        match self.period_start {
            Some(start) if start <= date => {}
            _ => self.period_start = Some(date),
        }
        match self.period_end {
            Some(end) if end >= date => {}
            _ => self.period_end = Some(date),
        }
    }

    /// Record the row counts accumulated while classifying the file.
    pub fn record_counts(
        &mut self,
        total: u32,
        paid: u32,
        pending: u32,
        referrers: u32,
        referrals: u32,
    ) {
        self.total_invoices = total;
        self.paid_invoices = paid;
        self.pending_invoices = pending;
        self.referrer_invoices = referrers;
        self.referral_invoices = referrals;
    }

    /// Record the commission engine's output. Also used by reprocessing,
    /// which advances the counters by the rerun's deltas.
    pub fn add_generated(&mut self, generated: u32, activated: u32) {
        self.commissions_generated += generated;
        self.commissions_activated += activated;
    }

    pub fn record_errors(&mut self, errors: Vec<String>) {
        self.errors = errors;
    }

    /// Close the upload after the pipeline completed.
    pub fn finalize(&mut self, at: DateTime<Utc>) {
        self.processed = true;
        self.processed_at = Some(at);
    }

    /// Snapshot of the UI-facing stats for this upload.
    pub fn stats(&self) -> UploadStats {
        UploadStats {
            total_invoices: self.total_invoices,
            referrer_invoices: self.referrer_invoices,
            referral_invoices: self.referral_invoices,
            commissions_generated: self.commissions_generated,
            commissions_activated: self.commissions_activated,
            errors: self.errors.clone(),
        }
    }
}

impl Entity for InvoiceUpload {
    type Id = UploadId;

    fn id(&self) -> UploadId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn new_upload_is_unprocessed_with_empty_stats() {
        let upload = InvoiceUpload::new(UploadId::new(), ActorId::new(), "marzo.csv", Utc::now());
        assert!(!upload.is_processed());
        assert_eq!(upload.total_invoices(), 0);
        assert_eq!(upload.period_start(), None);
        assert_eq!(upload.source_file(), "marzo.csv");
    }

    #[test]
    fn observe_invoice_date_widens_period_bounds() {
        let mut upload =
            InvoiceUpload::new(UploadId::new(), ActorId::new(), "marzo.csv", Utc::now());
        let early = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let mid = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 3, 28, 0, 0, 0).unwrap();

        upload.observe_invoice_date(mid);
        upload.observe_invoice_date(late);
        upload.observe_invoice_date(early);

        assert_eq!(upload.period_start(), Some(early));
        assert_eq!(upload.period_end(), Some(late));
    }

    #[test]
    fn reprocessing_accumulates_generation_counters() {
        let mut upload =
            InvoiceUpload::new(UploadId::new(), ActorId::new(), "marzo.csv", Utc::now());
        upload.add_generated(3, 2);
        upload.add_generated(1, 0);
        assert_eq!(upload.commissions_generated(), 4);
        assert_eq!(upload.commissions_activated(), 2);
    }

    #[test]
    fn finalize_marks_processed_with_timestamp() {
        let mut upload =
            InvoiceUpload::new(UploadId::new(), ActorId::new(), "marzo.csv", Utc::now());
        let at = Utc::now();
        upload.finalize(at);
        assert!(upload.is_processed());
        assert_eq!(upload.processed_at(), Some(at));
    }

    #[test]
    fn stats_serialize_with_camel_case_contract() {
        let mut upload =
            InvoiceUpload::new(UploadId::new(), ActorId::new(), "marzo.csv", Utc::now());
        upload.record_counts(5, 3, 2, 2, 1);
        upload.add_generated(1, 1);
        upload.record_errors(vec!["Invoice 4 missing service ID".to_string()]);

        let json = serde_json::to_value(upload.stats()).unwrap();
        assert_eq!(json["totalInvoices"], 5);
        assert_eq!(json["referrerInvoices"], 2);
        assert_eq!(json["referralInvoices"], 1);
        assert_eq!(json["commissionsGenerated"], 1);
        assert_eq!(json["commissionsActivated"], 1);
        assert_eq!(json["errors"][0], "Invoice 4 missing service ID");
    }
}

