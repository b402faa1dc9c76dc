//! Upload orchestration.
//!
//! One synchronous pipeline per uploaded file: parse, classify, update
//! referrer standing, generate commissions, finalize the audit record.
//! Steps commit independently as they complete; a failed row is an entry in
//! the error list, never an aborted batch.

use chrono::Utc;

use refpay_commissions::CommissionPolicy;
use refpay_core::{ActorId, DomainError, DomainResult, Entity, UploadId};
use refpay_imports::{InvoiceUpload, ParserOptions, UploadOutcome, UploadStats, parse_invoices};
use refpay_infra::{InvoiceRecordStore, UploadStore};
use refpay_parties::ExternalIdMatcher;

use crate::classifier::classify_and_store_rows;
use crate::context::Stores;
use crate::generate::generate_commissions;
use crate::payment::update_referrer_payment_status;

/// The CSV upload pipeline.
pub struct UploadPipeline {
    stores: Stores,
    policy: CommissionPolicy,
    matcher: ExternalIdMatcher,
    options: ParserOptions,
}

impl UploadPipeline {
    pub fn new(stores: Stores, policy: CommissionPolicy) -> Self {
        Self {
            stores,
            policy,
            matcher: ExternalIdMatcher::default(),
            options: ParserOptions::default(),
        }
    }

    pub fn with_matcher(mut self, matcher: ExternalIdMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_parser_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    /// Process one uploaded CSV file end to end.
    pub fn process(
        &self,
        text: &str,
        uploaded_by: ActorId,
        source_file: &str,
    ) -> DomainResult<UploadOutcome> {
        let now = Utc::now();
        let mut upload = InvoiceUpload::new(UploadId::new(), uploaded_by, source_file, now);
        let upload_id = upload.id();
        self.stores.uploads.upsert(upload.clone());
        tracing::info!(%upload_id, source_file, "processing invoice upload");

        let parsed = parse_invoices(text, &self.options, now)?;
        let mut errors = parsed.errors;
        for error in &errors {
            tracing::warn!(%upload_id, %error, "invoice row rejected");
        }

        let mut records =
            classify_and_store_rows(&parsed.rows, upload_id, &self.stores, &self.matcher);

        let total = records.len() as u32;
        let paid = records.iter().filter(|r| r.status().is_paid()).count() as u32;
        let referrers = records.iter().filter(|r| r.is_referrer()).count() as u32;
        let referrals = records.iter().filter(|r| r.is_referral()).count() as u32;
        for record in &records {
            upload.observe_invoice_date(record.issued_at());
        }
        upload.record_counts(total, paid, total - paid, referrers, referrals);
        self.stores.uploads.upsert(upload.clone());

        let updated = update_referrer_payment_status(&records, &self.stores, &self.matcher);
        tracing::debug!(%upload_id, updated, "referrer payment flags updated");

        let (generated, generation_errors) = generate_commissions(
            &mut records,
            &self.stores,
            &self.matcher,
            &self.policy,
            now,
        );
        errors.extend(generation_errors);

        upload.add_generated(generated.generated, generated.activated);
        upload.record_errors(errors);
        upload.finalize(Utc::now());
        self.stores.uploads.upsert(upload.clone());

        tracing::info!(
            %upload_id,
            total_invoices = total,
            commissions_generated = generated.generated,
            commissions_activated = generated.activated,
            row_errors = upload.errors().len(),
            "invoice upload processed"
        );

        Ok(UploadOutcome {
            upload_id,
            stats: upload.stats(),
        })
    }

    /// Re-run the payment-status and commission steps over an already
    /// persisted upload, without re-parsing the file.
    ///
    /// The month-key and cap guards make an exact re-run a no-op; the
    /// returned stats carry the rerun's own deltas.
    pub fn reprocess(&self, upload_id: UploadId) -> DomainResult<UploadOutcome> {
        let mut upload = self
            .stores
            .uploads
            .get(upload_id)
            .ok_or_else(|| DomainError::not_found(format!("upload {upload_id}")))?;

        let mut records = self.stores.records.list_by_upload(upload_id);
        tracing::info!(%upload_id, records = records.len(), "reprocessing invoice upload");

        update_referrer_payment_status(&records, &self.stores, &self.matcher);
        let (generated, errors) = generate_commissions(
            &mut records,
            &self.stores,
            &self.matcher,
            &self.policy,
            Utc::now(),
        );

        upload.add_generated(generated.generated, generated.activated);
        upload.finalize(Utc::now());
        self.stores.uploads.upsert(upload.clone());

        Ok(UploadOutcome {
            upload_id,
            stats: UploadStats {
                total_invoices: upload.total_invoices(),
                referrer_invoices: upload.referrer_invoices(),
                referral_invoices: upload.referral_invoices(),
                commissions_generated: generated.generated,
                commissions_activated: generated.activated,
                errors,
            },
        })
    }
}

