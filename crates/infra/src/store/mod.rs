//! Store traits: the persistence operations the reconciliation core
//! consumes.
//!
//! Traits are synchronous — the pipeline processes one upload at a time and
//! relies on the backing store's per-row isolation, not on application-level
//! locking. The monthly-commission uniqueness guard lives at the insert
//! boundary so a concurrent duplicate surfaces as a `Conflict` the engine
//! treats as "already generated, skip".

mod in_memory;

pub use in_memory::{
    InMemoryClientStore, InMemoryCommissionStore, InMemoryInvoiceRecordStore,
    InMemoryReferralStore, InMemoryUploadStore,
};

use refpay_commissions::{Commission, CommissionKind};
use refpay_core::{ClientId, CommissionId, DomainResult, InvoiceRecordId, ReferralId, UploadId};
use refpay_imports::{InvoiceRecord, InvoiceUpload};
use refpay_parties::{Client, ExternalIdMatcher, Referral};

/// Referring clients.
pub trait ClientStore: Send + Sync {
    fn get(&self, id: ClientId) -> Option<Client>;

    fn upsert(&self, client: Client);

    /// Find a client whose external id matches `external_id` under the
    /// matcher's id-shape tolerance.
    fn find_by_external_id(
        &self,
        external_id: &str,
        matcher: &ExternalIdMatcher,
    ) -> Option<Client>;

    fn list(&self) -> Vec<Client>;
}

/// Referred leads.
pub trait ReferralStore: Send + Sync {
    fn get(&self, id: ReferralId) -> Option<Referral>;

    fn upsert(&self, referral: Referral);

    /// Find an INSTALLED referral whose external id matches `external_id`
    /// under the matcher's id-shape tolerance.
    fn find_installed_by_external_id(
        &self,
        external_id: &str,
        matcher: &ExternalIdMatcher,
    ) -> Option<Referral>;

    fn list_by_client(&self, client_id: ClientId) -> Vec<Referral>;
}

/// Commissions.
pub trait CommissionStore: Send + Sync {
    fn get(&self, id: CommissionId) -> Option<Commission>;

    /// Insert a new commission.
    ///
    /// Enforces the uniqueness guards: one INSTALLATION commission per
    /// referral, and one MONTHLY commission per (referral, month number)
    /// and per (referral, calendar month). Violations return `Conflict`.
    fn insert(&self, commission: Commission) -> DomainResult<()>;

    /// Persist a state change to an existing commission.
    fn update(&self, commission: Commission) -> DomainResult<()>;

    /// A referral's MONTHLY commissions ordered by month number.
    fn list_monthly_by_referral(&self, referral_id: ReferralId) -> Vec<Commission>;

    fn find_by_referral_and_kind(
        &self,
        referral_id: ReferralId,
        kind: CommissionKind,
    ) -> Option<Commission>;

    fn find_by_referral_and_month(
        &self,
        referral_id: ReferralId,
        month_number: u32,
    ) -> Option<Commission>;

    /// A client's EARNED commissions (the manual-activation work set).
    fn list_earned_by_client(&self, client_id: ClientId) -> Vec<Commission>;

    /// Every commission belonging to a client (fresh-aggregate queries).
    fn list_by_client(&self, client_id: ClientId) -> Vec<Commission>;
}

/// Upload audit records.
pub trait UploadStore: Send + Sync {
    fn get(&self, id: UploadId) -> Option<InvoiceUpload>;

    fn upsert(&self, upload: InvoiceUpload);
}

/// Classified invoice rows.
pub trait InvoiceRecordStore: Send + Sync {
    fn get(&self, id: InvoiceRecordId) -> Option<InvoiceRecord>;

    fn upsert(&self, record: InvoiceRecord);

    fn list_by_upload(&self, upload_id: UploadId) -> Vec<InvoiceRecord>;
}

