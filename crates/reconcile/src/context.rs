use std::sync::Arc;

use refpay_infra::{
    ClientStore, CommissionStore, InMemoryClientStore, InMemoryCommissionStore,
    InMemoryInvoiceRecordStore, InMemoryReferralStore, InMemoryUploadStore, InvoiceRecordStore,
    ReferralStore, UploadStore,
};

/// Shared handles to the persistence collaborator.
#[derive(Clone)]
pub struct Stores {
    pub clients: Arc<dyn ClientStore>,
    pub referrals: Arc<dyn ReferralStore>,
    pub commissions: Arc<dyn CommissionStore>,
    pub uploads: Arc<dyn UploadStore>,
    pub records: Arc<dyn InvoiceRecordStore>,
}

impl Stores {
    /// Fresh in-memory stores (tests, dev, benches).
    pub fn in_memory() -> Self {
        Self {
            clients: Arc::new(InMemoryClientStore::new()),
            referrals: Arc::new(InMemoryReferralStore::new()),
            commissions: Arc::new(InMemoryCommissionStore::new()),
            uploads: Arc::new(InMemoryUploadStore::new()),
            records: Arc::new(InMemoryInvoiceRecordStore::new()),
        }
    }
}

