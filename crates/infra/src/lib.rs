//! `refpay-infra` — persistence collaborator.
//!
//! Store traits expressing the operations the reconciliation core consumes,
//! plus in-memory implementations for tests/dev. A relational backend slots
//! in behind the same traits.

pub mod store;

pub use store::{
    ClientStore, CommissionStore, InMemoryClientStore, InMemoryCommissionStore,
    InMemoryInvoiceRecordStore, InMemoryReferralStore, InMemoryUploadStore, InvoiceRecordStore,
    ReferralStore, UploadStore,
};

