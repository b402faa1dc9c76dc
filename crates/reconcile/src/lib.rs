//! `refpay-reconcile` — invoice reconciliation and commission services.
//!
//! Composes the import, classification, payment-status and commission
//! layers into the upload pipeline, and exposes the commission lifecycle
//! operations consumed by the admin surface.

pub mod classifier;
pub mod context;
pub mod generate;
pub mod lifecycle;
pub mod payment;
pub mod pipeline;

pub use classifier::classify_and_store_rows;
pub use context::Stores;
pub use generate::{GenerationOutcome, generate_commissions};
pub use lifecycle::{ActivationOutcome, CommissionOps};
pub use payment::update_referrer_payment_status;
pub use pipeline::UploadPipeline;

