//! `refpay-parties` — referrers (clients) and referred prospects (referrals).
//!
//! A `Client` is an existing subscriber who refers leads and earns
//! commissions; a `Referral` is one referred lead tracked from registration
//! to installation. Both carry mirror fields from the latest reconciled
//! invoice.

pub mod client;
pub mod external_id;
pub mod payment;
pub mod referral;

pub use client::{Client, ContactInfo};
pub use external_id::ExternalIdMatcher;
pub use payment::PaymentStatus;
pub use referral::{Referral, ReferralStatus};

