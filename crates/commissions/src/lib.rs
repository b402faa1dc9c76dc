//! `refpay-commissions` — commission entity, state machine and policy.
//!
//! A commission is a monetary credit owed to a referring client for one of
//! its referrals: a one-time installation commission, or a recurring monthly
//! commission capped at a configured number of months.

pub mod commission;
pub mod policy;

pub use commission::{
    Commission, CommissionKind, CommissionStatus, MonthKey, REFERRER_NOT_CURRENT_REASON,
};
pub use policy::CommissionPolicy;

