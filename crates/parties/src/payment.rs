//! Normalized invoice payment status.

use serde::{Deserialize, Serialize};

/// Payment status after normalizing the billing system's free-text state.
///
/// The importer collapses every raw state string to one of these two; an
/// "under review" invoice is still `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Pending,
}

impl PaymentStatus {
    pub fn is_paid(self) -> bool {
        self == PaymentStatus::Paid
    }
}

