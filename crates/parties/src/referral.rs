use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use refpay_core::{ClientId, DomainError, Entity, ReferralId};

use crate::client::ContactInfo;
use crate::payment::PaymentStatus;

/// Referral lead lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferralStatus {
    Pending,
    Contacted,
    Installed,
    Rejected,
    Cancelled,
}

/// A referred prospect, tracked from lead registration to installed
/// subscriber.
///
/// Belongs to exactly one referring client. The external id is assigned when
/// the installation completes; from then on the referral is matchable
/// against invoice CSV rows and commissions attach to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    id: ReferralId,
    client_id: ClientId,
    name: String,
    contact: ContactInfo,
    status: ReferralStatus,
    status_reason: Option<String>,
    external_id: Option<String>,
    installed_at: Option<DateTime<Utc>>,
    last_invoice_status: Option<PaymentStatus>,
    last_invoice_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl Referral {
    /// Register a new lead for a referring client.
    pub fn new(
        id: ReferralId,
        client_id: ClientId,
        name: impl Into<String>,
        contact: ContactInfo,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(Self {
            id,
            client_id,
            name,
            contact,
            status: ReferralStatus::Pending,
            status_reason: None,
            external_id: None,
            installed_at: None,
            last_invoice_status: None,
            last_invoice_date: None,
            created_at,
        })
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn status(&self) -> ReferralStatus {
        self.status
    }

    pub fn status_reason(&self) -> Option<&str> {
        self.status_reason.as_deref()
    }

    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    pub fn installed_at(&self) -> Option<DateTime<Utc>> {
        self.installed_at
    }

    pub fn last_invoice_status(&self) -> Option<PaymentStatus> {
        self.last_invoice_status
    }

    pub fn last_invoice_date(&self) -> Option<DateTime<Utc>> {
        self.last_invoice_date
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Invariant helper: commissions attach only to installed referrals.
    pub fn is_installed(&self) -> bool {
        self.status == ReferralStatus::Installed
    }

    /// Advance a pending lead to contacted.
    pub fn mark_contacted(&mut self) -> Result<(), DomainError> {
        if self.status != ReferralStatus::Pending {
            return Err(DomainError::invariant(
                "referral must be pending to be marked contacted",
            ));
        }
        self.status = ReferralStatus::Contacted;
        Ok(())
    }

    /// Complete the installation: the lead became a subscriber.
    ///
    /// Assigns the billing-system external id; invoice rows and commissions
    /// match against it from here on.
    pub fn complete_installation(
        &mut self,
        external_id: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        match self.status {
            ReferralStatus::Pending | ReferralStatus::Contacted => {}
            ReferralStatus::Installed => {
                return Err(DomainError::conflict("referral is already installed"));
            }
            ReferralStatus::Rejected | ReferralStatus::Cancelled => {
                return Err(DomainError::invariant(
                    "referral must be pending or contacted to be installed",
                ));
            }
        }

        let external_id = external_id.into();
        if external_id.trim().is_empty() {
            return Err(DomainError::validation(
                "installation requires an external service id",
            ));
        }

        self.status = ReferralStatus::Installed;
        self.status_reason = None;
        self.external_id = Some(external_id);
        self.installed_at = Some(at);
        Ok(())
    }

    /// Reject a lead that will not be installed.
    pub fn reject(&mut self, reason: Option<String>) -> Result<(), DomainError> {
        match self.status {
            ReferralStatus::Pending | ReferralStatus::Contacted => {
                self.status = ReferralStatus::Rejected;
                self.status_reason = reason;
                Ok(())
            }
            _ => Err(DomainError::invariant(
                "referral must be pending or contacted to be rejected",
            )),
        }
    }

    /// Cancel a referral (including an installed one whose service ended).
    pub fn cancel(&mut self, reason: Option<String>) -> Result<(), DomainError> {
        match self.status {
            ReferralStatus::Rejected | ReferralStatus::Cancelled => {
                Err(DomainError::invariant("referral is already closed"))
            }
            _ => {
                self.status = ReferralStatus::Cancelled;
                self.status_reason = reason;
                Ok(())
            }
        }
    }

    /// Mirror the referral's latest reconciled invoice.
    pub fn record_invoice(&mut self, status: PaymentStatus, date: DateTime<Utc>) {
        self.last_invoice_status = Some(status);
        self.last_invoice_date = Some(date);
    }
}

impl Entity for Referral {
    type Id = ReferralId;

    fn id(&self) -> ReferralId {
        self.id
    }
}
