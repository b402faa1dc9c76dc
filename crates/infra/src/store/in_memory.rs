//! In-memory store implementations for tests/dev.

use std::collections::HashMap;
use std::sync::RwLock;

use refpay_commissions::{Commission, CommissionKind, CommissionStatus};
use refpay_core::{
    ClientId, CommissionId, DomainError, DomainResult, Entity, InvoiceRecordId, ReferralId,
    UploadId,
};
use refpay_imports::{InvoiceRecord, InvoiceUpload};
use refpay_parties::{Client, ExternalIdMatcher, Referral};

use super::{ClientStore, CommissionStore, InvoiceRecordStore, ReferralStore, UploadStore};

/// Keyed in-memory table shared by the simple stores.
#[derive(Debug)]
struct Table<E: Entity> {
    inner: RwLock<HashMap<E::Id, E>>,
}

impl<E: Entity + Clone> Table<E> {
    fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    fn get(&self, id: E::Id) -> Option<E> {
        let map = self.inner.read().ok()?;
        map.get(&id).cloned()
    }

    fn upsert(&self, entity: E) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(entity.id(), entity);
        }
    }

    fn values(&self) -> Vec<E> {
        match self.inner.read() {
            Ok(map) => map.values().cloned().collect(),
            Err(_) => vec![],
        }
    }
}

/// In-memory client store.
#[derive(Debug)]
pub struct InMemoryClientStore {
    table: Table<Client>,
}

impl InMemoryClientStore {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
        }
    }
}

impl Default for InMemoryClientStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientStore for InMemoryClientStore {
    fn get(&self, id: ClientId) -> Option<Client> {
        self.table.get(id)
    }

    fn upsert(&self, client: Client) {
        self.table.upsert(client);
    }

    fn find_by_external_id(
        &self,
        external_id: &str,
        matcher: &ExternalIdMatcher,
    ) -> Option<Client> {
        self.table
            .values()
            .into_iter()
            .find(|client| matcher.matches(client.external_id(), external_id))
    }

    fn list(&self) -> Vec<Client> {
        let mut clients = self.table.values();
        clients.sort_by_key(|c| c.created_at());
        clients
    }
}

/// In-memory referral store.
#[derive(Debug)]
pub struct InMemoryReferralStore {
    table: Table<Referral>,
}

impl InMemoryReferralStore {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
        }
    }
}

impl Default for InMemoryReferralStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferralStore for InMemoryReferralStore {
    fn get(&self, id: ReferralId) -> Option<Referral> {
        self.table.get(id)
    }

    fn upsert(&self, referral: Referral) {
        self.table.upsert(referral);
    }

    fn find_installed_by_external_id(
        &self,
        external_id: &str,
        matcher: &ExternalIdMatcher,
    ) -> Option<Referral> {
        self.table.values().into_iter().find(|referral| {
            referral.is_installed()
                && referral
                    .external_id()
                    .is_some_and(|stored| matcher.matches(stored, external_id))
        })
    }

    fn list_by_client(&self, client_id: ClientId) -> Vec<Referral> {
        let mut referrals: Vec<Referral> = self
            .table
            .values()
            .into_iter()
            .filter(|r| r.client_id() == client_id)
            .collect();
        referrals.sort_by_key(|r| r.created_at());
        referrals
    }
}

/// In-memory commission store.
///
/// `insert` enforces the uniqueness guards a relational backend would carry
/// as unique constraints; cancelled commissions still occupy their month
/// slot, which keeps re-imports of a reconciled month idempotent.
#[derive(Debug)]
pub struct InMemoryCommissionStore {
    inner: RwLock<HashMap<CommissionId, Commission>>,
}

impl InMemoryCommissionStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    fn values(&self) -> Vec<Commission> {
        match self.inner.read() {
            Ok(map) => map.values().cloned().collect(),
            Err(_) => vec![],
        }
    }
}

impl Default for InMemoryCommissionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CommissionStore for InMemoryCommissionStore {
    fn get(&self, id: CommissionId) -> Option<Commission> {
        let map = self.inner.read().ok()?;
        map.get(&id).cloned()
    }

    fn insert(&self, commission: Commission) -> DomainResult<()> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| DomainError::invariant("commission store lock poisoned"))?;

        if map.contains_key(&commission.id()) {
            return Err(DomainError::conflict("commission id already exists"));
        }

        let siblings = map
            .values()
            .filter(|c| c.referral_id() == commission.referral_id());
        match commission.kind() {
            CommissionKind::Installation => {
                for sibling in siblings {
                    if sibling.kind() == CommissionKind::Installation {
                        return Err(DomainError::conflict(
                            "installation commission already exists for this referral",
                        ));
                    }
                }
            }
            CommissionKind::Monthly => {
                for sibling in siblings {
                    if sibling.kind() != CommissionKind::Monthly {
                        continue;
                    }
                    if sibling.month_number() == commission.month_number()
                        || sibling.month_key() == commission.month_key()
                    {
                        return Err(DomainError::conflict(
                            "monthly commission already exists for this referral and month",
                        ));
                    }
                }
            }
        }

        map.insert(commission.id(), commission);
        Ok(())
    }

    fn update(&self, commission: Commission) -> DomainResult<()> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| DomainError::invariant("commission store lock poisoned"))?;
        if !map.contains_key(&commission.id()) {
            return Err(DomainError::not_found(format!(
                "commission {}",
                commission.id()
            )));
        }
        map.insert(commission.id(), commission);
        Ok(())
    }

    fn list_monthly_by_referral(&self, referral_id: ReferralId) -> Vec<Commission> {
        let mut monthly: Vec<Commission> = self
            .values()
            .into_iter()
            .filter(|c| c.referral_id() == referral_id && c.kind() == CommissionKind::Monthly)
            .collect();
        monthly.sort_by_key(|c| c.month_number());
        monthly
    }

    fn find_by_referral_and_kind(
        &self,
        referral_id: ReferralId,
        kind: CommissionKind,
    ) -> Option<Commission> {
        self.values()
            .into_iter()
            .find(|c| c.referral_id() == referral_id && c.kind() == kind)
    }

    fn find_by_referral_and_month(
        &self,
        referral_id: ReferralId,
        month_number: u32,
    ) -> Option<Commission> {
        self.values().into_iter().find(|c| {
            c.referral_id() == referral_id
                && c.kind() == CommissionKind::Monthly
                && c.month_number() == Some(month_number)
        })
    }

    fn list_earned_by_client(&self, client_id: ClientId) -> Vec<Commission> {
        let mut earned: Vec<Commission> = self
            .values()
            .into_iter()
            .filter(|c| c.client_id() == client_id && c.status() == CommissionStatus::Earned)
            .collect();
        earned.sort_by_key(|c| c.created_at());
        earned
    }

    fn list_by_client(&self, client_id: ClientId) -> Vec<Commission> {
        let mut commissions: Vec<Commission> = self
            .values()
            .into_iter()
            .filter(|c| c.client_id() == client_id)
            .collect();
        commissions.sort_by_key(|c| c.created_at());
        commissions
    }
}

/// In-memory upload store.
#[derive(Debug)]
pub struct InMemoryUploadStore {
    table: Table<InvoiceUpload>,
}

impl InMemoryUploadStore {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
        }
    }
}

impl Default for InMemoryUploadStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadStore for InMemoryUploadStore {
    fn get(&self, id: UploadId) -> Option<InvoiceUpload> {
        self.table.get(id)
    }

    fn upsert(&self, upload: InvoiceUpload) {
        self.table.upsert(upload);
    }
}

/// In-memory invoice record store.
#[derive(Debug)]
pub struct InMemoryInvoiceRecordStore {
    table: Table<InvoiceRecord>,
}

impl InMemoryInvoiceRecordStore {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
        }
    }
}

impl Default for InMemoryInvoiceRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InvoiceRecordStore for InMemoryInvoiceRecordStore {
    fn get(&self, id: InvoiceRecordId) -> Option<InvoiceRecord> {
        self.table.get(id)
    }

    fn upsert(&self, record: InvoiceRecord) {
        self.table.upsert(record);
    }

    fn list_by_upload(&self, upload_id: UploadId) -> Vec<InvoiceRecord> {
        let mut records: Vec<InvoiceRecord> = self
            .table
            .values()
            .into_iter()
            .filter(|r| r.upload_id() == upload_id)
            .collect();
        records.sort_by_key(|r| r.issued_at());
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use refpay_parties::ContactInfo;

    fn test_client(external_id: &str) -> Client {
        Client::new(
            ClientId::new(),
            external_id,
            "REF-0001",
            "Test Referrer",
            ContactInfo::default(),
            Utc::now(),
        )
        .unwrap()
    }

    fn installed_referral(client_id: ClientId, external_id: &str) -> Referral {
        let mut referral = Referral::new(
            ReferralId::new(),
            client_id,
            "Test Lead",
            ContactInfo::default(),
            Utc::now(),
        )
        .unwrap();
        referral.complete_installation(external_id, Utc::now()).unwrap();
        referral
    }

    #[test]
    fn client_lookup_tolerates_id_shapes() {
        let store = InMemoryClientStore::new();
        let matcher = ExternalIdMatcher::default();
        let client = test_client("SVC-00123");
        let id = client.id();
        store.upsert(client);

        assert_eq!(
            store.find_by_external_id("SVC-00123", &matcher).map(|c| c.id()),
            Some(id)
        );
        assert_eq!(
            store.find_by_external_id("00123", &matcher).map(|c| c.id()),
            Some(id)
        );
        assert!(store.find_by_external_id("99999", &matcher).is_none());
    }

    #[test]
    fn referral_lookup_only_returns_installed() {
        let store = InMemoryReferralStore::new();
        let matcher = ExternalIdMatcher::default();
        let client_id = ClientId::new();

        let pending = Referral::new(
            ReferralId::new(),
            client_id,
            "Pending Lead",
            ContactInfo::default(),
            Utc::now(),
        )
        .unwrap();
        store.upsert(pending);
        store.upsert(installed_referral(client_id, "SVC-555"));

        let found = store.find_installed_by_external_id("SVC-555", &matcher);
        assert!(found.is_some_and(|r| r.is_installed()));
        assert!(store.find_installed_by_external_id("SVC-556", &matcher).is_none());
    }

    #[test]
    fn commission_insert_rejects_duplicate_month() {
        let store = InMemoryCommissionStore::new();
        let client_id = ClientId::new();
        let referral_id = ReferralId::new();
        let date = Utc::now();

        let first = Commission::monthly(
            CommissionId::new(),
            client_id,
            referral_id,
            1,
            date,
            150_00,
            true,
            Utc::now(),
        )
        .unwrap();
        store.insert(first).unwrap();

        // Same calendar month, different month number: still a conflict.
        let duplicate = Commission::monthly(
            CommissionId::new(),
            client_id,
            referral_id,
            2,
            date,
            150_00,
            true,
            Utc::now(),
        )
        .unwrap();
        let err = store.insert(duplicate).unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            _ => panic!("Expected Conflict for duplicate month"),
        }
    }

    #[test]
    fn commission_insert_rejects_second_installation() {
        let store = InMemoryCommissionStore::new();
        let client_id = ClientId::new();
        let referral_id = ReferralId::new();

        let first = Commission::installation(
            CommissionId::new(),
            client_id,
            referral_id,
            300_00,
            Utc::now(),
        )
        .unwrap();
        store.insert(first).unwrap();

        let second = Commission::installation(
            CommissionId::new(),
            client_id,
            referral_id,
            300_00,
            Utc::now(),
        )
        .unwrap();
        assert!(store.insert(second).is_err());
    }

    #[test]
    fn monthly_listing_is_ordered_by_month_number() {
        let store = InMemoryCommissionStore::new();
        let client_id = ClientId::new();
        let referral_id = ReferralId::new();

        for (month_number, month) in [(2u32, 4u32), (1, 3), (3, 5)] {
            let date = Utc.with_ymd_and_hms(2025, month, 10, 0, 0, 0).unwrap();
            let commission = Commission::monthly(
                CommissionId::new(),
                client_id,
                referral_id,
                month_number,
                date,
                150_00,
                true,
                Utc::now(),
            )
            .unwrap();
            store.insert(commission).unwrap();
        }

        let listed = store.list_monthly_by_referral(referral_id);
        let numbers: Vec<Option<u32>> = listed.iter().map(|c| c.month_number()).collect();
        assert_eq!(numbers, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn update_requires_existing_commission() {
        let store = InMemoryCommissionStore::new();
        let commission = Commission::installation(
            CommissionId::new(),
            ClientId::new(),
            ReferralId::new(),
            300_00,
            Utc::now(),
        )
        .unwrap();
        let err = store.update(commission).unwrap_err();
        match err {
            DomainError::NotFound(_) => {}
            _ => panic!("Expected NotFound for updating a missing commission"),
        }
    }
}

