use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use zapshift_core::repository::{
    ParcelRepository, PaymentRepository, RiderRepository, TrackingLogRepository, UserRepository,
};
use zapshift_core::{
    DeliveryStatus, Parcel, ParcelFilter, PaymentReceipt, PaymentStatus, Rider, RiderAssignment,
    RiderFilter, RiderStatus, Role, StoreError, StoreResult, TrackingLogEntry, User, WorkStatus,
};

/// Single-process backend holding every collection behind one lock. Used by
/// the test suites and for running the API without Postgres; multi-write
/// operations are atomic by construction.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    parcels: HashMap<Uuid, Parcel>,
    riders: HashMap<Uuid, Rider>,
    receipts: Vec<PaymentReceipt>,
    logs: Vec<TrackingLogEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn push_log(inner: &mut Inner, log: &TrackingLogEntry) {
    if log.tracking_id.is_empty() {
        tracing::warn!(status = %log.status, "skipping tracking log append without tracking id");
        return;
    }
    inner.logs.push(log.clone());
}

#[async_trait]
impl ParcelRepository for MemoryStore {
    async fn create(&self, parcel: &Parcel, log: &TrackingLogEntry) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.parcels.insert(parcel.id, parcel.clone());
        push_log(&mut inner, log);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Parcel>> {
        Ok(self.inner.lock().unwrap().parcels.get(&id).cloned())
    }

    async fn assign_rider(
        &self,
        id: Uuid,
        assignment: &RiderAssignment,
        log: &TrackingLogEntry,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let parcel = inner
            .parcels
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("parcel {id}")))?;

        parcel.delivery_status = DeliveryStatus::DriverAssigned;
        parcel.rider_id = Some(assignment.rider_id);
        parcel.rider_name = Some(assignment.rider_name.clone());
        parcel.rider_email = Some(assignment.rider_email.clone());
        push_log(&mut inner, log);
        Ok(())
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: &DeliveryStatus,
        log: &TrackingLogEntry,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let parcel = inner
            .parcels
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("parcel {id}")))?;

        parcel.delivery_status = status.clone();
        push_log(&mut inner, log);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .parcels
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("parcel {id}")))
    }

    async fn list(&self, filter: &ParcelFilter) -> StoreResult<Vec<Parcel>> {
        let inner = self.inner.lock().unwrap();
        let mut parcels: Vec<Parcel> = inner
            .parcels
            .values()
            .filter(|p| {
                filter
                    .sender_email
                    .as_ref()
                    .is_none_or(|email| &p.sender_email == email)
            })
            .filter(|p| {
                filter
                    .delivery_status
                    .as_ref()
                    .is_none_or(|status| &p.delivery_status == status)
            })
            .cloned()
            .collect();

        parcels.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(parcels)
    }

    async fn list_for_rider(
        &self,
        rider_email: &str,
        status: Option<&DeliveryStatus>,
    ) -> StoreResult<Vec<Parcel>> {
        let inner = self.inner.lock().unwrap();
        let mut parcels: Vec<Parcel> = inner
            .parcels
            .values()
            .filter(|p| p.rider_email.as_deref() == Some(rider_email))
            .filter(|p| match status {
                Some(status) => &p.delivery_status == status,
                None => p.delivery_status != DeliveryStatus::ParcelDelivered,
            })
            .cloned()
            .collect();

        parcels.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(parcels)
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn find_by_transaction(&self, transaction_id: &str) -> StoreResult<Option<PaymentReceipt>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .receipts
            .iter()
            .find(|r| r.transaction_id == transaction_id)
            .cloned())
    }

    async fn settle(
        &self,
        parcel_id: Uuid,
        tracking_id: &str,
        receipt: &PaymentReceipt,
        log: &TrackingLogEntry,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();

        if inner
            .receipts
            .iter()
            .any(|r| r.transaction_id == receipt.transaction_id)
        {
            return Err(StoreError::Conflict(format!(
                "transaction {}",
                receipt.transaction_id
            )));
        }

        let parcel = inner
            .parcels
            .get_mut(&parcel_id)
            .ok_or_else(|| StoreError::NotFound(format!("parcel {parcel_id}")))?;

        parcel.payment_status = PaymentStatus::Paid;
        parcel.delivery_status = DeliveryStatus::ParcelPaid;
        parcel.tracking_id = tracking_id.to_string();

        inner.receipts.push(receipt.clone());
        push_log(&mut inner, log);
        Ok(())
    }

    async fn list_by_customer(&self, email: &str) -> StoreResult<Vec<PaymentReceipt>> {
        let inner = self.inner.lock().unwrap();
        let mut receipts: Vec<PaymentReceipt> = inner
            .receipts
            .iter()
            .filter(|r| r.customer_email == email)
            .cloned()
            .collect();

        receipts.sort_by(|a, b| b.paid_at.cmp(&a.paid_at));
        Ok(receipts)
    }
}

#[async_trait]
impl RiderRepository for MemoryStore {
    async fn insert(&self, rider: &Rider) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.riders.insert(rider.id, rider.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Rider>> {
        Ok(self.inner.lock().unwrap().riders.get(&id).cloned())
    }

    async fn list(&self, filter: &RiderFilter) -> StoreResult<Vec<Rider>> {
        let inner = self.inner.lock().unwrap();
        let mut riders: Vec<Rider> = inner
            .riders
            .values()
            .filter(|r| filter.status.is_none_or(|status| r.status == status))
            .filter(|r| {
                filter
                    .district
                    .as_ref()
                    .is_none_or(|district| &r.district == district)
            })
            .filter(|r| {
                filter
                    .work_status
                    .is_none_or(|work_status| r.work_status == work_status)
            })
            .cloned()
            .collect();

        riders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(riders)
    }

    async fn set_work_status(&self, id: Uuid, work_status: WorkStatus) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let rider = inner
            .riders
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("rider {id}")))?;
        rider.work_status = work_status;
        Ok(())
    }

    async fn set_approval(&self, id: Uuid, status: RiderStatus) -> StoreResult<Rider> {
        let mut inner = self.inner.lock().unwrap();
        let rider = inner
            .riders
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("rider {id}")))?;
        rider.status = status;
        rider.work_status = WorkStatus::Available;
        Ok(rider.clone())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert(&self, user: &User) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!("user {}", user.email)));
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn search(&self, text: Option<&str>) -> StoreResult<Vec<User>> {
        let inner = self.inner.lock().unwrap();
        let needle = text.map(|t| t.to_lowercase());
        let mut users: Vec<User> = inner
            .users
            .values()
            .filter(|u| {
                needle.as_ref().is_none_or(|needle| {
                    u.name.to_lowercase().contains(needle) || u.email.to_lowercase().contains(needle)
                })
            })
            .cloned()
            .collect();

        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let user = inner
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        user.role = role;
        Ok(())
    }

    async fn set_role_by_email(&self, email: &str, role: Role) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let user = inner
            .users
            .values_mut()
            .find(|u| u.email == email)
            .ok_or_else(|| StoreError::NotFound(format!("user {email}")))?;
        user.role = role;
        Ok(())
    }
}

#[async_trait]
impl TrackingLogRepository for MemoryStore {
    async fn append(&self, entry: &TrackingLogEntry) -> StoreResult<()> {
        if entry.tracking_id.is_empty() {
            return Err(StoreError::NotFound("empty tracking id".to_string()));
        }
        let mut inner = self.inner.lock().unwrap();
        inner.logs.push(entry.clone());
        Ok(())
    }

    async fn list_by_tracking_id(&self, tracking_id: &str) -> StoreResult<Vec<TrackingLogEntry>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .logs
            .iter()
            .filter(|entry| entry.tracking_id == tracking_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zapshift_core::parcel::ParcelDraft;

    fn draft(sender: &str) -> ParcelDraft {
        ParcelDraft {
            parcel_name: "books".to_string(),
            sender_name: "Sender".to_string(),
            sender_email: sender.to_string(),
            receiver_name: "Receiver".to_string(),
            receiver_email: "receiver@example.com".to_string(),
            cost: 500,
        }
    }

    #[tokio::test]
    async fn list_filters_by_sender_and_status() {
        let store = MemoryStore::new();

        let a = Parcel::new(draft("a@example.com"), "ZS-20260825-AAAAAAAA".to_string());
        let b = Parcel::new(draft("b@example.com"), "ZS-20260825-BBBBBBBB".to_string());
        let log_a = TrackingLogEntry::new(&a.tracking_id, &a.delivery_status);
        let log_b = TrackingLogEntry::new(&b.tracking_id, &b.delivery_status);
        store.create(&a, &log_a).await.unwrap();
        store.create(&b, &log_b).await.unwrap();

        let filter = ParcelFilter {
            sender_email: Some("a@example.com".to_string()),
            delivery_status: None,
        };
        let found = ParcelRepository::list(&store, &filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, a.id);
    }

    #[tokio::test]
    async fn duplicate_user_email_conflicts() {
        let store = MemoryStore::new();
        let user = User::new("Jean".to_string(), "jean@example.com".to_string());
        UserRepository::insert(&store, &user).await.unwrap();

        let dup = User::new("Jean Again".to_string(), "jean@example.com".to_string());
        assert!(matches!(
            UserRepository::insert(&store, &dup).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn settle_is_rejected_for_duplicate_transaction() {
        let store = MemoryStore::new();
        let parcel = Parcel::new(draft("a@example.com"), "ZS-20260825-CCCCCCCC".to_string());
        let log = TrackingLogEntry::new(&parcel.tracking_id, &parcel.delivery_status);
        store.create(&parcel, &log).await.unwrap();

        let receipt = PaymentReceipt {
            id: Uuid::new_v4(),
            transaction_id: "pi_1".to_string(),
            parcel_id: parcel.id,
            parcel_name: parcel.parcel_name.clone(),
            amount: 5.0,
            currency: "usd".to_string(),
            customer_email: parcel.sender_email.clone(),
            payment_status: zapshift_core::SessionPaymentStatus::Paid,
            tracking_id: parcel.tracking_id.clone(),
            paid_at: chrono::Utc::now(),
        };
        let paid_log =
            TrackingLogEntry::new(&parcel.tracking_id, &DeliveryStatus::PendingPickup);

        store
            .settle(parcel.id, &parcel.tracking_id, &receipt, &paid_log)
            .await
            .unwrap();
        assert!(matches!(
            store
                .settle(parcel.id, &parcel.tracking_id, &receipt, &paid_log)
                .await,
            Err(StoreError::Conflict(_))
        ));
    }
}
