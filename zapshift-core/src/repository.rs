use async_trait::async_trait;
use uuid::Uuid;

use crate::parcel::{DeliveryStatus, Parcel, ParcelFilter, RiderAssignment};
use crate::payment::PaymentReceipt;
use crate::rider::{Rider, RiderFilter, RiderStatus, WorkStatus};
use crate::tracking::TrackingLogEntry;
use crate::user::{Role, User};
use crate::StoreResult;

/// Repository trait for parcel records. Mutations that must be observed
/// together with their tracking-log entry take the entry as a parameter and
/// persist both atomically.
#[async_trait]
pub trait ParcelRepository: Send + Sync {
    async fn create(&self, parcel: &Parcel, log: &TrackingLogEntry) -> StoreResult<()>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<Parcel>>;

    /// Set rider fields and move the parcel to `driver_assigned`.
    /// `NotFound` when the id does not resolve.
    async fn assign_rider(
        &self,
        id: Uuid,
        assignment: &RiderAssignment,
        log: &TrackingLogEntry,
    ) -> StoreResult<()>;

    async fn set_status(
        &self,
        id: Uuid,
        status: &DeliveryStatus,
        log: &TrackingLogEntry,
    ) -> StoreResult<()>;

    /// Remove the parcel record only; tracking logs and receipts are kept as
    /// an audit trail.
    async fn delete(&self, id: Uuid) -> StoreResult<()>;

    /// Filtered listing sorted by `created_at` descending.
    async fn list(&self, filter: &ParcelFilter) -> StoreResult<Vec<Parcel>>;

    /// Rider workload view: with no explicit status, everything assigned to
    /// the rider except delivered parcels; with one, that status only.
    async fn list_for_rider(
        &self,
        rider_email: &str,
        status: Option<&DeliveryStatus>,
    ) -> StoreResult<Vec<Parcel>>;
}

/// Repository trait for payment receipts and the paid-settlement write.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn find_by_transaction(&self, transaction_id: &str) -> StoreResult<Option<PaymentReceipt>>;

    /// Apply a confirmed payment as one atomic operation: mark the parcel
    /// paid (status `parcel_paid`, tracking id pinned), insert the receipt,
    /// and append the tracking-log entry. `NotFound` when the parcel id does
    /// not resolve; no partial state survives a failure.
    async fn settle(
        &self,
        parcel_id: Uuid,
        tracking_id: &str,
        receipt: &PaymentReceipt,
        log: &TrackingLogEntry,
    ) -> StoreResult<()>;

    /// Receipts for a customer, `paid_at` descending.
    async fn list_by_customer(&self, email: &str) -> StoreResult<Vec<PaymentReceipt>>;
}

/// Repository trait for rider records.
#[async_trait]
pub trait RiderRepository: Send + Sync {
    async fn insert(&self, rider: &Rider) -> StoreResult<()>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<Rider>>;

    async fn list(&self, filter: &RiderFilter) -> StoreResult<Vec<Rider>>;

    /// Unconditional availability flip; `NotFound` when the id does not
    /// resolve so callers can decide to surface or ignore it.
    async fn set_work_status(&self, id: Uuid, work_status: WorkStatus) -> StoreResult<()>;

    /// Set the approval status and reset availability, returning the updated
    /// record.
    async fn set_approval(&self, id: Uuid, status: RiderStatus) -> StoreResult<Rider>;
}

/// Repository trait for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert unless the email is already registered (`Conflict`).
    async fn insert(&self, user: &User) -> StoreResult<()>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Case-insensitive substring search over name and email; no text lists
    /// everyone.
    async fn search(&self, text: Option<&str>) -> StoreResult<Vec<User>>;

    async fn set_role(&self, id: Uuid, role: Role) -> StoreResult<()>;

    async fn set_role_by_email(&self, email: &str, role: Role) -> StoreResult<()>;
}

/// Repository trait for the append-only tracking log.
#[async_trait]
pub trait TrackingLogRepository: Send + Sync {
    async fn append(&self, entry: &TrackingLogEntry) -> StoreResult<()>;

    /// Entries for a tracking code in insertion order; empty when unknown.
    async fn list_by_tracking_id(&self, tracking_id: &str) -> StoreResult<Vec<TrackingLogEntry>>;
}
