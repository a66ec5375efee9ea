use std::sync::Arc;
use uuid::Uuid;

use zapshift_core::repository::{RiderRepository, UserRepository};
use zapshift_core::{
    Rider, RiderDraft, RiderFilter, RiderStatus, Role, StoreError, StoreResult, WorkStatus,
};

/// Sole writer of a rider's `work_status`, toggled in lockstep with parcel
/// assignment and completion.
#[derive(Clone)]
pub struct RiderAvailability {
    riders: Arc<dyn RiderRepository>,
}

impl RiderAvailability {
    pub fn new(riders: Arc<dyn RiderRepository>) -> Self {
        Self { riders }
    }

    pub async fn get(&self, id: Uuid) -> StoreResult<Option<Rider>> {
        self.riders.get(id).await
    }

    pub async fn mark_in_delivery(&self, id: Uuid) -> StoreResult<()> {
        self.riders.set_work_status(id, WorkStatus::InDelivery).await
    }

    pub async fn mark_available(&self, id: Uuid) -> StoreResult<()> {
        self.riders.set_work_status(id, WorkStatus::Available).await
    }
}

/// Rider onboarding: registration, listing, and approval decisions.
pub struct RiderService {
    riders: Arc<dyn RiderRepository>,
    users: Arc<dyn UserRepository>,
}

impl RiderService {
    pub fn new(riders: Arc<dyn RiderRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { riders, users }
    }

    pub async fn register(&self, draft: RiderDraft) -> StoreResult<Rider> {
        let rider = Rider::new(draft);
        self.riders.insert(&rider).await?;
        tracing::info!(rider_id = %rider.id, district = %rider.district, "rider registered");
        Ok(rider)
    }

    pub async fn list(&self, filter: &RiderFilter) -> StoreResult<Vec<Rider>> {
        self.riders.list(filter).await
    }

    /// Record an approval decision. Approval promotes the rider's user
    /// account to the `rider` role; a missing account is logged, not fatal,
    /// since riders can apply before ever signing in.
    pub async fn set_approval(&self, id: Uuid, status: RiderStatus) -> StoreResult<Rider> {
        let rider = self.riders.set_approval(id, status).await?;

        if status == RiderStatus::Approved {
            match self.users.set_role_by_email(&rider.email, Role::Rider).await {
                Ok(()) => {}
                Err(StoreError::NotFound(_)) => {
                    tracing::warn!(email = %rider.email, "approved rider has no user account");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(rider)
    }
}
