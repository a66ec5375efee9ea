use std::sync::Arc;
use uuid::Uuid;

use zapshift_core::parcel::ParcelDraft;
use zapshift_core::repository::{ParcelRepository, TrackingLogRepository};
use zapshift_core::tracking::GenerationError;
use zapshift_core::{
    generate_tracking_id, DeliveryStatus, InvalidTransition, Parcel, ParcelFilter, Rider,
    RiderAssignment, StoreError, TrackingLogEntry,
};

use crate::riders::RiderAvailability;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    IllegalTransition(#[from] InvalidTransition),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Owner of the parcel's `delivery_status`: every transition goes through
/// here, flipping rider availability and appending tracking-log entries as
/// side effects.
pub struct ParcelLifecycle {
    parcels: Arc<dyn ParcelRepository>,
    logs: Arc<dyn TrackingLogRepository>,
    availability: RiderAvailability,
}

impl ParcelLifecycle {
    pub fn new(
        parcels: Arc<dyn ParcelRepository>,
        logs: Arc<dyn TrackingLogRepository>,
        availability: RiderAvailability,
    ) -> Self {
        Self {
            parcels,
            logs,
            availability,
        }
    }

    /// Mint a tracking id, persist the parcel and its `parcel_created` log
    /// entry as one atomic write.
    pub async fn create(&self, draft: ParcelDraft) -> Result<Parcel, LifecycleError> {
        let tracking_id = generate_tracking_id()?;
        let parcel = Parcel::new(draft, tracking_id);
        let log = TrackingLogEntry::new(&parcel.tracking_id, &parcel.delivery_status);

        self.parcels.create(&parcel, &log).await?;
        tracing::info!(parcel_id = %parcel.id, tracking_id = %parcel.tracking_id, "parcel created");
        Ok(parcel)
    }

    pub async fn get(&self, id: Uuid) -> Result<Parcel, LifecycleError> {
        self.parcels
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("parcel {id}")).into())
    }

    /// Attach a rider: parcel moves to `driver_assigned` and the rider is
    /// flipped to in-delivery. Returns the rider record after the flip.
    pub async fn assign_rider(
        &self,
        parcel_id: Uuid,
        assignment: RiderAssignment,
    ) -> Result<Rider, LifecycleError> {
        let parcel = self.get(parcel_id).await?;
        parcel
            .delivery_status
            .transition(&DeliveryStatus::DriverAssigned)?;

        // Resolve the rider before touching the parcel, so an unknown id
        // fails without leaving a durable `driver_assigned` write behind.
        self.availability
            .get(assignment.rider_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("rider {}", assignment.rider_id)))?;

        let log = self.log_for(&parcel, &DeliveryStatus::DriverAssigned);
        self.parcels.assign_rider(parcel_id, &assignment, &log).await?;
        self.availability.mark_in_delivery(assignment.rider_id).await?;

        tracing::info!(
            parcel_id = %parcel_id,
            rider_id = %assignment.rider_id,
            "rider assigned"
        );

        self.availability
            .get(assignment.rider_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("rider {}", assignment.rider_id)).into())
    }

    /// General-purpose status advance for every move other than creation and
    /// rider assignment. Delivery releases the supplied rider.
    pub async fn set_status(
        &self,
        parcel_id: Uuid,
        new_status: DeliveryStatus,
        rider_id: Option<Uuid>,
    ) -> Result<(), LifecycleError> {
        let parcel = self.get(parcel_id).await?;
        parcel.delivery_status.transition(&new_status)?;

        let log = self.log_for(&parcel, &new_status);
        self.parcels.set_status(parcel_id, &new_status, &log).await?;

        if new_status == DeliveryStatus::ParcelDelivered {
            if let Some(rider_id) = rider_id {
                self.availability.mark_available(rider_id).await?;
            }
        }

        tracing::info!(parcel_id = %parcel_id, status = %new_status, "delivery status updated");
        Ok(())
    }

    /// Remove the parcel record. Tracking logs and payment receipts are kept
    /// as an audit trail.
    pub async fn delete(&self, parcel_id: Uuid) -> Result<(), LifecycleError> {
        self.parcels.delete(parcel_id).await?;
        Ok(())
    }

    pub async fn list(&self, filter: &ParcelFilter) -> Result<Vec<Parcel>, LifecycleError> {
        Ok(self.parcels.list(filter).await?)
    }

    pub async fn list_for_rider(
        &self,
        rider_email: &str,
        status: Option<&DeliveryStatus>,
    ) -> Result<Vec<Parcel>, LifecycleError> {
        Ok(self.parcels.list_for_rider(rider_email, status).await?)
    }

    /// Public tracking lookup: the audit trail for a tracking code in
    /// insertion order.
    pub async fn track(&self, tracking_id: &str) -> Result<Vec<TrackingLogEntry>, LifecycleError> {
        Ok(self.logs.list_by_tracking_id(tracking_id).await?)
    }

    fn log_for(&self, parcel: &Parcel, status: &DeliveryStatus) -> TrackingLogEntry {
        if parcel.tracking_id.is_empty() {
            tracing::warn!(parcel_id = %parcel.id, "parcel has no tracking id, log entry will be skipped");
        }
        TrackingLogEntry::new(&parcel.tracking_id, status)
    }
}
