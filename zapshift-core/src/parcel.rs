use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stage of a parcel in the fulfillment pipeline.
///
/// The stages between `DriverAssigned` and `ParcelDelivered` are an open
/// token set supplied by dispatch tooling, so unknown tokens parse into
/// `InTransit` rather than failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub enum DeliveryStatus {
    ParcelCreated,
    ParcelPaid,
    PendingPickup,
    DriverAssigned,
    InTransit(String),
    ParcelDelivered,
}

impl DeliveryStatus {
    pub fn as_token(&self) -> &str {
        match self {
            DeliveryStatus::ParcelCreated => "parcel_created",
            DeliveryStatus::ParcelPaid => "parcel_paid",
            DeliveryStatus::PendingPickup => "pending_pickup",
            DeliveryStatus::DriverAssigned => "driver_assigned",
            DeliveryStatus::InTransit(token) => token,
            DeliveryStatus::ParcelDelivered => "parcel_delivered",
        }
    }

    /// Legal forward moves of the lifecycle state machine.
    pub fn can_transition(&self, next: &DeliveryStatus) -> bool {
        use DeliveryStatus::*;

        // Re-asserting the current status is an idempotent write.
        if self == next {
            return true;
        }

        match (self, next) {
            (ParcelCreated, ParcelPaid | PendingPickup) => true,
            (ParcelPaid, PendingPickup | DriverAssigned) => true,
            (PendingPickup, DriverAssigned) => true,
            (DriverAssigned, InTransit(_) | ParcelDelivered) => true,
            (InTransit(_), InTransit(_) | ParcelDelivered) => true,
            _ => false,
        }
    }

    pub fn transition(&self, next: &DeliveryStatus) -> Result<(), InvalidTransition> {
        if self.can_transition(next) {
            Ok(())
        } else {
            Err(InvalidTransition {
                from: self.as_token().to_string(),
                to: next.as_token().to_string(),
            })
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_token())
    }
}

impl TryFrom<String> for DeliveryStatus {
    type Error = String;

    fn try_from(token: String) -> Result<Self, Self::Error> {
        match token.as_str() {
            "parcel_created" => Ok(DeliveryStatus::ParcelCreated),
            "parcel_paid" => Ok(DeliveryStatus::ParcelPaid),
            "pending_pickup" => Ok(DeliveryStatus::PendingPickup),
            "driver_assigned" => Ok(DeliveryStatus::DriverAssigned),
            "parcel_delivered" => Ok(DeliveryStatus::ParcelDelivered),
            other if !other.trim().is_empty() => Ok(DeliveryStatus::InTransit(token)),
            _ => Err("delivery status token must be non-empty".to_string()),
        }
    }
}

impl From<DeliveryStatus> for String {
    fn from(status: DeliveryStatus) -> Self {
        status.as_token().to_string()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("illegal delivery transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

impl PaymentStatus {
    pub fn as_token(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "unpaid" => Some(PaymentStatus::Unpaid),
            "paid" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

/// A shipment record. `tracking_id` is assigned once at creation and never
/// changes; `delivery_status` only moves through `DeliveryStatus` legal moves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parcel {
    pub id: Uuid,
    pub parcel_name: String,
    pub sender_name: String,
    pub sender_email: String,
    pub receiver_name: String,
    pub receiver_email: String,
    /// Delivery cost in minor currency units.
    pub cost: i64,
    pub tracking_id: String,
    pub delivery_status: DeliveryStatus,
    pub payment_status: PaymentStatus,
    pub rider_id: Option<Uuid>,
    pub rider_name: Option<String>,
    pub rider_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Parcel {
    pub fn new(draft: ParcelDraft, tracking_id: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            parcel_name: draft.parcel_name,
            sender_name: draft.sender_name,
            sender_email: draft.sender_email,
            receiver_name: draft.receiver_name,
            receiver_email: draft.receiver_email,
            cost: draft.cost,
            tracking_id,
            delivery_status: DeliveryStatus::ParcelCreated,
            payment_status: PaymentStatus::Unpaid,
            rider_id: None,
            rider_name: None,
            rider_email: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParcelDraft {
    pub parcel_name: String,
    pub sender_name: String,
    pub sender_email: String,
    pub receiver_name: String,
    pub receiver_email: String,
    pub cost: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RiderAssignment {
    pub rider_id: Uuid,
    pub rider_name: String,
    pub rider_email: String,
}

/// Equality filter over the parcel collection; `None` fields are wildcards.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParcelFilter {
    pub sender_email: Option<String>,
    pub delivery_status: Option<DeliveryStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip() {
        for token in [
            "parcel_created",
            "parcel_paid",
            "pending_pickup",
            "driver_assigned",
            "parcel_delivered",
        ] {
            let status = DeliveryStatus::try_from(token.to_string()).unwrap();
            assert_eq!(status.as_token(), token);
        }
    }

    #[test]
    fn unknown_token_parses_as_in_transit() {
        let status = DeliveryStatus::try_from("at_sorting_hub".to_string()).unwrap();
        assert_eq!(status, DeliveryStatus::InTransit("at_sorting_hub".to_string()));
    }

    #[test]
    fn empty_token_rejected() {
        assert!(DeliveryStatus::try_from("  ".to_string()).is_err());
    }

    #[test]
    fn forward_moves_are_legal() {
        use DeliveryStatus::*;
        assert!(ParcelCreated.can_transition(&ParcelPaid));
        assert!(ParcelCreated.can_transition(&PendingPickup));
        assert!(ParcelPaid.can_transition(&DriverAssigned));
        assert!(PendingPickup.can_transition(&DriverAssigned));
        assert!(DriverAssigned.can_transition(&InTransit("on_the_way".into())));
        assert!(InTransit("on_the_way".into()).can_transition(&ParcelDelivered));
        assert!(DriverAssigned.can_transition(&ParcelDelivered));
    }

    #[test]
    fn backward_and_terminal_moves_are_rejected() {
        use DeliveryStatus::*;
        assert!(ParcelPaid.transition(&ParcelCreated).is_err());
        assert!(ParcelDelivered.transition(&DriverAssigned).is_err());
        assert!(ParcelCreated.transition(&ParcelDelivered).is_err());
    }

    #[test]
    fn same_status_is_idempotent() {
        use DeliveryStatus::*;
        assert!(PendingPickup.transition(&PendingPickup).is_ok());
        assert!(ParcelDelivered.transition(&ParcelDelivered).is_ok());
    }
}
