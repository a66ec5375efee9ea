use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Onboarding approval state of a rider application.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiderStatus {
    Pending,
    Approved,
    Rejected,
}

impl RiderStatus {
    pub fn as_token(&self) -> &'static str {
        match self {
            RiderStatus::Pending => "pending",
            RiderStatus::Approved => "approved",
            RiderStatus::Rejected => "rejected",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "pending" => Some(RiderStatus::Pending),
            "approved" => Some(RiderStatus::Approved),
            "rejected" => Some(RiderStatus::Rejected),
            _ => None,
        }
    }
}

/// Current availability of a rider for new assignments. `InDelivery` means
/// the rider is attached to exactly one non-delivered parcel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    Available,
    InDelivery,
}

impl WorkStatus {
    pub fn as_token(&self) -> &'static str {
        match self {
            WorkStatus::Available => "available",
            WorkStatus::InDelivery => "in_delivery",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "available" => Some(WorkStatus::Available),
            "in_delivery" => Some(WorkStatus::InDelivery),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rider {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub district: String,
    pub status: RiderStatus,
    pub work_status: WorkStatus,
    pub created_at: DateTime<Utc>,
}

impl Rider {
    /// New applications start pending and available.
    pub fn new(draft: RiderDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            email: draft.email,
            district: draft.district,
            status: RiderStatus::Pending,
            work_status: WorkStatus::Available,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RiderDraft {
    pub name: String,
    pub email: String,
    pub district: String,
}

/// Equality filter over the rider collection; `None` fields are wildcards.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RiderFilter {
    pub status: Option<RiderStatus>,
    pub district: Option<String>,
    pub work_status: Option<WorkStatus>,
}
