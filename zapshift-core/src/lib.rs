pub mod identity;
pub mod parcel;
pub mod payment;
pub mod repository;
pub mod rider;
pub mod tracking;
pub mod user;

pub use identity::{IdentityError, IdentityVerifier, Principal};
pub use parcel::{
    DeliveryStatus, InvalidTransition, Parcel, ParcelDraft, ParcelFilter, PaymentStatus,
    RiderAssignment,
};
pub use payment::{
    CheckoutRequest, CheckoutSession, GatewayError, GatewaySession, PaymentGateway, PaymentReceipt,
    SessionPaymentStatus,
};
pub use rider::{Rider, RiderDraft, RiderFilter, RiderStatus, WorkStatus};
pub use tracking::{generate_tracking_id, GenerationError, TrackingLogEntry, TRACKING_PREFIX};
pub use user::{Role, User};

/// Failure surface of the storage layer, shared by every repository trait.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("duplicate record: {0}")]
    Conflict(String),
    #[error("storage backend failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
