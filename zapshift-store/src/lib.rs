pub mod app_config;
pub mod database;
pub mod memory;
pub mod parcel_repo;
pub mod payment_repo;
pub mod rider_repo;
pub mod tracking_repo;
pub mod user_repo;

pub use database::DbClient;
pub use memory::MemoryStore;
pub use parcel_repo::PgParcelRepository;
pub use payment_repo::PgPaymentRepository;
pub use rider_repo::PgRiderRepository;
pub use tracking_repo::PgTrackingLogRepository;
pub use user_repo::PgUserRepository;

use zapshift_core::StoreError;

/// Collapse driver-level failures into the shared store taxonomy.
pub(crate) fn map_sqlx(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_string())
        }
        sqlx::Error::RowNotFound => StoreError::NotFound(err.to_string()),
        _ => StoreError::Backend(err.to_string()),
    }
}
