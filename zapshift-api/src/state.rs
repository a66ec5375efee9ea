use std::sync::Arc;

use zapshift_core::identity::IdentityVerifier;
use zapshift_core::repository::UserRepository;
use zapshift_delivery::{ParcelLifecycle, PaymentService, RiderService};

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<ParcelLifecycle>,
    pub riders: Arc<RiderService>,
    pub payments: Arc<PaymentService>,
    pub users: Arc<dyn UserRepository>,
    pub verifier: Arc<dyn IdentityVerifier>,
}
