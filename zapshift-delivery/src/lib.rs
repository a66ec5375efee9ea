pub mod lifecycle;
pub mod payments;
pub mod riders;

pub use lifecycle::{LifecycleError, ParcelLifecycle};
pub use payments::{
    CheckoutDraft, CheckoutSettings, MockPaymentGateway, PaymentError, PaymentService,
    ReconcileOutcome,
};
pub use riders::{RiderAvailability, RiderService};
