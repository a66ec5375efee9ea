use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zapshift_api::{app, auth::JwtVerifier, state::AppState};
use zapshift_core::identity::IdentityVerifier;
use zapshift_core::repository::{
    ParcelRepository, PaymentRepository, RiderRepository, TrackingLogRepository, UserRepository,
};
use zapshift_delivery::{
    CheckoutSettings, MockPaymentGateway, ParcelLifecycle, PaymentService, RiderAvailability,
    RiderService,
};
use zapshift_store::{
    app_config::Config, DbClient, PgParcelRepository, PgPaymentRepository, PgRiderRepository,
    PgTrackingLogRepository, PgUserRepository,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "zapshift_api=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("failed to load config")?;
    tracing::info!("Starting ZapShift API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .context("failed to connect to Postgres")?;
    db.migrate().await.context("failed to run migrations")?;

    let parcels: Arc<dyn ParcelRepository> = Arc::new(PgParcelRepository::new(db.pool.clone()));
    let payments_repo: Arc<dyn PaymentRepository> =
        Arc::new(PgPaymentRepository::new(db.pool.clone()));
    let riders_repo: Arc<dyn RiderRepository> = Arc::new(PgRiderRepository::new(db.pool.clone()));
    let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(db.pool.clone()));
    let logs: Arc<dyn TrackingLogRepository> =
        Arc::new(PgTrackingLogRepository::new(db.pool.clone()));

    let availability = RiderAvailability::new(riders_repo.clone());
    let lifecycle = Arc::new(ParcelLifecycle::new(
        parcels.clone(),
        logs,
        availability.clone(),
    ));
    let riders = Arc::new(RiderService::new(riders_repo, users.clone()));

    // Stand-in gateway until the hosted checkout integration lands.
    let gateway = Arc::new(MockPaymentGateway::new());
    let payments = Arc::new(PaymentService::new(
        gateway,
        payments_repo,
        parcels,
        CheckoutSettings {
            site_domain: config.payments.site_domain.clone(),
            currency: config.payments.currency.clone(),
        },
    ));

    let verifier: Arc<dyn IdentityVerifier> =
        Arc::new(JwtVerifier::new(config.auth.jwt_secret.clone()));

    let app_state = AppState {
        lifecycle,
        riders,
        payments,
        users,
        verifier,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
