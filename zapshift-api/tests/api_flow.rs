use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use zapshift_api::{app, AppState};
use zapshift_core::identity::{IdentityVerifier, MockIdentityVerifier};
use zapshift_core::payment::{GatewaySession, SessionPaymentStatus};
use zapshift_core::repository::{
    ParcelRepository, PaymentRepository, RiderRepository, TrackingLogRepository, UserRepository,
};
use zapshift_core::{Role, User};
use zapshift_delivery::{
    CheckoutSettings, MockPaymentGateway, ParcelLifecycle, PaymentService, RiderAvailability,
    RiderService,
};
use zapshift_store::MemoryStore;

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    gateway: Arc<MockPaymentGateway>,
}

fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());

    let parcels: Arc<dyn ParcelRepository> = store.clone();
    let payments_repo: Arc<dyn PaymentRepository> = store.clone();
    let riders_repo: Arc<dyn RiderRepository> = store.clone();
    let users: Arc<dyn UserRepository> = store.clone();
    let logs: Arc<dyn TrackingLogRepository> = store.clone();

    let availability = RiderAvailability::new(riders_repo.clone());
    let lifecycle = Arc::new(ParcelLifecycle::new(parcels.clone(), logs, availability));
    let riders = Arc::new(RiderService::new(riders_repo, users.clone()));

    let gateway = Arc::new(MockPaymentGateway::new());
    let payments = Arc::new(PaymentService::new(
        gateway.clone(),
        payments_repo,
        parcels,
        CheckoutSettings {
            site_domain: "http://localhost:5173".to_string(),
            currency: "usd".to_string(),
        },
    ));

    let verifier: Arc<dyn IdentityVerifier> = Arc::new(MockIdentityVerifier);

    let router = app(AppState {
        lifecycle,
        riders,
        payments,
        users,
        verifier,
    });

    TestApp {
        router,
        store,
        gateway,
    }
}

async fn seed_user(store: &MemoryStore, name: &str, email: &str, role: Role) {
    let user = User::new(name.to_string(), email.to_string());
    UserRepository::insert(store, &user)
        .await
        .expect("seed user");
    if role != Role::User {
        store.set_role_by_email(email, role).await.expect("seed role");
    }
}

fn request(method: Method, uri: &str) -> axum::http::request::Builder {
    Request::builder().method(method).uri(uri)
}

fn json_body(body: Value) -> Body {
    Body::from(body.to_string())
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(req).await.expect("request");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

fn parcel_draft(sender_email: &str) -> Value {
    json!({
        "parcel_name": "Books",
        "sender_name": "Sender",
        "sender_email": sender_email,
        "receiver_name": "Receiver",
        "receiver_email": "receiver@example.com",
        "cost": 500,
    })
}

#[tokio::test]
async fn create_parcel_then_fetch_and_track() {
    let app = test_app();

    let req = request(Method::POST, "/parcels")
        .header(header::CONTENT_TYPE, "application/json")
        .body(json_body(parcel_draft("sender@example.com")))
        .expect("request");
    let (status, body) = send(&app.router, req).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["delivery_status"], "parcel_created");
    assert_eq!(body["payment_status"], "unpaid");
    let tracking_id = body["tracking_id"].as_str().expect("tracking id");
    assert!(tracking_id.starts_with("ZS-"));
    let id = body["id"].as_str().expect("parcel id");

    let req = request(Method::GET, &format!("/parcels/{id}"))
        .body(Body::empty())
        .expect("request");
    let (status, fetched) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], body["id"]);

    let req = request(Method::GET, &format!("/tracking/{tracking_id}/logs"))
        .body(Body::empty())
        .expect("request");
    let (status, logs) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::OK);
    let logs = logs.as_array().expect("log array");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["status"], "parcel_created");
}

#[tokio::test]
async fn parcel_list_filters_by_sender_email() {
    let app = test_app();

    for email in ["a@example.com", "b@example.com"] {
        let req = request(Method::POST, "/parcels")
            .header(header::CONTENT_TYPE, "application/json")
            .body(json_body(parcel_draft(email)))
            .expect("request");
        let (status, _) = send(&app.router, req).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let req = request(Method::GET, "/parcels?email=a@example.com")
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::OK);
    let parcels = body.as_array().expect("parcel array");
    assert_eq!(parcels.len(), 1);
    assert_eq!(parcels[0]["sender_email"], "a@example.com");
}

#[tokio::test]
async fn illegal_status_change_is_rejected() {
    let app = test_app();

    let req = request(Method::POST, "/parcels")
        .header(header::CONTENT_TYPE, "application/json")
        .body(json_body(parcel_draft("sender@example.com")))
        .expect("request");
    let (_, parcel) = send(&app.router, req).await;
    let id = parcel["id"].as_str().expect("parcel id");

    // parcel_created cannot jump straight to parcel_delivered
    let req = request(Method::PATCH, &format!("/parcels/{id}/status"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(json_body(json!({ "delivery_status": "parcel_delivered" })))
        .expect("request");
    let (status, body) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_kind"], "validation");
}

#[tokio::test]
async fn unknown_parcel_is_404() {
    let app = test_app();

    let req = request(Method::GET, &format!("/parcels/{}", Uuid::new_v4()))
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_kind"], "not_found");
}

#[tokio::test]
async fn user_listing_requires_admin() {
    let app = test_app();
    seed_user(&app.store, "Plain", "plain@example.com", Role::User).await;
    seed_user(&app.store, "Admin", "admin@example.com", Role::Admin).await;

    // No credential at all
    let req = request(Method::GET, "/users")
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "unauthorized access");

    // Verified but not an admin
    let req = request(Method::GET, "/users")
        .header(header::AUTHORIZATION, "Bearer test:plain@example.com")
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "forbidden access");

    let req = request(Method::GET, "/users?search_text=plain")
        .header(header::AUTHORIZATION, "Bearer test:admin@example.com")
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::OK);
    let users = body.as_array().expect("user array");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["email"], "plain@example.com");
}

#[tokio::test]
async fn user_registration_is_idempotent_on_email() {
    let app = test_app();

    let body = json!({ "name": "Dana", "email": "dana@example.com" });
    let req = request(Method::POST, "/users")
        .header(header::CONTENT_TYPE, "application/json")
        .body(json_body(body.clone()))
        .expect("request");
    let (status, created) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["role"], "user");

    let req = request(Method::POST, "/users")
        .header(header::CONTENT_TYPE, "application/json")
        .body(json_body(body))
        .expect("request");
    let (status, repeated) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(repeated["message"], "user exists");
}

#[tokio::test]
async fn registration_answers_user_exists_for_store_level_duplicates() {
    let app = test_app();
    // Account created outside this request, as by a racing registration.
    seed_user(&app.store, "Dana", "dana@example.com", Role::User).await;

    let req = request(Method::POST, "/users")
        .header(header::CONTENT_TYPE, "application/json")
        .body(json_body(json!({ "name": "Dana", "email": "dana@example.com" })))
        .expect("request");
    let (status, body) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "user exists");
}

#[tokio::test]
async fn role_lookup_defaults_to_user() {
    let app = test_app();

    let req = request(Method::GET, "/users/nobody@example.com/role")
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "user");
}

#[tokio::test]
async fn rider_approval_promotes_account() {
    let app = test_app();
    seed_user(&app.store, "Admin", "admin@example.com", Role::Admin).await;
    seed_user(&app.store, "Rita", "rita@example.com", Role::User).await;

    let req = request(Method::POST, "/riders")
        .header(header::CONTENT_TYPE, "application/json")
        .body(json_body(json!({
            "name": "Rita",
            "email": "rita@example.com",
            "district": "Dhaka",
        })))
        .expect("request");
    let (status, rider) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rider["status"], "pending");
    let rider_id = rider["id"].as_str().expect("rider id");

    // Approval is admin-only
    let req = request(Method::PATCH, &format!("/riders/{rider_id}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(json_body(json!({ "status": "approved" })))
        .expect("request");
    let (status, _) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = request(Method::PATCH, &format!("/riders/{rider_id}"))
        .header(header::AUTHORIZATION, "Bearer test:admin@example.com")
        .header(header::CONTENT_TYPE, "application/json")
        .body(json_body(json!({ "status": "approved" })))
        .expect("request");
    let (status, approved) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");

    let req = request(Method::GET, "/users/rita@example.com/role")
        .body(Body::empty())
        .expect("request");
    let (_, body) = send(&app.router, req).await;
    assert_eq!(body["role"], "rider");
}

#[tokio::test]
async fn payment_history_is_scoped_to_the_caller() {
    let app = test_app();

    let req = request(Method::GET, "/payments?email=other@example.com")
        .header(header::AUTHORIZATION, "Bearer test:me@example.com")
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Forbidden access");

    let req = request(Method::GET, "/payments?email=me@example.com")
        .header(header::AUTHORIZATION, "Bearer test:me@example.com")
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn payment_success_settles_once() {
    let app = test_app();

    let req = request(Method::POST, "/parcels")
        .header(header::CONTENT_TYPE, "application/json")
        .body(json_body(parcel_draft("payer@example.com")))
        .expect("request");
    let (_, parcel) = send(&app.router, req).await;
    let parcel_id: Uuid = serde_json::from_value(parcel["id"].clone()).expect("parcel id");

    app.gateway.put_session(
        "cs_test_1",
        GatewaySession {
            payment_intent: "pi_test_1".to_string(),
            payment_status: SessionPaymentStatus::Paid,
            amount_total: 500,
            currency: "usd".to_string(),
            customer_email: "payer@example.com".to_string(),
            parcel_id,
            parcel_name: "Books".to_string(),
        },
    );

    let req = request(Method::PATCH, "/payments/success?session_id=cs_test_1")
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["transaction_id"], "pi_test_1");
    assert_eq!(body["payment_info"]["amount"], 5.0);

    // Redelivery of the same session reports the prior settlement
    let req = request(Method::PATCH, "/payments/success?session_id=cs_test_1")
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "already exist");
    assert_eq!(body["transaction_id"], "pi_test_1");

    let req = request(Method::GET, &format!("/parcels/{parcel_id}"))
        .body(Body::empty())
        .expect("request");
    let (_, fetched) = send(&app.router, req).await;
    assert_eq!(fetched["payment_status"], "paid");
    assert_eq!(fetched["delivery_status"], "parcel_paid");
}

#[tokio::test]
async fn unpaid_session_is_reported_not_settled() {
    let app = test_app();

    app.gateway.put_session(
        "cs_test_2",
        GatewaySession {
            payment_intent: "pi_test_2".to_string(),
            payment_status: SessionPaymentStatus::Unpaid,
            amount_total: 500,
            currency: "usd".to_string(),
            customer_email: "payer@example.com".to_string(),
            parcel_id: Uuid::new_v4(),
            parcel_name: "Books".to_string(),
        },
    );

    let req = request(Method::PATCH, "/payments/success?session_id=cs_test_2")
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn checkout_session_returns_redirect_url() {
    let app = test_app();

    let req = request(Method::POST, "/payments/checkout-session")
        .header(header::CONTENT_TYPE, "application/json")
        .body(json_body(json!({
            "parcel_id": Uuid::new_v4(),
            "parcel_name": "Books",
            "cost": 500,
            "sender_email": "payer@example.com",
        })))
        .expect("request");
    let (status, body) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::OK);
    let url = body["url"].as_str().expect("checkout url");
    assert!(url.contains("/c/cs_mock_"));
}
