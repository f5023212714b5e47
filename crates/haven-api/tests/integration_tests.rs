//! # Integration Tests for haven-api
//!
//! Exercises the full application → lease → payment lifecycle over the
//! HTTP surface: submission, review, approval with lease auto-creation,
//! acceptance with deposit materialization, two-party signature, the
//! claim/verify settlement, the notification inbox, authentication, and
//! compare-and-set conflict behavior.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use haven_api::auth::SecretString;
use haven_api::state::{AppConfig, AppState};

/// Helper: build the test app with auth disabled (demo header profile).
fn test_app() -> axum::Router {
    haven_api::app(AppState::new())
}

/// Helper: build the test app with bearer auth enabled.
fn test_app_with_auth(token: &str) -> axum::Router {
    let config = AppConfig {
        auth_token: Some(SecretString::new(token)),
        ..AppConfig::default()
    };
    haven_api::app(AppState::with_config(config, None))
}

/// Helper: build a request with the demo identity headers.
fn request(method: &str, uri: &str, role: &str, actor: Uuid, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-haven-role", role)
        .header("x-haven-actor", actor.to_string());
    match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Helper: read a response body as JSON.
async fn body_json(response: axum::http::Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Helper: a complete applicant document against a listing owned by
/// `landlord`.
fn applicant_document(landlord: Uuid) -> Value {
    json!({
        "property_id": Uuid::new_v4(),
        "landlord_id": landlord,
        "step": 4,
        "personal_info": {"name": "Jordan Baker", "phone": "555-0100"},
        "employment": {"employer": "Gatsby & Co", "monthly_income_cents": 650000},
        "references": [{"name": "Nick C.", "relationship": "prior landlord"}],
        "disclosures": {"pets": false, "smoker": false},
        "terms": {
            "monthly_rent": 180000,
            "security_deposit": 360000,
            "rent_due_day": 1,
            "start_date": "2025-10-01",
            "end_date": "2026-09-30"
        }
    })
}

struct Tenancy {
    app: axum::Router,
    tenant: Uuid,
    landlord: Uuid,
    application_id: String,
    lease_id: String,
}

/// Drive a fresh application through submission, review, and approval;
/// returns the ids of the auto-created lease and its parties.
async fn approved_tenancy() -> Tenancy {
    let app = test_app();
    let tenant = Uuid::new_v4();
    let landlord = Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/applications",
            "tenant",
            tenant,
            Some(applicant_document(landlord)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let application_id = body["data"]["id"].as_str().unwrap().to_string();

    for target in ["under_review", "approved"] {
        let response = app
            .clone()
            .oneshot(request(
                "PATCH",
                &format!("/v1/applications/{application_id}/status"),
                "landlord",
                landlord,
                Some(json!({"status": target})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "advance to {target}");
    }

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/v1/applications/{application_id}/lease"),
            "tenant",
            tenant,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let lease_id = body["data"]["id"].as_str().unwrap().to_string();

    Tenancy {
        app,
        tenant,
        landlord,
        application_id,
        lease_id,
    }
}

/// Drive a tenancy through acceptance and both signatures.
async fn signed_tenancy() -> Tenancy {
    let t = approved_tenancy().await;
    let response = t
        .app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/leases/{}/accept", t.lease_id),
            "tenant",
            t.tenant,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    for (role, actor) in [("tenant", t.tenant), ("landlord", t.landlord)] {
        let response = t
            .app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/v1/leases/{}/sign", t.lease_id),
                role,
                actor,
                Some(json!({"signer_role": role})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    t
}

/// Payments on the tenancy's lease, as seen by the tenant.
async fn lease_payments(t: &Tenancy) -> Vec<Value> {
    let response = t
        .app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/v1/leases/{}/payments", t.lease_id),
            "tenant",
            t.tenant,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"]
        .as_array()
        .unwrap()
        .clone()
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let response = test_app()
        .oneshot(Request::builder().uri("/health/liveness").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readiness_probe() {
    let response = test_app()
        .oneshot(Request::builder().uri("/health/readiness").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_endpoint_is_unauthenticated() {
    let app = test_app_with_auth("sekret");
    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// -- Authentication -----------------------------------------------------------

#[tokio::test]
async fn test_auth_rejects_missing_token() {
    let app = test_app_with_auth("sekret");
    let response = app
        .oneshot(Request::builder().uri("/v1/notifications").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_rejects_wrong_secret() {
    let app = test_app_with_auth("sekret");
    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/notifications")
                .header(
                    "authorization",
                    format!("Bearer wrong.tenant.{}", Uuid::new_v4()),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_accepts_valid_token() {
    let app = test_app_with_auth("sekret");
    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/notifications")
                .header(
                    "authorization",
                    format!("Bearer sekret.tenant.{}", Uuid::new_v4()),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_auth_rejects_unknown_role_in_token() {
    let app = test_app_with_auth("sekret");
    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/notifications")
                .header(
                    "authorization",
                    format!("Bearer sekret.superuser.{}", Uuid::new_v4()),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_bypasses_auth() {
    let app = test_app_with_auth("sekret");
    let response = app
        .oneshot(Request::builder().uri("/health/liveness").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// -- Envelope contract --------------------------------------------------------

#[tokio::test]
async fn test_success_envelope_shape() {
    let t = approved_tenancy().await;
    let response = t
        .app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/v1/applications/{}", t.application_id),
            "tenant",
            t.tenant,
            None,
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert!(body["data"].is_object());
    assert!(body.get("message").is_some());
}

#[tokio::test]
async fn test_failure_envelope_shape() {
    let app = test_app();
    let response = app
        .oneshot(request(
            "GET",
            &format!("/v1/applications/{}", Uuid::new_v4()),
            "admin",
            Uuid::new_v4(),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert!(body["error"]["message"].is_string());
}

// -- Application validation ---------------------------------------------------

#[tokio::test]
async fn test_submission_missing_section_is_400() {
    let app = test_app();
    let mut doc = applicant_document(Uuid::new_v4());
    doc["employment"] = Value::Null;
    let response = app
        .oneshot(request("POST", "/v1/applications", "tenant", Uuid::new_v4(), Some(doc)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["message"].as_str().unwrap().contains("employment"));
}

#[tokio::test]
async fn test_zero_rent_listing_is_400() {
    let app = test_app();
    let mut doc = applicant_document(Uuid::new_v4());
    doc["terms"]["monthly_rent"] = json!(0);
    let response = app
        .oneshot(request("POST", "/v1/applications", "tenant", Uuid::new_v4(), Some(doc)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_landlord_cannot_submit_application() {
    let app = test_app();
    let response = app
        .oneshot(request(
            "POST",
            "/v1/applications",
            "landlord",
            Uuid::new_v4(),
            Some(applicant_document(Uuid::new_v4())),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// -- Scenario 1: approval auto-creates the lease ------------------------------

#[tokio::test]
async fn test_approval_creates_lease_sent() {
    let t = approved_tenancy().await;
    let response = t
        .app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/v1/leases/{}", t.lease_id),
            "tenant",
            t.tenant,
            None,
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "lease_sent");
    assert_eq!(body["data"]["application_id"].as_str().unwrap(), t.application_id);
}

#[tokio::test]
async fn test_submission_notifies_landlord_and_applicant() {
    let t = approved_tenancy().await;
    let response = t
        .app
        .clone()
        .oneshot(request("GET", "/v1/notifications", "landlord", t.landlord, None))
        .await
        .unwrap();
    let body = body_json(response).await;
    let kinds: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"application_submitted"));

    // The applicant's confirmation copy and the decision notice.
    let response = t
        .app
        .clone()
        .oneshot(request("GET", "/v1/notifications", "tenant", t.tenant, None))
        .await
        .unwrap();
    let body = body_json(response).await;
    let kinds: Vec<String> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["kind"].as_str().unwrap().to_string())
        .collect();
    assert!(kinds.contains(&"application_submitted".to_string()));
    assert!(kinds.contains(&"application_approved".to_string()));
    assert!(kinds.contains(&"lease_sent".to_string()));
}

// -- Scenario 2: acceptance materializes the deposit --------------------------

#[tokio::test]
async fn test_acceptance_creates_deposit_obligation() {
    let t = approved_tenancy().await;
    let response = t
        .app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/leases/{}/accept", t.lease_id),
            "tenant",
            t.tenant,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "lease_accepted");

    let payments = lease_payments(&t).await;
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0]["kind"], "security_deposit");
    assert_eq!(payments[0]["status"], "pending");
    assert_eq!(payments[0]["amount"], json!(360000));
}

#[tokio::test]
async fn test_landlord_cannot_accept() {
    let t = approved_tenancy().await;
    let response = t
        .app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/leases/{}/accept", t.lease_id),
            "landlord",
            t.landlord,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// -- Scenarios 3 & 4: two-party signature -------------------------------------

#[tokio::test]
async fn test_partial_signature_holds_lease_accepted() {
    let t = approved_tenancy().await;
    t.app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/leases/{}/accept", t.lease_id),
            "tenant",
            t.tenant,
            None,
        ))
        .await
        .unwrap();

    let response = t
        .app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/leases/{}/sign", t.lease_id),
            "tenant",
            t.tenant,
            Some(json!({"signer_role": "tenant"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "lease_accepted", "co-signer still pending");

    // No rent obligation yet.
    let payments = lease_payments(&t).await;
    assert!(payments.iter().all(|p| p["kind"] != "rent"));

    let response = t
        .app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/leases/{}/sign", t.lease_id),
            "landlord",
            t.landlord,
            Some(json!({"signer_role": "landlord"})),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "lease_signed");

    let payments = lease_payments(&t).await;
    let rent: Vec<&Value> = payments.iter().filter(|p| p["kind"] == "rent").collect();
    assert_eq!(rent.len(), 1, "first rent obligation materialized");
    assert_eq!(rent[0]["amount"], json!(180000));
    assert_eq!(rent[0]["status"], "pending");
}

#[tokio::test]
async fn test_signer_role_must_match_caller() {
    let t = approved_tenancy().await;
    t.app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/leases/{}/accept", t.lease_id),
            "tenant",
            t.tenant,
            None,
        ))
        .await
        .unwrap();
    let response = t
        .app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/leases/{}/sign", t.lease_id),
            "tenant",
            t.tenant,
            Some(json!({"signer_role": "landlord"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_retried_signature_is_idempotent() {
    let t = signed_tenancy().await;
    let response = t
        .app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/leases/{}/sign", t.lease_id),
            "landlord",
            t.landlord,
            Some(json!({"signer_role": "landlord"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "lease_signed");

    let payments = lease_payments(&t).await;
    let rent_count = payments.iter().filter(|p| p["kind"] == "rent").count();
    assert_eq!(rent_count, 1, "retried signature must not duplicate rent");
}

// -- Scenario 5: claim and verify ---------------------------------------------

#[tokio::test]
async fn test_claim_verify_settlement() {
    let t = signed_tenancy().await;
    let payments = lease_payments(&t).await;
    let rent_id = payments
        .iter()
        .find(|p| p["kind"] == "rent")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    // Tenant claims.
    let response = t
        .app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/payments/{rent_id}/mark-paid"),
            "tenant",
            t.tenant,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "paid");
    assert!(body["data"]["paid_at"].is_string());

    // Retried claim: 200, unchanged.
    let response = t
        .app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/payments/{rent_id}/mark-paid"),
            "tenant",
            t.tenant,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Landlord verifies.
    let response = t
        .app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/payments/{rent_id}/verify"),
            "landlord",
            t.landlord,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "verified");
    assert_eq!(body["data"]["verified_by"].as_str().unwrap(), t.landlord.to_string());

    // A claim against a settled obligation is a hard 409.
    let response = t
        .app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/payments/{rent_id}/mark-paid"),
            "tenant",
            t.tenant,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_verify_before_claim_is_409() {
    let t = signed_tenancy().await;
    let payments = lease_payments(&t).await;
    let rent_id = payments
        .iter()
        .find(|p| p["kind"] == "rent")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = t
        .app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/payments/{rent_id}/verify"),
            "landlord",
            t.landlord,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_tenant_cannot_verify_own_claim() {
    let t = signed_tenancy().await;
    let payments = lease_payments(&t).await;
    let rent_id = payments
        .iter()
        .find(|p| p["kind"] == "rent")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    t.app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/payments/{rent_id}/mark-paid"),
            "tenant",
            t.tenant,
            None,
        ))
        .await
        .unwrap();
    let response = t
        .app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/payments/{rent_id}/verify"),
            "tenant",
            t.tenant,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_claim_notifies_landlord_exactly_once() {
    let t = signed_tenancy().await;
    let payments = lease_payments(&t).await;
    let rent_id = payments
        .iter()
        .find(|p| p["kind"] == "rent")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    for _ in 0..2 {
        t.app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/v1/payments/{rent_id}/mark-paid"),
                "tenant",
                t.tenant,
                None,
            ))
            .await
            .unwrap();
    }

    let response = t
        .app
        .clone()
        .oneshot(request("GET", "/v1/notifications", "landlord", t.landlord, None))
        .await
        .unwrap();
    let body = body_json(response).await;
    let claims = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| n["kind"] == "payment_marked_paid")
        .count();
    assert_eq!(claims, 1, "retried claim must not duplicate the notification");
}

// -- Scenario 6: compare-and-set conflict -------------------------------------

#[tokio::test]
async fn test_racing_advances_one_wins_one_conflicts() {
    let app = test_app();
    let tenant = Uuid::new_v4();
    let landlord = Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/applications",
            "tenant",
            tenant,
            Some(applicant_document(landlord)),
        ))
        .await
        .unwrap();
    let application_id = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();
    app.clone()
        .oneshot(request(
            "PATCH",
            &format!("/v1/applications/{application_id}/status"),
            "landlord",
            landlord,
            Some(json!({"status": "under_review"})),
        ))
        .await
        .unwrap();

    // Two actors race from the same observed status toward different
    // targets; the stores serialize them and the loser's expectation is
    // stale.
    let first = app.clone().oneshot(request(
        "PATCH",
        &format!("/v1/applications/{application_id}/status"),
        "landlord",
        landlord,
        Some(json!({"status": "approved", "expected_status": "under_review"})),
    ));
    let second = app.clone().oneshot(request(
        "PATCH",
        &format!("/v1/applications/{application_id}/status"),
        "admin",
        Uuid::new_v4(),
        Some(json!({"status": "background_check", "expected_status": "under_review"})),
    ));
    let (first, second) = tokio::join!(first, second);
    let statuses = [first.unwrap().status(), second.unwrap().status()];

    assert!(statuses.contains(&StatusCode::OK), "exactly one must win: {statuses:?}");
    assert!(
        statuses.contains(&StatusCode::CONFLICT),
        "the loser must get 409: {statuses:?}"
    );
}

#[tokio::test]
async fn test_approval_with_held_lease_draft() {
    let app = test_app();
    let tenant = Uuid::new_v4();
    let landlord = Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/applications",
            "tenant",
            tenant,
            Some(applicant_document(landlord)),
        ))
        .await
        .unwrap();
    let application_id = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    app.clone()
        .oneshot(request(
            "PATCH",
            &format!("/v1/applications/{application_id}/status"),
            "landlord",
            landlord,
            Some(json!({"status": "under_review"})),
        ))
        .await
        .unwrap();
    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/v1/applications/{application_id}/status"),
            "landlord",
            landlord,
            Some(json!({"status": "approved", "send_lease": false})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/v1/applications/{application_id}/lease"),
            "landlord",
            landlord,
            None,
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "draft");
    let lease_id = body["data"]["id"].as_str().unwrap().to_string();

    // The tenant cannot accept a lease that was never sent.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/leases/{lease_id}/accept"),
            "tenant",
            tenant,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // The landlord sends it; acceptance becomes possible.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/leases/{lease_id}/send"),
            "landlord",
            landlord,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "lease_sent");

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/leases/{lease_id}/accept"),
            "tenant",
            tenant,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// -- Review flow edges --------------------------------------------------------

#[tokio::test]
async fn test_tenant_cannot_advance_review() {
    let app = test_app();
    let tenant = Uuid::new_v4();
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/applications",
            "tenant",
            tenant,
            Some(applicant_document(Uuid::new_v4())),
        ))
        .await
        .unwrap();
    let application_id = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .oneshot(request(
            "PATCH",
            &format!("/v1/applications/{application_id}/status"),
            "tenant",
            tenant,
            Some(json!({"status": "under_review"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_skipping_review_is_409() {
    let app = test_app();
    let landlord = Uuid::new_v4();
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/applications",
            "tenant",
            Uuid::new_v4(),
            Some(applicant_document(landlord)),
        ))
        .await
        .unwrap();
    let application_id = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .oneshot(request(
            "PATCH",
            &format!("/v1/applications/{application_id}/status"),
            "landlord",
            landlord,
            Some(json!({"status": "approved"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_foreign_tenant_sees_404() {
    let t = approved_tenancy().await;
    let response = t
        .app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/v1/applications/{}", t.application_id),
            "tenant",
            Uuid::new_v4(),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// -- Notifications ------------------------------------------------------------

#[tokio::test]
async fn test_mark_read_is_idempotent() {
    let t = approved_tenancy().await;
    let response = t
        .app
        .clone()
        .oneshot(request("GET", "/v1/notifications", "landlord", t.landlord, None))
        .await
        .unwrap();
    let body = body_json(response).await;
    let id = body["data"][0]["id"].as_str().unwrap().to_string();

    let first = t
        .app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/v1/notifications/{id}/read"),
            "landlord",
            t.landlord,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let read_at = body_json(first).await["data"]["read_at"].clone();
    assert!(read_at.is_string());

    let second = t
        .app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/v1/notifications/{id}/read"),
            "landlord",
            t.landlord,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(
        body_json(second).await["data"]["read_at"],
        read_at,
        "read_at must not move on repeat reads"
    );
}

#[tokio::test]
async fn test_foreign_notification_read_is_404() {
    let t = approved_tenancy().await;
    let response = t
        .app
        .clone()
        .oneshot(request("GET", "/v1/notifications", "landlord", t.landlord, None))
        .await
        .unwrap();
    let id = body_json(response).await["data"][0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = t
        .app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/v1/notifications/{id}/read"),
            "tenant",
            t.tenant,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mark_all_read_counts_and_idempotent() {
    let t = approved_tenancy().await;
    let response = t
        .app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/notifications/mark-all-read",
            "tenant",
            t.tenant,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let count = body_json(response).await["data"]["count"].as_u64().unwrap();
    assert!(count >= 2, "submission copy and approval notice expected, got {count}");

    let response = t
        .app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/notifications/mark-all-read",
            "tenant",
            t.tenant,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["data"]["count"], json!(0));

    let response = t
        .app
        .clone()
        .oneshot(request(
            "GET",
            "/v1/notifications?unread_only=true",
            "tenant",
            t.tenant,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 0);
}

// -- OpenAPI ------------------------------------------------------------------

#[tokio::test]
async fn test_openapi_spec_served() {
    let app = test_app();
    let response = app
        .oneshot(request("GET", "/openapi.json", "admin", Uuid::new_v4(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["paths"]["/v1/applications"].is_object());
}
