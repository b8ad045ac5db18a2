//! The assembled application: routes, middleware chain and error envelope

mod common;

use actix_web::{test, web};
use serde_json::{json, Value};

use common::{bearer, limiter, state, token_service, token_service_with, FailingStore};
use qd_api::{create_app, AppState};
use qd_core::services::token::TokenServiceConfig;
use qd_shared::config::AuthConfig;

#[actix_web::test]
async fn test_me_reports_identity() {
    let service = token_service();
    let pair = service.generate_token_pair(123, "alice", "user").unwrap();
    let app = test::init_service(create_app(state(service, Some(limiter(20, 10.0))))).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/me")
        .insert_header(bearer(&pair.access_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user_id"], 123);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], "user");
}

#[actix_web::test]
async fn test_admin_route_requires_admin() {
    let service = token_service();
    let user = service.generate_token_pair(123, "alice", "user").unwrap();
    let admin = service.generate_token_pair(1, "root", "admin").unwrap();
    let app = test::init_service(create_app(state(service, Some(limiter(20, 10.0))))).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/status")
        .insert_header(bearer(&user.access_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "INSUFFICIENT_PERMISSIONS");
    assert_eq!(body["details"]["required_roles"], json!(["admin"]));
    assert_eq!(body["details"]["actual_role"], "user");

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/status")
        .insert_header(bearer(&admin.access_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["revocation_store"], "memory");
    assert_eq!(body["rate_limit"]["enabled"], true);
    assert_eq!(body["tokens"]["issuer"], "querydesk");
}

#[actix_web::test]
async fn test_refresh_token_on_access_route() {
    let service = token_service();
    let pair = service.generate_token_pair(123, "alice", "user").unwrap();
    let app = test::init_service(create_app(state(service, None))).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/me")
        .insert_header(bearer(&pair.refresh_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "INVALID_TOKEN");
    assert_eq!(body["message"], "Token is not an access token");
}

#[actix_web::test]
async fn test_refresh_rotates_and_rejects_reuse() {
    let service = token_service();
    let pair = service.generate_token_pair(7, "grace", "user").unwrap();
    let app = test::init_service(create_app(state(service, None))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .set_json(json!({ "refresh_token": pair.refresh_token }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 3600);
    let new_access = body["access_token"].as_str().unwrap().to_string();
    assert_ne!(body["refresh_token"], json!(pair.refresh_token));

    // The rotated access token works
    let req = test::TestRequest::get()
        .uri("/api/v1/me")
        .insert_header(bearer(&new_access))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    // The old refresh token is spent
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .set_json(json!({ "refresh_token": pair.refresh_token }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "TOKEN_REVOKED");
}

#[actix_web::test]
async fn test_refresh_rejects_access_token_and_bad_bodies() {
    let service = token_service();
    let pair = service.generate_token_pair(7, "grace", "user").unwrap();
    let app = test::init_service(create_app(state(service, None))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .set_json(json!({ "refresh_token": pair.access_token }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Token is not a refresh token");

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .set_json(json!({ "refresh_token": "" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .set_json(json!({ "token": "x" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[actix_web::test]
async fn test_refresh_fails_closed_when_store_is_down() {
    let service = token_service_with(FailingStore, TokenServiceConfig::default());
    let pair = service.generate_token_pair(8, "hal", "user").unwrap();
    let app = test::init_service(create_app(state(service, None))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .set_json(json!({ "refresh_token": pair.refresh_token }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 503);
}

#[actix_web::test]
async fn test_logout_revokes_access_and_refresh_tokens() {
    let service = token_service();
    let pair = service.generate_token_pair(42, "dana", "user").unwrap();
    let app = test::init_service(create_app(state(service, None))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/logout")
        .insert_header(bearer(&pair.access_token))
        .set_json(json!({ "refresh_token": pair.refresh_token }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::get()
        .uri("/api/v1/me")
        .insert_header(bearer(&pair.access_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "TOKEN_REVOKED");

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .set_json(json!({ "refresh_token": pair.refresh_token }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn test_logout_rejects_foreign_refresh_token() {
    let service = token_service();
    let mine = service.generate_token_pair(42, "dana", "user").unwrap();
    let theirs = service.generate_token_pair(43, "eli", "user").unwrap();
    let app = test::init_service(create_app(state(service, None))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/logout")
        .insert_header(bearer(&mine.access_token))
        .set_json(json!({ "refresh_token": theirs.refresh_token }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    // Nothing was revoked: both callers keep working sessions
    let req = test::TestRequest::get()
        .uri("/api/v1/me")
        .insert_header(bearer(&mine.access_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .set_json(json!({ "refresh_token": theirs.refresh_token }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
}

#[actix_web::test]
async fn test_logout_with_invalid_refresh_token_keeps_session() {
    let service = token_service();
    let pair = service.generate_token_pair(42, "dana", "user").unwrap();
    let app = test::init_service(create_app(state(service, None))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/logout")
        .insert_header(bearer(&pair.access_token))
        .set_json(json!({ "refresh_token": "not-a-token" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    let req = test::TestRequest::get()
        .uri("/api/v1/me")
        .insert_header(bearer(&pair.access_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
}

#[actix_web::test]
async fn test_logout_requires_authentication() {
    let app = test::init_service(create_app(state(token_service(), None))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/logout")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "MISSING_AUTH_HEADER");
}

#[actix_web::test]
async fn test_fail_closed_config_reaches_middleware() {
    let service = token_service_with(FailingStore, TokenServiceConfig::default());
    let pair = service.generate_token_pair(8, "hal", "user").unwrap();

    let mut auth = AuthConfig::default();
    auth.revocation.fail_closed = true;
    let state = web::Data::new(AppState::new(service, None).with_auth_config(auth));
    let app = test::init_service(create_app(state)).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/me")
        .insert_header(bearer(&pair.access_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 503);
}

#[actix_web::test]
async fn test_health_and_not_found() {
    let app = test::init_service(create_app(state(token_service(), None))).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["revocation_store"], "memory");
    assert_eq!(body["checks"]["database"], "disabled");

    let req = test::TestRequest::get().uri("/api/v1/nope").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}
