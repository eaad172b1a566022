//! End-to-end draft, validate and finalize flows over HTTP.

use registration_intake::config::IntakeConfig;
use reqwest::{Method, StatusCode};
use serde_json::json;

mod common;
use common::{envelope, valid_form, TestGateway};

#[tokio::test]
async fn test_draft_lifecycle_and_finalize() {
    let gateway = TestGateway::start().await;

    let res = gateway
        .send(Method::POST, "/api/sessions", Some(&json!({ "last_name": "山田" })))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert!(res.headers().contains_key(common::CSRF_HEADER));
    let body = envelope(res).await;
    assert_eq!(body["success"], true);
    let session_id = body["data"]["session_id"].as_str().unwrap().to_string();
    let path = format!("/api/sessions/{session_id}");

    let res = gateway.client.get(gateway.url(&path)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = envelope(res).await;
    assert_eq!(body["data"]["state"], "draft");
    assert_eq!(body["data"]["payload"]["last_name"], "山田");
    assert_eq!(body["data"]["payload"]["first_name"], "");

    let res = gateway.send(Method::PUT, &path, Some(&valid_form())).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = gateway
        .send(Method::POST, &format!("{path}/finalize"), None)
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let receipt = envelope(res).await;
    assert_eq!(receipt["data"]["session_id"], session_id.as_str());
    let registration_id = receipt["data"]["registration_id"].clone();
    assert!(registration_id.is_string());

    // The draft is gone once promoted.
    let res = gateway.client.get(gateway.url(&path)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(envelope(res).await["error"]["code"], "SESSION_NOT_FOUND");

    // A retried finalize replays the same receipt.
    let res = gateway
        .send(Method::POST, &format!("{path}/finalize"), None)
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(envelope(res).await["data"]["registration_id"], registration_id);
}

#[tokio::test]
async fn test_autosave_rejects_malformed_fields() {
    let gateway = TestGateway::start().await;

    let res = gateway
        .send(Method::POST, "/api/sessions", Some(&json!({ "email": "not-an-email" })))
        .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = envelope(res).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
    assert!(body["error"]["details"]["email"].is_string());
}

#[tokio::test]
async fn test_non_object_body_is_a_validation_error() {
    let gateway = TestGateway::start().await;

    let res = gateway
        .send(Method::POST, "/api/sessions", Some(&json!(["not", "a", "form"])))
        .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(envelope(res).await["error"]["details"]["body"].is_string());
}

#[tokio::test]
async fn test_finalize_incomplete_draft_keeps_session_editable() {
    let gateway = TestGateway::start().await;

    let res = gateway
        .send(Method::POST, "/api/sessions", Some(&json!({ "last_name": "山田" })))
        .await;
    let session_id = envelope(res).await["data"]["session_id"]
        .as_str()
        .unwrap()
        .to_string();
    let path = format!("/api/sessions/{session_id}");

    let res = gateway
        .send(Method::POST, &format!("{path}/finalize"), None)
        .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = envelope(res).await;
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
    assert!(body["error"]["details"]["first_name"].is_string());

    let res = gateway.client.get(gateway.url(&path)).send().await.unwrap();
    let body = envelope(res).await;
    assert_eq!(body["data"]["state"], "draft");
    assert_eq!(body["data"]["payload"]["last_name"], "山田");
}

#[tokio::test]
async fn test_discard_session() {
    let gateway = TestGateway::start().await;

    let res = gateway.send(Method::POST, "/api/sessions", Some(&json!({}))).await;
    let session_id = envelope(res).await["data"]["session_id"]
        .as_str()
        .unwrap()
        .to_string();
    let path = format!("/api/sessions/{session_id}");

    let res = gateway.send(Method::DELETE, &path, None).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = gateway.send(Method::DELETE, &path, None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validate_endpoint() {
    let gateway = TestGateway::start().await;

    let res = gateway
        .send(Method::POST, "/api/validate", Some(&valid_form()))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(envelope(res).await["data"]["valid"], true);

    let mut form = valid_form();
    form["email_confirmation"] = json!("other@example.jp");
    let res = gateway.send(Method::POST, "/api/validate", Some(&form)).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = envelope(res).await;
    assert_eq!(
        body["error"]["details"]["email_confirmation"],
        "does not match email"
    );
}

#[tokio::test]
async fn test_validate_with_external_checks() {
    let gateway = TestGateway::start().await;

    let mut form = valid_form();
    form["prefecture"] = json!("沖縄県");
    form["plan_code"] = json!("PREMIUM");
    form["option_codes[0]"] = json!("OPT_PRM_STATIC_IP");
    form["option_codes[1]"] = json!("OPT_SUPPORT");

    // Local stages alone accept it.
    let res = gateway.send(Method::POST, "/api/validate", Some(&form)).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = gateway
        .send(Method::POST, "/api/validate?external=true", Some(&form))
        .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = envelope(res).await;
    assert_eq!(body["error"]["code"], "BUSINESS_RULE_VIOLATION");
    assert_eq!(
        body["error"]["details"]["option_codes[0]"],
        "is not available in your area"
    );
    assert!(body["error"]["details"].get("option_codes[1]").is_none());
}

#[tokio::test]
async fn test_address_lookup() {
    let gateway = TestGateway::start().await;

    let res = gateway
        .client
        .get(gateway.url("/api/address/100-0001"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = envelope(res).await;
    assert_eq!(body["data"]["prefecture"], "東京都");
    assert_eq!(body["data"]["city"], "千代田区");

    let res = gateway
        .client
        .get(gateway.url("/api/address/9999999"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(envelope(res).await["error"]["code"], "ADDRESS_NOT_FOUND");

    let res = gateway
        .client
        .get(gateway.url("/api/address/12ab"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_health_and_request_id() {
    let gateway = TestGateway::start().await;

    let res = gateway.client.get(gateway.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.headers()["x-content-type-options"], "nosniff");
    assert_eq!(envelope(res).await["data"]["status"], "ok");
}

#[tokio::test]
async fn test_malformed_query_is_a_validation_error() {
    let gateway = TestGateway::start().await;

    let res = gateway
        .send(Method::POST, "/api/validate?external=maybe", Some(&valid_form()))
        .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = envelope(res).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
    assert_eq!(body["error"]["details"]["external"], "must be true or false");
}

#[tokio::test]
async fn test_oversized_body_gets_envelope() {
    let mut config = IntakeConfig::default();
    config.security.max_body_size = 64;
    let gateway = TestGateway::start_with(config).await;

    let mut form = valid_form();
    form["building"] = json!("x".repeat(500));
    let res = gateway.send(Method::POST, "/api/sessions", Some(&form)).await;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(res.headers().contains_key("x-request-id"));
    let body = envelope(res).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
}
