mod common;

use axum::http::StatusCode;
use common::{API_KEY, TestApp, read_json};
use http_helpers::{empty_request, json_request};
use tower::ServiceExt;

const KEY: (&str, &str) = ("warden-api-key", API_KEY);

fn role_body(name: &str, groups: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "description": "readers",
        "oidcGroups": groups,
        "permissions": [
            {"namespace": "elsewhere", "topic": "secrets", "method": "GET"},
            {"topic": "files", "method": "manage"}
        ]
    })
}

#[tokio::test]
async fn roles_crud_roundtrip() {
    let app = TestApp::new(Some(API_KEY));

    let created = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v2/namespaces/ns1/roles",
            &[KEY],
            role_body("readers", &["g1"]),
        ))
        .await
        .expect("create");
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = read_json(created).await;
    assert_eq!(body["name"], "readers");
    assert_eq!(body["oidcGroups"], serde_json::json!(["g1"]));
    assert_eq!(
        body["permissions"][0],
        serde_json::json!({"topic": "secrets", "method": "GET"})
    );

    let fetched = app
        .router
        .clone()
        .oneshot(empty_request("GET", "/api/v2/namespaces/ns1/roles/readers", &[KEY]))
        .await
        .expect("get");
    assert_eq!(fetched.status(), StatusCode::OK);
    assert_eq!(read_json(fetched).await["description"], "readers");

    let updated = app
        .router
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/v2/namespaces/ns1/roles/readers",
            &[KEY],
            role_body("writers", &["g2", "g3"]),
        ))
        .await
        .expect("update");
    assert_eq!(updated.status(), StatusCode::OK);
    assert_eq!(read_json(updated).await["name"], "writers");

    let renamed_away = app
        .router
        .clone()
        .oneshot(empty_request("GET", "/api/v2/namespaces/ns1/roles/readers", &[KEY]))
        .await
        .expect("get old name");
    assert_eq!(renamed_away.status(), StatusCode::NOT_FOUND);

    let listed = app
        .router
        .clone()
        .oneshot(empty_request("GET", "/api/v2/namespaces/ns1/roles", &[KEY]))
        .await
        .expect("list");
    let items = read_json(listed).await["items"].clone();
    assert_eq!(items.as_array().map(Vec::len), Some(1));
    assert_eq!(items[0]["oidcGroups"], serde_json::json!(["g2", "g3"]));

    let deleted = app
        .router
        .clone()
        .oneshot(empty_request("DELETE", "/api/v2/namespaces/ns1/roles/writers", &[KEY]))
        .await
        .expect("delete");
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = app
        .router
        .oneshot(empty_request("DELETE", "/api/v2/namespaces/ns1/roles/writers", &[KEY]))
        .await
        .expect("delete again");
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(gone).await["message"], "requested resource is not found");
}

#[tokio::test]
async fn role_stored_permissions_carry_the_path_namespace() {
    let app = TestApp::new(Some(API_KEY));
    let response = app
        .router
        .oneshot(json_request(
            "POST",
            "/api/v2/namespaces/ns1/roles",
            &[KEY],
            role_body("readers", &["g1"]),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);

    use warden::store::RoleStore;
    let stored = app.store.get_role("ns1", "readers").await.expect("stored");
    assert!(stored.permissions.iter().all(|perm| perm.namespace == "ns1"));
}

#[tokio::test]
async fn duplicate_role_conflicts() {
    let app = TestApp::new(Some(API_KEY));
    for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v2/namespaces/ns1/roles",
                &[KEY],
                role_body("readers", &["g1"]),
            ))
            .await
            .expect("create");
        assert_eq!(response.status(), expected);
        if expected == StatusCode::CONFLICT {
            assert_eq!(read_json(response).await["code"], "resource_already_exists");
        }
    }
}

#[tokio::test]
async fn invalid_role_reports_fields() {
    let app = TestApp::new(Some(API_KEY));
    let response = app
        .router
        .oneshot(json_request(
            "POST",
            "/api/v2/namespaces/ns1/roles",
            &[KEY],
            serde_json::json!({
                "name": "",
                "oidcGroups": ["g1"],
                "permissions": [{"topic": "gateway", "method": "GET"}]
            }),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["code"], "request_data_invalid");
    assert_eq!(body["message"], "request data has invalid fields");
    assert!(body["validation"]["name"].is_string());
    assert!(body["validation"]["permissions"].is_string());
}

#[tokio::test]
async fn api_token_lifecycle_hides_the_secret() {
    let app = TestApp::new(Some(API_KEY));

    let created = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v2/namespaces/ns1/api_tokens",
            &[KEY],
            serde_json::json!({
                "name": "ci",
                "description": "pipeline",
                "permissions": [{"topic": "secrets", "method": "read"}],
                "duration": "P1D"
            }),
        ))
        .await
        .expect("create");
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = read_json(created).await;
    let secret = body["secret"].as_str().expect("secret").to_string();
    assert!(uuid::Uuid::parse_str(&secret).is_ok());
    let token = &body["apiToken"];
    assert_eq!(token["name"], "ci");
    assert_eq!(token["isExpired"], false);
    let prefix = token["prefix"].as_str().expect("prefix").to_string();
    assert_eq!(prefix.len(), 8);
    assert_eq!(
        prefix,
        warden_authz::hash_token_id(uuid::Uuid::parse_str(&secret).expect("uuid"))
            .simple()
            .to_string()[..8]
    );

    let fetched = app
        .router
        .clone()
        .oneshot(empty_request("GET", "/api/v2/namespaces/ns1/api_tokens/ci", &[KEY]))
        .await
        .expect("get");
    assert_eq!(fetched.status(), StatusCode::OK);
    let fetched = read_json(fetched).await;
    assert_eq!(fetched["prefix"], prefix.as_str());
    assert!(!fetched.to_string().contains(&secret));

    let listed = app
        .router
        .clone()
        .oneshot(empty_request("GET", "/api/v2/namespaces/ns1/api_tokens", &[KEY]))
        .await
        .expect("list");
    let listed = read_json(listed).await;
    assert_eq!(listed["items"].as_array().map(Vec::len), Some(1));
    assert!(!listed.to_string().contains(&secret));

    let deleted = app
        .router
        .clone()
        .oneshot(empty_request("DELETE", "/api/v2/namespaces/ns1/api_tokens/ci", &[KEY]))
        .await
        .expect("delete");
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let missing = app
        .router
        .oneshot(empty_request("GET", "/api/v2/namespaces/ns1/api_tokens/ci", &[KEY]))
        .await
        .expect("get deleted");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_token_with_bad_duration_is_rejected() {
    let app = TestApp::new(Some(API_KEY));
    let response = app
        .router
        .oneshot(json_request(
            "POST",
            "/api/v2/namespaces/ns1/api_tokens",
            &[KEY],
            serde_json::json!({"name": "ci", "duration": "one hour"}),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(
        body["validation"]["duration"],
        "invalid iso8601 duration format"
    );
}

#[tokio::test]
async fn api_token_names_are_unique_per_namespace() {
    let app = TestApp::new(Some(API_KEY));
    let body = serde_json::json!({"name": "ci", "duration": "PT1H"});
    for (namespace, expected) in [
        ("ns1", StatusCode::CREATED),
        ("ns2", StatusCode::CREATED),
        ("ns1", StatusCode::CONFLICT),
    ] {
        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/v2/namespaces/{namespace}/api_tokens"),
                &[KEY],
                body.clone(),
            ))
            .await
            .expect("create");
        assert_eq!(response.status(), expected, "{namespace}");
    }
}

#[tokio::test]
async fn openapi_document_is_public() {
    let app = TestApp::new(Some(API_KEY));
    let response = app
        .router
        .oneshot(empty_request("GET", "/api/v2/openapi.json", &[]))
        .await
        .expect("openapi");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert!(body["paths"]["/api/v2/namespaces/{namespace}/api_tokens"].is_object());
}
