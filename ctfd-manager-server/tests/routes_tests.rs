mod support;

use axum::http::{Method, StatusCode, header};
use ctfd_manager_cluster::{BindingStore, compute_fingerprint};
use ctfd_manager_server::auth::{bearer_token, password_matches};
use ctfd_manager_types::ConfigObject;
use pretty_assertions::assert_eq;
use serde_json::json;
use support::*;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data }))
}

// --- Auth ---

#[tokio::test]
async fn api_requires_bearer_secret() {
    let app = TestApp::offline();

    let reply = app.get_anonymous("/api/challenges").await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json(), json!({ "message": "Unauthorized" }));

    let reply = app
        .call(Method::GET, "/api/challenges", Some("Bearer wrong"), None)
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bearer_prefix_is_optional() {
    let app = TestApp::offline();
    let reply = app
        .call(Method::GET, "/api/challenges", Some(&format!("  {PASSWORD} ")), None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[test]
fn password_comparison() {
    assert_eq!(bearer_token("Bearer abc"), "abc");
    assert_eq!(bearer_token(" abc "), "abc");
    assert!(password_matches("abc", "abc"));
    assert!(password_matches("abc", " abc\n"));
    assert!(!password_matches("abc", "abcd"));
    assert!(!password_matches("", "abc"));
}

#[tokio::test]
async fn version_and_status_are_public() {
    let app = TestApp::offline();

    let reply = app.get_anonymous("/api/version").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({ "version": "1.2.3" }));

    let reply = app.get_anonymous("/api/status").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({ "status": "ok" }));
}

// --- Health ---

#[tokio::test]
async fn index_reports_health() {
    let app = TestApp::offline();
    let reply = app.get_anonymous("/").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({ "name": "CTFd manager", "status": "ok" }));
}

#[tokio::test]
async fn unhealthy_watch_fails_status() {
    let app = TestApp::offline();
    app.state.health.set_unhealthy();

    let reply = app.get_anonymous("/status").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.json(), json!({ "status": "error" }));
}

#[tokio::test]
async fn unreachable_cluster_fails_status() {
    let app = TestApp::offline();
    app.cluster.set_unavailable(true);

    let reply = app.get_anonymous("/").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.json()["status"], "error");
}

// --- Challenge configs ---

#[tokio::test]
async fn lists_only_challenge_configs() {
    let app = TestApp::offline();
    app.cluster.insert(challenge_object("chal-foo", "foo")).await;
    app.cluster.insert(challenge_object("chal-bar", "bar")).await;
    app.cluster.insert(ConfigObject::new(NS, "unrelated")).await;

    let reply = app.get("/api/challenges").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.json(),
        json!({ "challenges": [{ "name": "chal-bar" }, { "name": "chal-foo" }] })
    );
}

#[tokio::test]
async fn fetches_one_challenge_config() {
    let app = TestApp::offline();
    app.cluster.insert(challenge_object("chal-foo", "foo")).await;

    let reply = app.get("/api/challenges/chal-foo").await;

    assert_eq!(reply.status, StatusCode::OK);
    let config = &reply.json()["config"];
    assert_eq!(config["challenge"]["slug"], "foo");
    assert_eq!(config["path"], "/foo");
}

#[tokio::test]
async fn unknown_challenge_is_not_found() {
    let app = TestApp::offline();
    app.cluster.insert(ConfigObject::new(NS, "unrelated")).await;

    let reply = app.get("/api/challenges/missing").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.json(), json!({ "message": "Challenge not found" }));

    let reply = app.get("/api/challenges/unrelated").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

// --- Files ---

#[tokio::test]
async fn lists_challenge_files() {
    let app = TestApp::offline();
    app.cluster.insert(challenge_object("chal-foo", "foo")).await;
    app.source.add_file(FOO_FILES, "handout.zip", b"zip");

    let reply = app.get("/api/challenges/chal-foo/files").await;

    assert_eq!(reply.status, StatusCode::OK);
    let files = reply.json()["files"].clone();
    assert_eq!(files[0]["name"], "handout.zip");
    assert_eq!(files[0]["type"], "file");
}

#[tokio::test]
async fn missing_file_directory_is_not_found() {
    let app = TestApp::offline();
    app.cluster.insert(challenge_object("chal-foo", "foo")).await;

    let reply = app.get("/api/challenges/chal-foo/files").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.json(), json!({ "message": "Directory not found" }));
}

#[tokio::test]
async fn downloads_a_listed_file() {
    let app = TestApp::offline();
    app.cluster.insert(challenge_object("chal-foo", "foo")).await;
    app.source.add_file(FOO_FILES, "handout.zip", b"PK\x03\x04");

    let reply = app.get("/api/challenges/chal-foo/files/handout.zip").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(&reply.body[..], b"PK\x03\x04");
    assert_eq!(
        reply.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"handout.zip\""
    );
}

#[tokio::test]
async fn unlisted_file_is_not_found() {
    let app = TestApp::offline();
    app.cluster.insert(challenge_object("chal-foo", "foo")).await;
    app.source.add_file(FOO_FILES, "handout.zip", b"zip");

    let reply = app.get("/api/challenges/chal-foo/files/secret.txt").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.json(), json!({ "message": "File not found" }));
}

// --- CTFd ---

#[tokio::test]
async fn init_force_syncs_every_challenge() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/challenges"))
        .respond_with(ok(json!({ "id": 7, "name": "Foo", "type": "dynamic" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/flags"))
        .respond_with(ok(json!({ "id": 1, "content": "CTF{foo}", "type": "static" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/tags"))
        .respond_with(ok(json!({ "id": 1, "value": "intro" })))
        .expect(1)
        .mount(&server)
        .await;

    let app = TestApp::new(&server.uri());
    let object = challenge_object("chal-foo", "foo");
    app.cluster.insert(object.clone()).await;

    let reply = app.post("/api/ctfd/challenges/init", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({ "status": "ok" }));

    let fingerprint = app
        .state
        .reconciler
        .adapter()
        .fingerprints()
        .stored("chal-foo")
        .await
        .unwrap();
    assert_eq!(fingerprint, Some(compute_fingerprint(&object.data)));

    let reply = app.get("/api/ctfd/challenges/uploaded").await;
    assert_eq!(reply.json(), json!({ "uploaded_challenges": { "foo": 7 } }));
}

#[tokio::test]
async fn init_reports_remote_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/challenges"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let app = TestApp::new(&server.uri());
    app.cluster.insert(challenge_object("chal-foo", "foo")).await;

    let reply = app.post("/api/ctfd/challenges/init", None).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        reply.json(),
        json!({ "message": "Error uploading challenge chal-foo" })
    );
}

#[tokio::test]
async fn lists_remote_challenges() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/challenges"))
        .and(query_param("view", "admin"))
        .respond_with(ok(json!([
            { "id": 1, "name": "Foo", "category": "web", "state": "visible", "type": "dynamic", "value": 500 }
        ])))
        .mount(&server)
        .await;

    let app = TestApp::new(&server.uri());
    let reply = app.get("/api/ctfd/challenges").await;

    assert_eq!(reply.status, StatusCode::OK);
    let challenges = reply.json()["challenges"].clone();
    assert_eq!(challenges[0]["id"], 1);
    assert_eq!(challenges[0]["name"], "Foo");
}

#[tokio::test]
async fn uploaded_lists_only_bound_challenges() {
    let app = TestApp::offline();
    let bindings = BindingStore::challenges(app.cluster.clone(), NS);
    bindings.bind("foo", 3).await.unwrap();
    bindings.bind("bar", 4).await.unwrap();
    bindings.unbind("bar").await.unwrap();

    let reply = app.get("/api/ctfd/challenges/uploaded").await;

    assert_eq!(reply.json(), json!({ "uploaded_challenges": { "foo": 3 } }));
}
