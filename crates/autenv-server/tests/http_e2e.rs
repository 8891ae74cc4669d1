//! HTTP client ↔ server end-to-end tests.
//!
//! These tests start a real `autenv-server` in-process on a random port and
//! exercise the real `HttpAlmClient` against it. No mocks.

use autenv_client::{AlmClient, ClientConfig, ClientError, HttpAlmClient};
use autenv_core::{CoreError, Engine};
use autenv_schema::{
    AlmConnection, BuildEnv, ConfigurationRequest, EnvironmentContext, EnvironmentId, FolderId,
    ParameterDescriptor, ParameterKind,
};
use autenv_server::{Store, TestServer};
use std::collections::BTreeMap;
use std::sync::Arc;

fn start_server() -> TestServer {
    let store = Arc::new(Store::new());
    store.add_user("builder", "pw");
    store.add_environment("1001", "folder_1");
    TestServer::start(store)
}

fn make_client(url: &str) -> HttpAlmClient {
    HttpAlmClient::new(&ClientConfig::new(url).with_timeout_secs(5))
}

fn connection(url: &str) -> AlmConnection {
    AlmConnection::new(url, "DEFAULT", "DEMO", "builder", "pw")
}

#[test]
fn authenticate_and_lookup_folder() {
    let server = start_server();
    let client = make_client(&server.url);

    let session = client.authenticate(&connection(&server.url)).unwrap();
    let folder = client
        .parameters_folder_id(&session, &EnvironmentId::new("1001"))
        .unwrap();
    assert_eq!(folder, "folder_1");
}

#[test]
fn bad_credentials_are_unauthorized() {
    let server = start_server();
    let client = make_client(&server.url);

    let mut conn = connection(&server.url);
    conn.password = "wrong".to_owned();
    let err = client.authenticate(&conn).unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized(_)));
}

#[test]
fn calls_without_session_are_unauthorized() {
    let server = start_server();
    let client = make_client(&server.url);

    let bogus = autenv_client::Session::new("s-bogus");
    let err = client
        .parameters_folder_id(&bogus, &EnvironmentId::new("1001"))
        .unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized(_)));
}

#[test]
fn unknown_environment_is_not_found() {
    let server = start_server();
    let client = make_client(&server.url);

    let session = client.authenticate(&connection(&server.url)).unwrap();
    let err = client
        .parameters_folder_id(&session, &EnvironmentId::new("9999"))
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)));
}

#[test]
fn configuration_create_and_parameter_roundtrip() {
    let server = start_server();
    let client = make_client(&server.url);

    let session = client.authenticate(&connection(&server.url)).unwrap();
    let conf = client
        .create_configuration(&session, &EnvironmentId::new("1001"), "nightly")
        .unwrap();
    assert!(!conf.is_empty());

    let folder = FolderId::new("folder_1");
    let mut values = BTreeMap::new();
    values.insert("Browser".to_owned(), "Chrome".to_owned());
    values.insert("Url".to_owned(), "http://app".to_owned());
    let outcomes = client
        .set_parameter_values(&session, &conf, &folder, &values)
        .unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.accepted));

    let stored = client.parameter_values(&session, &conf, &folder).unwrap();
    assert_eq!(stored.get("Browser").unwrap(), "Chrome");
    assert_eq!(
        client
            .parameter_value(&session, &conf, &folder, "Url")
            .unwrap()
            .as_deref(),
        Some("http://app")
    );
    assert_eq!(
        client
            .parameter_value(&session, &conf, &folder, "Missing")
            .unwrap(),
        None
    );
}

#[test]
fn per_parameter_rejection_comes_back_in_outcomes() {
    let server = start_server();
    server.store.reject_parameter("Locked", "read-only parameter");
    let client = make_client(&server.url);

    let session = client.authenticate(&connection(&server.url)).unwrap();
    let conf = client
        .create_configuration(&session, &EnvironmentId::new("1001"), "nightly")
        .unwrap();

    let mut values = BTreeMap::new();
    values.insert("Locked".to_owned(), "x".to_owned());
    values.insert("Open".to_owned(), "y".to_owned());
    let outcomes = client
        .set_parameter_values(&session, &conf, &FolderId::new("folder_1"), &values)
        .unwrap();

    let locked = outcomes.iter().find(|o| o.name == "Locked").unwrap();
    assert!(!locked.accepted);
    assert_eq!(locked.reason.as_deref(), Some("read-only parameter"));
    assert!(outcomes.iter().find(|o| o.name == "Open").unwrap().accepted);
}

#[test]
fn full_engine_run_over_http() {
    let server = start_server();
    let engine = Engine::new(Box::new(make_client(&server.url)));

    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("params.json");
    std::fs::write(&json_path, r#"{"Browser": ["Chrome", "Firefox"]}"#).unwrap();

    let mut build_env = BuildEnv::new();
    build_env.set("BUILD_NUMBER", "9");

    let ctx = EnvironmentContext {
        connection: connection(&server.url),
        environment_id: EnvironmentId::new("1001"),
        request: ConfigurationRequest::CreateNew {
            name: "nightly".to_owned(),
        },
        json_source: Some(json_path),
        parameters: vec![
            ParameterDescriptor::new("Run", "run-${BUILD_NUMBER}", ParameterKind::UserDefined),
            ParameterDescriptor::new("Browser", "", ParameterKind::External)
                .first_value_only(true),
            ParameterDescriptor::new("MissingKey", "", ParameterKind::External),
        ],
    };

    let outcome = engine.run(&ctx, &build_env).unwrap();
    assert!(!outcome.configuration_id.is_empty());
    assert_eq!(outcome.report.applied.len(), 2);
    assert_eq!(outcome.report.skipped.len(), 1);

    let stored = server
        .store
        .parameter_values(outcome.configuration_id.as_str())
        .unwrap();
    assert_eq!(stored.get("Run").unwrap(), "run-9");
    assert_eq!(stored.get("Browser").unwrap(), "Chrome");

    // Re-running with unchanged inputs produces a no-op delta.
    let ctx = EnvironmentContext {
        request: ConfigurationRequest::UseExisting(outcome.configuration_id.clone()),
        ..ctx
    };
    let second = engine.run(&ctx, &build_env).unwrap();
    assert!(second.report.applied.is_empty());
    assert_eq!(second.report.unchanged.len(), 2);
}

#[test]
fn engine_auth_failure_over_http_is_fatal() {
    let server = start_server();
    let engine = Engine::new(Box::new(make_client(&server.url)));

    let mut conn = connection(&server.url);
    conn.password = "wrong".to_owned();
    let ctx = EnvironmentContext {
        connection: conn,
        environment_id: EnvironmentId::new("1001"),
        request: ConfigurationRequest::CreateNew {
            name: "nightly".to_owned(),
        },
        json_source: None,
        parameters: Vec::new(),
    };
    let err = engine.run(&ctx, &BuildEnv::new()).unwrap_err();
    assert!(matches!(err, CoreError::AuthenticationFailure(_)));
}

#[test]
fn health_endpoint_answers() {
    let server = start_server();
    let resp = ureq::get(&format!("{}/health", server.url)).call().unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}
