//! REST adapter against a mocked hosted backend.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use serde_json::json;
use std::sync::Arc;
use techevents_catalog::backend::{AdminBackend, CatalogBackend, UploadFile};
use techevents_catalog::{
    BackendError, CatalogController, CatalogEnvironment, CatalogSettings, ControllerError,
    EventDraft, EventMode, FetchSource, Theme, submit_event,
};
use techevents_core::environment::Clock;
use techevents_rest::{RestBackend, RestConfig};
use techevents_testing::test_clock;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer) -> RestBackend {
    RestBackend::new(RestConfig::new(server.uri(), "anon-key"))
        .unwrap()
        .with_clock(Arc::new(test_clock()))
}

fn event_row(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": "Hack the Planet",
        "short_description": "48 hours",
        "date": "2025-01-04T09:00:00+00:00",
        "end_date": null,
        "location": null,
        "mode": "Online",
        "theme": ["AI", "Open Innovation"],
        "images": [],
        "is_trending": true,
        "is_popular": false,
        "view_count": 12,
        "created_at": "2024-12-20T10:00:00+00:00",
        "college": null,
        "platform_id": "devfolio",
        "platform": { "id": "devfolio", "name": "Devfolio", "logo": "https://cdn/logo.png", "color": "#3770FF" }
    })
}

async fn mount_catalog(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/events"))
        .and(query_param("select", "*,platform:platforms(*)"))
        .and(query_param("order", "created_at.desc"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([event_row("evt-1")])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/platforms"))
        .and(query_param("order", "name.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "devfolio", "name": "Devfolio", "logo": "https://cdn/logo.png", "color": "#3770FF" }
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn fetches_joined_events_and_platforms() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    let backend = backend(&server);

    let events = backend.fetch_events().await.unwrap();
    let platforms = backend.fetch_platforms().await.unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["platform"]["name"], "Devfolio");
    assert_eq!(platforms.len(), 1);
}

#[tokio::test]
async fn controller_loads_through_rest() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let catalog = CatalogController::new(CatalogEnvironment::new(
        Arc::new(backend(&server)),
        Arc::new(test_clock()),
        CatalogSettings::default(),
    ));
    let view = catalog.load().await.unwrap();

    assert!(view.error.is_none());
    assert_eq!(view.events.len(), 1);
    let event = &view.events[0];
    assert_eq!(event.mode, EventMode::Online);
    assert_eq!(
        event.theme,
        vec![Theme::Ai, Theme::Other("Open Innovation".to_string())]
    );
    assert!(event.is_trending);
}

#[tokio::test]
async fn server_error_becomes_fetch_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/events"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database is down"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/platforms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = backend(&server).fetch_events().await.unwrap_err();
    assert_eq!(
        err,
        BackendError::Status {
            status: 500,
            message: "database is down".to_string()
        }
    );

    let catalog = CatalogController::new(CatalogEnvironment::new(
        Arc::new(backend(&server)),
        Arc::new(test_clock()),
        CatalogSettings::default(),
    ));
    let view = catalog.load().await.unwrap();
    let failure = view.error.as_ref().expect("failure is surfaced");
    assert_eq!(failure.source_kind, FetchSource::Events);
    assert!(view.events.is_empty());
    assert!(!view.is_empty_result());
}

#[tokio::test]
async fn undecodable_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/platforms"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = backend(&server).fetch_platforms().await.unwrap_err();
    assert!(matches!(err, BackendError::Decode(_)));
}

#[tokio::test]
async fn fetch_event_filters_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/events"))
        .and(query_param("id", "eq.evt-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([event_row("evt-1")])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/events"))
        .and(query_param("id", "eq.missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    let backend = backend(&server);

    assert!(backend.fetch_event("evt-1").await.unwrap().is_some());
    assert!(backend.fetch_event("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn record_view_calls_rpc() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/increment_view_count"))
        .and(body_json(json!({ "event_id": "evt-1" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    backend(&server).record_view("evt-1").await.unwrap();
}

#[tokio::test]
async fn change_feed_is_unsupported() {
    let server = MockServer::start().await;
    let backend = backend(&server);

    assert!(matches!(
        backend.subscribe_changes().await,
        Err(BackendError::Unsupported(_))
    ));

    let catalog = CatalogController::new(CatalogEnvironment::new(
        Arc::new(backend),
        Arc::new(test_clock()),
        CatalogSettings::default(),
    ));
    assert!(matches!(
        catalog.watch_changes().await,
        Err(ControllerError::Backend(BackendError::Unsupported(_)))
    ));
}

#[tokio::test]
async fn submit_event_inserts_uploads_and_attaches_images() {
    let server = MockServer::start().await;
    let millis = test_clock().now().timestamp_millis();
    let object = format!("evt-9/{millis}-cover.png");

    Mock::given(method("POST"))
        .and(path("/rest/v1/events"))
        .and(header("prefer", "return=representation"))
        .and(header("authorization", "Bearer admin-jwt"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": "evt-9" }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/storage/v1/object/event-images/{object}")))
        .and(header("content-type", "image/png"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": object })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/events"))
        .and(query_param("id", "eq.evt-9"))
        .and(body_json(json!({
            "images": [format!("{}/storage/v1/object/public/event-images/{object}", server.uri())]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = RestConfig::new(server.uri(), "anon-key").with_access_token("admin-jwt");
    let backend = RestBackend::new(config)
        .unwrap()
        .with_clock(Arc::new(test_clock()));
    let draft = EventDraft {
        title: "Build Week".to_string(),
        short_description: "Ship something".to_string(),
        description: String::new(),
        date: "2025-02-01T09:00:00Z".parse().unwrap(),
        end_date: None,
        location: String::new(),
        mode: EventMode::Online,
        platform_id: "devfolio".to_string(),
        organizer: "Devfolio".to_string(),
        external_link: "https://devfolio.co/build".to_string(),
        themes: vec![Theme::Ai],
        is_trending: false,
        is_popular: false,
        college: String::new(),
        images: Vec::new(),
    };
    let cover = UploadFile {
        name: "cover.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![1, 2, 3],
    };

    let id = submit_event(&backend, None, &draft, vec![cover]).await.unwrap();
    assert_eq!(id, "evt-9");
}

#[tokio::test]
async fn updating_a_missing_event_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = backend(&server)
        .save_event(Some("gone"), json!({ "title": "x" }))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::NotFound(_)));
}

#[tokio::test]
async fn duplicate_platform_surfaces_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/platforms"))
        .respond_with(ResponseTemplate::new(409).set_body_string("duplicate key"))
        .mount(&server)
        .await;

    let err = backend(&server)
        .save_platform(json!({ "id": "mlh", "name": "MLH" }), false)
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Status { status: 409, .. }));
}
