//! Session lifecycle tests: retry, failure, cancellation, supersession.

use std::time::Duration;

use prospect_client::{
    ErrorKind, ProspectClient, RetryPolicy, SearchController, SessionSettings, SessionStatus,
};
use prospect_core::{build_query, FilterState, SearchQuery};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_settings() -> SessionSettings {
    SessionSettings {
        retry: RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(10),
        },
        progress_tick: Duration::from_millis(5),
        progress_ceiling_pct: 92.0,
        display_hold: Duration::ZERO,
    }
}

fn controller(server: &MockServer, settings: SessionSettings) -> SearchController {
    let client = ProspectClient::with_base_url(&server.uri(), 30, "prospect-test")
        .expect("client construction should not fail");
    SearchController::new(client, settings)
}

fn query_for(place: &str) -> SearchQuery {
    build_query(&FilterState {
        place: place.to_owned(),
        ..FilterState::default()
    })
    .expect("place is a valid location")
}

fn success_body(name: &str) -> serde_json::Value {
    serde_json::json!({
        "count": 1,
        "results": [{"nom": name, "telephones": ["+33 1 00 00 00 00"]}],
        "timings": {"total_seconds": 1.0, "enrichment": {"enabled": true, "enriched_count": 0}}
    })
}

fn overpass_timeout() -> ResponseTemplate {
    ResponseTemplate::new(504).set_body_json(serde_json::json!({
        "detail": "Overpass API timeout (overpass.kumi.systems)"
    }))
}

#[tokio::test]
async fn three_transient_failures_then_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/prospects"))
        .respond_with(overpass_timeout())
        .up_to_n_times(3)
        .with_priority(1)
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/prospects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("Café X")))
        .expect(1)
        .mount(&server)
        .await;

    let mut controller = controller(&server, fast_settings());
    let handle = controller.start_search(query_for("Paris")).await;

    let mut rx = handle.subscribe();
    let observer = tokio::spawn(async move {
        let mut seen = Vec::new();
        loop {
            let snapshot = rx.borrow_and_update().clone();
            seen.push((snapshot.status, snapshot.last_error.is_some()));
            if snapshot.status.is_terminal() || rx.changed().await.is_err() {
                break;
            }
        }
        seen
    });

    let outcome = handle.wait().await;
    assert_eq!(outcome.status, SessionStatus::Succeeded);
    assert_eq!(outcome.attempt, 3);
    assert!(outcome.last_error.is_none());
    let results = outcome.results.expect("results on success");
    assert_eq!(results.prospects[0].name, "Café X");
    assert_eq!(results.prospects[0].contact_method_count, 1);
    assert_eq!(results.retries, 3);

    let seen = observer.await.expect("observer task");
    assert!(
        seen.iter()
            .all(|(status, has_error)| *status != SessionStatus::Failed && !has_error),
        "an error was observable during retries: {seen:?}"
    );
}

#[tokio::test]
async fn client_input_failure_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"detail": "Paramètre 'number' invalide"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut controller = controller(&server, fast_settings());
    let outcome = controller.start_search(query_for("Paris")).await.wait().await;

    assert_eq!(outcome.status, SessionStatus::Failed);
    assert_eq!(outcome.attempt, 0);
    let failure = outcome.last_error.expect("failure is reported");
    assert_eq!(failure.kind, ErrorKind::ClientInput);
    assert_eq!(failure.message, "Paramètre 'number' invalide");
    assert!(outcome.progress_pct.abs() < f64::EPSILON);
}

#[tokio::test]
async fn transient_failures_stop_after_max_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(503)
                .set_body_json(serde_json::json!({"detail": "Services cartographiques indisponibles"})),
        )
        .expect(4)
        .mount(&server)
        .await;

    let mut controller = controller(&server, fast_settings());
    let outcome = controller.start_search(query_for("Paris")).await.wait().await;

    assert_eq!(outcome.status, SessionStatus::Failed);
    assert_eq!(outcome.attempt, 3);
    let failure = outcome.last_error.expect("failure is reported");
    assert_eq!(failure.kind, ErrorKind::TransientUpstream);
    assert_eq!(failure.message, "Services cartographiques indisponibles");
}

#[tokio::test]
async fn fatal_failure_with_empty_body_uses_fallback_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let mut controller = controller(&server, fast_settings());
    let outcome = controller.start_search(query_for("Paris")).await.wait().await;

    assert_eq!(outcome.status, SessionStatus::Failed);
    let failure = outcome.last_error.expect("failure is reported");
    assert_eq!(failure.kind, ErrorKind::Fatal);
    assert_eq!(failure.message, "Erreur inconnue");
}

#[tokio::test]
async fn new_search_supersedes_running_one() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("where", "Alpha"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success_body("Alpha shop"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("where", "Beta"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("Beta shop")))
        .mount(&server)
        .await;

    let mut controller = controller(&server, fast_settings());
    let first = controller.start_search(query_for("Alpha")).await;
    let mut rx = first.subscribe();
    rx.wait_for(|s| s.status == SessionStatus::Running)
        .await
        .expect("first session starts");

    let second = controller.start_search(query_for("Beta")).await;

    let first_outcome = first.wait().await;
    assert_eq!(first_outcome.status, SessionStatus::Cancelled);
    assert!(first_outcome.results.is_none());
    assert!(first_outcome.last_error.is_none());

    let second_outcome = second.wait().await;
    assert_eq!(second_outcome.status, SessionStatus::Succeeded);
    let results = second_outcome.results.expect("results on success");
    assert_eq!(results.prospects[0].name, "Beta shop");
    assert_eq!(controller.current().map(|h| h.id()), Some(second.id()));

    // The superseded session stays cancelled.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(first.status(), SessionStatus::Cancelled);
}

#[tokio::test]
async fn cancel_during_retry_delay_stops_the_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(overpass_timeout())
        .expect(1)
        .mount(&server)
        .await;

    let mut settings = fast_settings();
    settings.retry.base_delay = Duration::from_secs(30);
    let mut controller = controller(&server, settings);
    let handle = controller.start_search(query_for("Paris")).await;

    let mut rx = handle.subscribe();
    rx.wait_for(|s| s.status == SessionStatus::Retrying)
        .await
        .expect("session enters retry delay");

    controller.cancel_current().await;
    let outcome = handle.wait().await;
    assert_eq!(outcome.status, SessionStatus::Cancelled);
    assert_eq!(outcome.attempt, 1);
    assert!(outcome.last_error.is_none());
    assert!(controller.current().is_none());
}

#[tokio::test]
async fn progress_rises_below_ceiling_then_completes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success_body("Slow"))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let mut settings = fast_settings();
    settings.display_hold = Duration::from_secs(60);
    let mut controller = controller(&server, settings);
    let handle = controller.start_search(query_for("Paris")).await;

    let mut rx = handle.subscribe();
    let running = rx
        .wait_for(|s| s.status == SessionStatus::Running && s.progress_pct > 0.0)
        .await
        .expect("progress ticks while running")
        .clone();
    assert!(running.progress_pct < 92.0);

    let outcome = handle.wait().await;
    assert_eq!(outcome.status, SessionStatus::Succeeded);
    assert!((outcome.progress_pct - 100.0).abs() < f64::EPSILON);
}
