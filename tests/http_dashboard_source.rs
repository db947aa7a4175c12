use citation_dashboard::application::dashboard_cache::DashboardCache;
use citation_dashboard::application::dashboard_service::{
    DashboardService, FallbackNotice, FetchPolicy, Provenance,
};
use citation_dashboard::application::dashboard_source::DashboardSource;
use citation_dashboard::application::mock_generator::MockDashboardGenerator;
use citation_dashboard::domain::dashboard::{ApiErrorBody, DashboardEnvelope};
use citation_dashboard::domain::date_range::{DashboardQuery, DateRange};
use citation_dashboard::domain::error::FetchFailure;
use citation_dashboard::infrastructure::http_dashboard_source::HttpDashboardSource;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source_for(server: &MockServer, token: Option<&str>) -> HttpDashboardSource {
    HttpDashboardSource::new(
        reqwest::Client::new(),
        server.uri(),
        token.map(str::to_string),
    )
}

fn service_for(source: HttpDashboardSource) -> DashboardService {
    DashboardService::new(
        Arc::new(source),
        Arc::new(MockDashboardGenerator::seeded(8)),
        Arc::new(DashboardCache::default()),
        FetchPolicy {
            max_retries: 3,
            base_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(20),
        },
    )
}

fn envelope(range: DateRange) -> DashboardEnvelope {
    DashboardEnvelope {
        data: MockDashboardGenerator::seeded(17).generate(range).unwrap(),
    }
}

#[tokio::test]
async fn test_fetch_decodes_dashboard_payload() {
    let server = MockServer::start().await;
    let expected = envelope(DateRange::Last7Days);

    Mock::given(method("GET"))
        .and(path("/api/v1/dashboard"))
        .and(query_param("dateRange", "last_7_days"))
        .and(query_param("projectId", "proj-1"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&expected))
        .expect(1)
        .mount(&server)
        .await;

    let source = source_for(&server, Some("secret"));
    let query = DashboardQuery::parse("last_7_days", Some("proj-1")).unwrap();
    let payload = source.fetch(&query).await.unwrap();

    assert_eq!(payload, expected.data);
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/dashboard"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(source_for(&server, None));
    let outcome = service.request("last_30_days", None).await.unwrap();

    assert_eq!(outcome.provenance, Provenance::Fallback);
    assert_eq!(outcome.notice(), Some(FallbackNotice::AuthIssue));
    assert_eq!(
        outcome.failure,
        Some(FetchFailure::Auth {
            status: 401,
            message: "Unauthorized: Please log in again".to_string(),
        })
    );
}

#[tokio::test]
async fn test_forbidden_is_an_auth_failure_and_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/dashboard"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(source_for(&server, Some("expired")));
    let outcome = service.request("last_7_days", None).await.unwrap();

    assert_eq!(outcome.provenance, Provenance::Fallback);
    assert_eq!(outcome.notice(), Some(FallbackNotice::AuthIssue));
    assert_eq!(
        outcome.failure,
        Some(FetchFailure::Auth {
            status: 403,
            message: "Unauthorized: Please log in again".to_string(),
        })
    );
}

#[tokio::test]
async fn test_structured_error_falls_back_immediately() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/dashboard"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(ApiErrorBody::new(
                "An unexpected error occurred while fetching dashboard data.",
            )),
        )
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(source_for(&server, Some("secret")));
    let outcome = service.request("last_90_days", None).await.unwrap();

    assert!(outcome.error_occurred());
    assert_eq!(outcome.notice(), Some(FallbackNotice::BackendUnavailable));
    assert_eq!(
        outcome.failure,
        Some(FetchFailure::Status {
            status: 500,
            message: "An unexpected error occurred while fetching dashboard data.".to_string(),
            structured: true,
        })
    );
}

#[tokio::test]
async fn test_unstructured_server_error_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/dashboard"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let service = service_for(source_for(&server, Some("secret")));
    let outcome = service.request("last_year", None).await.unwrap();

    assert_eq!(outcome.provenance, Provenance::Fallback);
    assert_eq!(
        outcome.failure,
        Some(FetchFailure::Status {
            status: 503,
            message: "HTTP Error: 503 Service Unavailable".to_string(),
            structured: false,
        })
    );
    assert_eq!(outcome.payload.performance_trends.traffic.len(), 12);
}

#[tokio::test]
async fn test_malformed_body_is_a_decode_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/dashboard"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let source = source_for(&server, Some("secret"));
    let query = DashboardQuery::new(DateRange::Last30Days, None);

    assert!(matches!(
        source.fetch(&query).await,
        Err(FetchFailure::Decode(_))
    ));
}

#[tokio::test]
async fn test_unreachable_backend_is_a_transport_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source = HttpDashboardSource::new(
        reqwest::Client::new(),
        format!("http://{}", addr),
        Some("secret".to_string()),
    );
    let query = DashboardQuery::new(DateRange::Last7Days, None);

    assert!(matches!(
        source.fetch(&query).await,
        Err(FetchFailure::Transport(_))
    ));
}

#[tokio::test]
async fn test_successful_payload_is_cached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/dashboard"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(DateRange::Last30Days)))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(source_for(&server, Some("secret")));
    let first = service.request("last_30_days", None).await.unwrap();
    let second = service.request("last_30_days", None).await.unwrap();

    assert_eq!(first.provenance, Provenance::Backend);
    assert_eq!(second.provenance, Provenance::Cache);
    assert!(Arc::ptr_eq(&first.payload, &second.payload));
}
