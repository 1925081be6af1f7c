//! Test fixtures for integration tests
//!
//! Provides upstream payloads, mock upstream servers and a fully wired
//! application backed by a temporary SQLite file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use country_atlas::builder::{FixedMultiplier, MultiplierSource, RecordBuilder};
use country_atlas::refresh::RefreshOrchestrator;
use country_atlas::render::SummaryRenderer;
use country_atlas::server::{create_router, AppState};
use country_atlas::sources::SourceClient;
use country_atlas::storage::{open_repository, CountryRepository};
use country_atlas::utils::retry::RetryConfig;

pub const COUNTRIES_PATH: &str = "/v2/all";
pub const RATES_PATH: &str = "/v6/latest/USD";

/// Multiplier used by [`TestApp::start`]
pub const MULTIPLIER: u32 = 1500;

/// Single country without any currency
pub fn testland_no_currency() -> Value {
    json!([{ "name": "Testland", "population": 1000, "currencies": [] }])
}

/// Single country paying in XYZ
pub fn testland_xyz() -> Value {
    json!([{ "name": "Testland", "population": 1000, "currencies": [{ "code": "XYZ" }] }])
}

/// Five countries C1..C5, all paying in USD, population 1000 * i
pub fn five_countries() -> Value {
    Value::Array(
        (1..=5)
            .map(|i| {
                json!({
                    "name": format!("C{i}"),
                    "capital": format!("Capital {i}"),
                    "region": if i % 2 == 0 { "Europe" } else { "Africa" },
                    "population": 1000 * i,
                    "flag": format!("https://flagcdn.com/c{i}.svg"),
                    "currencies": [{ "code": "USD" }]
                })
            })
            .collect(),
    )
}

/// A realistic mix: known currency, unknown currency, no currency
pub fn mixed_countries() -> Value {
    json!([
        {
            "name": "Nigeria",
            "capital": "Abuja",
            "region": "Africa",
            "population": 206139589,
            "flag": "https://flagcdn.com/ng.svg",
            "currencies": [{ "code": "NGN" }]
        },
        {
            "name": "Ghana",
            "capital": "Accra",
            "region": "Africa",
            "population": 31072945,
            "flag": "https://flagcdn.com/gh.svg",
            "currencies": [{ "code": "GHS" }]
        },
        {
            "name": "Germany",
            "capital": "Berlin",
            "region": "Europe",
            "population": 83240525,
            "flag": "https://flagcdn.com/de.svg",
            "currencies": [{ "code": "EUR" }]
        },
        {
            "name": "Neverland",
            "region": "Africa",
            "population": 5000,
            "currencies": [{ "code": "NVL" }]
        },
        {
            "name": "Antarctica",
            "region": "Polar",
            "population": 1000,
            "currencies": []
        }
    ])
}

pub fn rates(pairs: &[(&str, f64)]) -> Value {
    let rates: serde_json::Map<String, Value> =
        pairs.iter().map(|(code, rate)| (code.to_string(), json!(rate))).collect();
    json!({ "result": "success", "base_code": "USD", "rates": rates })
}

/// Mount both upstream endpoints on `server`, replacing any previous mocks
pub async fn mount_upstreams(server: &MockServer, countries: &Value, rates: &Value) {
    server.reset().await;

    Mock::given(method("GET"))
        .and(path(COUNTRIES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(countries))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(RATES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(rates))
        .mount(server)
        .await;
}

/// `sqlite:////abs/path` URL for an absolute database path
pub fn sqlite_url(path: &Path) -> String {
    format!("sqlite:///{}", path.display())
}

fn build_orchestrator(
    upstream: &MockServer,
    repository: Arc<dyn CountryRepository>,
    renderer: Arc<SummaryRenderer>,
    multipliers: Box<dyn MultiplierSource>,
) -> RefreshOrchestrator {
    let sources = SourceClient::new(
        format!("{}{}", upstream.uri(), COUNTRIES_PATH),
        format!("{}{}", upstream.uri(), RATES_PATH),
        Duration::from_secs(2),
        RetryConfig::none(),
    )
    .unwrap();

    RefreshOrchestrator::new(
        sources,
        repository,
        renderer,
        RecordBuilder::new(1000, 2000),
        multipliers,
    )
}

/// Application wired against mock upstreams and a temporary database
pub struct TestApp {
    pub state: AppState,
    pub upstream: MockServer,
    pub db_path: PathBuf,
    pub image_path: PathBuf,
    pub dir: TempDir,
}

impl TestApp {
    /// Start with a fixed multiplier
    pub async fn start(countries: Value, rates: Value) -> Self {
        Self::start_with(countries, rates, Box::new(FixedMultiplier(MULTIPLIER))).await
    }

    pub async fn start_with(countries: Value, rates: Value, multipliers: Box<dyn MultiplierSource>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("cache/summary.png");
        Self::start_in(dir, image_path, countries, rates, multipliers).await
    }

    /// Start with an explicit image location inside `dir`
    pub async fn start_in(
        dir: TempDir,
        image_path: PathBuf,
        countries: Value,
        rates: Value,
        multipliers: Box<dyn MultiplierSource>,
    ) -> Self {
        let upstream = MockServer::start().await;
        mount_upstreams(&upstream, &countries, &rates).await;

        let db_path = dir.path().join("atlas.db");
        let repository = open_repository(&sqlite_url(&db_path)).unwrap();
        let renderer = Arc::new(SummaryRenderer::new(&image_path, dir.path().join("fonts")));
        let orchestrator =
            build_orchestrator(&upstream, Arc::clone(&repository), Arc::clone(&renderer), multipliers);

        Self {
            state: AppState::new(repository, Arc::new(orchestrator), renderer),
            upstream,
            db_path,
            image_path,
            dir,
        }
    }

    /// Independent orchestrator with its own database connection and renderer,
    /// as a second process pointed at the same file would have
    pub fn second_orchestrator(&self) -> RefreshOrchestrator {
        let repository = open_repository(&sqlite_url(&self.db_path)).unwrap();
        let renderer = Arc::new(SummaryRenderer::new(&self.image_path, self.dir.path().join("fonts")));
        build_orchestrator(
            &self.upstream,
            repository,
            renderer,
            Box::new(FixedMultiplier(MULTIPLIER)),
        )
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Second connection to the database file, for inspection and fault injection
    pub fn raw_connection(&self) -> rusqlite::Connection {
        rusqlite::Connection::open(&self.db_path).unwrap()
    }

    /// Send one request and return the status and body bytes
    pub async fn send(&self, method: &str, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    /// Send one request and parse the body as JSON
    pub async fn send_json(&self, method: &str, uri: &str) -> (StatusCode, Value) {
        let (status, body) = self.send(method, uri).await;
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, value)
    }
}
