//! HTTP API gateway for PajakGate.
//!
//! Endpoints:
//!
//! - `GET  /health`     — Liveness and lexicon summary
//! - `POST /api/chat`   — Scope-gated question answering
//! - `POST /api/gemini` — Alias of `/api/chat` for older clients
//!
//! Built on Axum for high performance async HTTP.

pub mod chat;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::{self, Next},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use pajakgate_config::{AppConfig, ConfigError, GatewayConfig};
use pajakgate_core::answer::AnswerGenerator;
use pajakgate_core::lexicon::Lexicon;
use pajakgate_core::scope::ScopeMatcher;

/// Shared application state for the gateway.
///
/// Built once at startup and never mutated.
pub struct GatewayState {
    pub lexicon: Lexicon,
    pub matcher: ScopeMatcher,
    pub generator: Arc<dyn AnswerGenerator>,
    pub refusal_message: String,
    pub format_error_message: String,
    pub max_history_messages: usize,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    /// Build state from config, loading the keyword lexicon.
    pub fn from_config(
        config: &AppConfig,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Result<Self, ConfigError> {
        let lexicon = config.scope.load_keywords()?;
        Ok(Self::new(config, lexicon, generator))
    }

    /// Build state from config with an already-loaded lexicon.
    pub fn new(config: &AppConfig, lexicon: Lexicon, generator: Arc<dyn AnswerGenerator>) -> Self {
        Self {
            lexicon,
            matcher: ScopeMatcher::new(config.scope.window_size),
            generator,
            refusal_message: config.scope.refusal_message.clone(),
            format_error_message: config.scope.format_error_message.clone(),
            max_history_messages: config.scope.max_history_messages,
            start_time: chrono::Utc::now(),
        }
    }
}

/// Routes without cross-cutting layers.
pub fn api_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat::chat_handler))
        .route("/api/gemini", post(chat::chat_handler))
        .with_state(state)
}

/// Build the full router.
///
/// Layers applied:
/// - Request body size limit
/// - In-memory rate limiting per client (health exempt)
/// - CORS restricted to the configured origins
/// - HTTP trace logging
pub fn build_router(state: SharedState, gateway: &GatewayConfig) -> Router {
    let origins: Vec<axum::http::HeaderValue> = gateway
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    let mut router = api_router(state).layer(DefaultBodyLimit::max(gateway.body_limit_bytes));

    if gateway.rate_limit_per_minute > 0 {
        let rate_limiter = Arc::new(RateLimiter::new(
            gateway.rate_limit_per_minute,
            std::time::Duration::from_secs(60),
        ));
        router = router.layer(middleware::from_fn(move |req, next| {
            let limiter = rate_limiter.clone();
            rate_limit_middleware(limiter, req, next)
        }));
    }

    router
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let generator = pajakgate_providers::build_from_config(&config)?;
    let state = Arc::new(GatewayState::from_config(&config, generator)?);

    info!(
        keywords = state.lexicon.len(),
        window_size = state.matcher.window_size(),
        model = %config.model,
        "Scope gate ready"
    );

    let app = build_router(state, &config.gateway);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Rate Limiter ---

/// Simple in-memory sliding-window rate limiter.
///
/// Tracks request timestamps per client key.
/// Thread-safe via `std::sync::Mutex` (non-async, held briefly).
struct RateLimiter {
    max_requests: usize,
    window: std::time::Duration,
    clients: std::sync::Mutex<HashMap<String, Vec<std::time::Instant>>>,
}

impl RateLimiter {
    fn new(max_requests: usize, window: std::time::Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Check if the client is within rate limits. Returns `true` if allowed.
    fn check(&self, client_key: &str) -> bool {
        let now = std::time::Instant::now();
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        if clients.len() > 10_000 {
            clients.retain(|_, timestamps| {
                timestamps
                    .last()
                    .is_some_and(|t| now.duration_since(*t) < self.window)
            });
        }

        let timestamps = clients.entry(client_key.to_string()).or_default();
        timestamps.retain(|t| now.duration_since(*t) < self.window);

        if timestamps.len() >= self.max_requests {
            return false;
        }

        timestamps.push(now);
        true
    }
}

/// Client key from `X-Forwarded-For` (first hop), else "anonymous".
fn client_key(headers: &axum::http::HeaderMap) -> String {
    headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Returns 429 Too Many Requests when a client exceeds its budget.
/// The /health endpoint is exempt.
async fn rate_limit_middleware(
    limiter: Arc<RateLimiter>,
    req: axum::extract::Request,
    next: Next,
) -> Result<axum::response::Response, StatusCode> {
    if req.uri().path() == "/health" {
        return Ok(next.run(req).await);
    }

    let key = client_key(req.headers());
    if !limiter.check(&key) {
        warn!(client = %key.chars().take(40).collect::<String>(), "Rate limit exceeded");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    Ok(next.run(req).await)
}

// --- Handlers ---

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub generator: String,
    pub generator_ready: bool,
    pub keywords: usize,
    pub window_size: usize,
    pub uptime_secs: i64,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let generator_ready = match state.generator.health_check().await {
        Ok(ready) => ready,
        Err(e) => {
            warn!(generator = state.generator.name(), error = %e, "Generator health check failed");
            false
        }
    };

    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        generator: state.generator.name().into(),
        generator_ready,
        keywords: state.lexicon.len(),
        window_size: state.matcher.window_size(),
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use pajakgate_core::answer::{GeneratedAnswer, TaxAnswer};
    use pajakgate_core::error::ProviderError;
    use pajakgate_core::message::Message;
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Mock generator that records how often it was called.
    struct MockGenerator {
        reply: Result<String, ProviderError>,
        citations: Vec<String>,
        calls: Mutex<usize>,
    }

    impl MockGenerator {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                citations: Vec::new(),
                calls: Mutex::new(0),
            }
        }

        fn failing(err: ProviderError) -> Self {
            Self {
                reply: Err(err),
                citations: Vec::new(),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl AnswerGenerator for MockGenerator {
        fn name(&self) -> &str {
            "gateway_mock"
        }

        async fn generate(&self, _history: &[Message]) -> Result<GeneratedAnswer, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            self.reply.clone().map(|text| GeneratedAnswer {
                text,
                citations: self.citations.clone(),
            })
        }
    }

    const MODEL_JSON: &str = r#"{"answer":"Tarif PPN 11%.","examples":[],"regulations":["UU HPP"],"references":["https://www.pajak.go.id"]}"#;

    fn test_state(generator: Arc<MockGenerator>) -> SharedState {
        let config = AppConfig::default();
        Arc::new(GatewayState::new(
            &config,
            Lexicon::indonesian_tax(),
            generator,
        ))
    }

    fn chat_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = api_router(test_state(Arc::new(MockGenerator::replying(MODEL_JSON))));

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let health: HealthResponse = body_json(response).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.generator, "gateway_mock");
        assert!(health.generator_ready);
        assert_eq!(health.window_size, 3);
        assert!(health.keywords > 0);
    }

    #[tokio::test]
    async fn in_scope_query_reaches_generator() {
        let generator = Arc::new(MockGenerator::replying(MODEL_JSON));
        let app = api_router(test_state(generator.clone()));

        let req = chat_request(serde_json::json!({
            "history": [{"role": "user", "parts": [{"text": "Berapa PPN untuk transaksi ini?"}]}]
        }));
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let answer: TaxAnswer = body_json(response).await;
        assert_eq!(answer.answer, "Tarif PPN 11%.");
        assert_eq!(answer.question.as_deref(), Some("Berapa PPN untuk transaksi ini?"));
        assert_eq!(answer.regulations, vec!["UU HPP"]);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn out_of_scope_query_is_refused_without_generator() {
        let generator = Arc::new(MockGenerator::replying(MODEL_JSON));
        let app = api_router(test_state(generator.clone()));

        let req = chat_request(serde_json::json!({
            "history": [{"role": "user", "parts": [{"text": "Bagaimana cara membuat kue coklat?"}]}]
        }));
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let answer: TaxAnswer = body_json(response).await;
        assert!(answer.answer.starts_with("Maaf, saya hanya dapat membantu"));
        assert!(answer.examples.is_empty());
        assert!(answer.regulations.is_empty());
        assert!(answer.references.is_empty());
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn earlier_user_turn_keeps_follow_up_in_scope() {
        let generator = Arc::new(MockGenerator::replying(MODEL_JSON));
        let app = api_router(test_state(generator.clone()));

        let req = chat_request(serde_json::json!({
            "history": [
                {"role": "user", "parts": [{"text": "Cara lapor SPT?"}]},
                {"role": "model", "parts": [{"text": "Melalui DJP Online."}]},
                {"role": "user", "parts": [{"text": "Kapan batas waktunya?"}]}
            ]
        }));
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn alias_route_behaves_like_chat() {
        let generator = Arc::new(MockGenerator::replying(MODEL_JSON));
        let app = api_router(test_state(generator.clone()));

        let req = Request::builder()
            .method("POST")
            .uri("/api/gemini")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"history":[{"role":"user","parts":[{"text":"NPWP hilang"}]}]}"#,
            ))
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn invalid_histories_are_bad_requests() {
        let bodies = [
            serde_json::json!({"history": []}),
            serde_json::json!({"history": [{"role": "model", "parts": [{"text": "hai"}]}]}),
            serde_json::json!({"history": [{"role": "user", "parts": []}]}),
            serde_json::json!({"history": [{"role": "user", "parts": [{"text": ""}]}]}),
            serde_json::json!({"history": [{"role": "admin", "parts": [{"text": "PPN"}]}]}),
            serde_json::json!({"messages": []}),
        ];

        for body in bodies {
            let generator = Arc::new(MockGenerator::replying(MODEL_JSON));
            let app = api_router(test_state(generator.clone()));
            let response = app.oneshot(chat_request(body.clone())).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");

            let err: chat::ErrorResponse = body_json(response).await;
            assert!(err.error.contains("Invalid or empty"));
            assert_eq!(generator.calls(), 0);
        }
    }

    #[tokio::test]
    async fn non_json_body_is_bad_request() {
        let app = api_router(test_state(Arc::new(MockGenerator::replying(MODEL_JSON))));
        let req = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn overlong_history_is_rejected() {
        let generator = Arc::new(MockGenerator::replying(MODEL_JSON));
        let mut config = AppConfig::default();
        config.scope.max_history_messages = 2;
        let state = Arc::new(GatewayState::new(
            &config,
            Lexicon::indonesian_tax(),
            generator.clone(),
        ));

        let req = chat_request(serde_json::json!({
            "history": [
                {"role": "user", "parts": [{"text": "PPN"}]},
                {"role": "model", "parts": [{"text": "ya"}]},
                {"role": "user", "parts": [{"text": "PPN lagi"}]}
            ]
        }));
        let response = api_router(state).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn generator_failure_is_internal_error() {
        let generator = Arc::new(MockGenerator::failing(ProviderError::Network(
            "connection refused".into(),
        )));
        let app = api_router(test_state(generator));

        let req = chat_request(serde_json::json!({
            "history": [{"role": "user", "parts": [{"text": "Tarif PPh 21?"}]}]
        }));
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err: chat::ErrorResponse = body_json(response).await;
        assert!(err.error.starts_with("Terjadi kesalahan internal"));
        assert!(!err.error.contains("connection refused"));
    }

    #[tokio::test]
    async fn malformed_model_output_yields_format_message() {
        let generator = Arc::new(MockGenerator::replying("**PPN** adalah 11%"));
        let app = api_router(test_state(generator));

        let req = chat_request(serde_json::json!({
            "history": [{"role": "user", "parts": [{"text": "Berapa PPN?"}]}]
        }));
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let answer: TaxAnswer = body_json(response).await;
        assert!(answer.answer.contains("kesulitan dalam memproses jawaban"));
        assert!(answer.references.is_empty());
    }

    #[tokio::test]
    async fn citations_are_merged_into_references() {
        let generator = Arc::new(MockGenerator {
            reply: Ok(format!("```json\n{MODEL_JSON}\n```")),
            citations: vec![
                "https://www.pajak.go.id".into(),
                "https://ortax.org".into(),
            ],
            calls: Mutex::new(0),
        });
        let app = api_router(test_state(generator));

        let req = chat_request(serde_json::json!({
            "history": [{"role": "user", "parts": [{"text": "Berapa PPN?"}]}]
        }));
        let answer: TaxAnswer = body_json(app.oneshot(req).await.unwrap()).await;
        assert_eq!(
            answer.references,
            vec!["https://www.pajak.go.id", "https://ortax.org"]
        );
    }

    #[tokio::test]
    async fn rate_limit_returns_429() {
        let state = test_state(Arc::new(MockGenerator::replying(MODEL_JSON)));
        let gateway = GatewayConfig {
            rate_limit_per_minute: 1,
            ..GatewayConfig::default()
        };
        let app = build_router(state, &gateway);

        let body = serde_json::json!({
            "history": [{"role": "user", "parts": [{"text": "Berapa PPN?"}]}]
        });
        let first = app.clone().oneshot(chat_request(body.clone())).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.clone().oneshot(chat_request(body)).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        // Health stays reachable.
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let health = app.oneshot(req).await.unwrap();
        assert_eq!(health.status(), StatusCode::OK);
    }

    #[test]
    fn rate_limiter_window() {
        let limiter = RateLimiter::new(2, std::time::Duration::from_secs(60));
        assert!(limiter.check("a"));
        assert!(limiter.check("a"));
        assert!(!limiter.check("a"));
        assert!(limiter.check("b"));
    }

    #[test]
    fn client_key_uses_first_forwarded_hop() {
        let mut headers = axum::http::HeaderMap::new();
        assert_eq!(client_key(&headers), "anonymous");
        headers.insert("X-Forwarded-For", "10.0.0.1, 10.0.0.2".parse().unwrap());
        assert_eq!(client_key(&headers), "10.0.0.1");
    }
}
