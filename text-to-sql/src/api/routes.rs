use crate::api::models::{
    ErrorDetail, HealthResponse, InvalidateRequest, InvalidateResponse, QueryRequest,
    RefinementRequest,
};
use crate::api::AppState;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD,
    CONTENT_TYPE, ORIGIN,
};
use hyper::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const ALLOW_HEADERS: &str = "*";

/// allowed origins from `CORS_ORIGINS`; `*` allows any origin
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: Vec<String>,
}

impl CorsPolicy {
    pub fn new(origins: Vec<String>) -> Self {
        let origins = origins
            .into_iter()
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();
        Self { origins }
    }

    fn allows_any(&self) -> bool {
        self.origins.iter().any(|o| o == "*")
    }

    /// value for `access-control-allow-origin`, if this origin may see the response
    pub fn allow_origin(&self, origin: Option<&str>) -> Option<String> {
        if self.allows_any() {
            return Some("*".to_string());
        }
        let origin = origin?.trim_end_matches('/');
        self.origins
            .iter()
            .find(|allowed| allowed.as_str() == origin)
            .cloned()
    }
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let body =
        serde_json::to_vec(value).unwrap_or_else(|_| b"{\"detail\":\"serialize\"}".to_vec());
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from_static(b"{\"detail\":\"internal\"}"))))
}

fn json_error(status: StatusCode, detail: impl Into<String>) -> Response<Full<Bytes>> {
    json_response(status, &ErrorDetail::new(detail))
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, Response<Full<Bytes>>> {
    serde_json::from_slice(body)
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, format!("invalid request body: {}", e)))
}

fn with_cors(
    mut response: Response<Full<Bytes>>,
    cors: &CorsPolicy,
    origin: Option<&str>,
) -> Response<Full<Bytes>> {
    if let Some(allowed) = cors.allow_origin(origin) {
        let credentials = allowed != "*";
        if let Ok(value) = HeaderValue::from_str(&allowed) {
            let headers = response.headers_mut();
            headers.insert("access-control-allow-origin", value);
            if credentials {
                headers.insert(
                    "access-control-allow-credentials",
                    HeaderValue::from_static("true"),
                );
                headers.insert("vary", HeaderValue::from_static("Origin"));
            }
        }
    }
    response
}

/// echoes the requested method and headers; header `*` only when any origin is allowed
fn preflight(headers: &HeaderMap, cors: &CorsPolicy) -> Response<Full<Bytes>> {
    let requested_method = headers.get(ACCESS_CONTROL_REQUEST_METHOD).cloned();
    let requested_headers = headers.get(ACCESS_CONTROL_REQUEST_HEADERS).cloned();

    let mut builder = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(
            "access-control-allow-methods",
            requested_method.unwrap_or(HeaderValue::from_static(ALLOW_METHODS)),
        )
        .header("access-control-max-age", "600");

    match requested_headers {
        Some(value) => builder = builder.header("access-control-allow-headers", value),
        None if cors.allows_any() => {
            builder = builder.header("access-control-allow-headers", ALLOW_HEADERS)
        }
        None => {}
    }

    builder
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

/// dispatch one request; everything the handlers need is already read off the wire
pub async fn route(
    state: &AppState,
    method: &Method,
    path: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Response<Full<Bytes>> {
    let origin = headers.get(ORIGIN).and_then(|v| v.to_str().ok());

    let response = match (method, path) {
        (&Method::OPTIONS, _) => preflight(headers, &state.cors),
        (&Method::GET, "/health") => health(state).await,
        (&Method::POST, "/api/v1/query") => match parse_body::<QueryRequest>(&body) {
            Ok(request) => generate(state, request).await,
            Err(response) => response,
        },
        (&Method::POST, "/api/v1/refine") => match parse_body::<RefinementRequest>(&body) {
            Ok(request) => refine(state, request).await,
            Err(response) => response,
        },
        (&Method::POST, "/api/v1/schema/invalidate") => {
            let request = if body.is_empty() {
                Ok(InvalidateRequest::default())
            } else {
                parse_body::<InvalidateRequest>(&body)
            };
            match request {
                Ok(request) => invalidate(state, request).await,
                Err(response) => response,
            }
        }
        _ => json_error(StatusCode::NOT_FOUND, "Not Found"),
    };

    with_cors(response, &state.cors, origin)
}

async fn health(state: &AppState) -> Response<Full<Bytes>> {
    let (status, database) = match state.probe.ping().await {
        Ok(()) => ("healthy", "connected".to_string()),
        Err(e) => {
            tracing::warn!("health check database probe failed: {}", e);
            ("unhealthy", format!("error: {}", e))
        }
    };

    json_response(
        StatusCode::OK,
        &HealthResponse {
            status,
            database,
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

async fn generate(state: &AppState, request: QueryRequest) -> Response<Full<Bytes>> {
    match state
        .generator
        .generate(&request.query, request.db_name.as_deref(), request.validate)
        .await
    {
        Ok(result) => json_response(StatusCode::OK, &result),
        Err(e) => {
            tracing::error!("error generating sql query: {}", e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn refine(state: &AppState, request: RefinementRequest) -> Response<Full<Bytes>> {
    match state
        .refiner
        .refine(
            &request.query,
            &request.original_sql,
            &request.feedback,
            request.db_name.as_deref(),
        )
        .await
    {
        Ok(result) => json_response(StatusCode::OK, &result),
        Err(e) => {
            tracing::error!("error refining sql query: {}", e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn invalidate(state: &AppState, request: InvalidateRequest) -> Response<Full<Bytes>> {
    state.cache.invalidate(request.db_name.as_deref()).await;
    let remaining = state.cache.cached_keys().await;
    tracing::debug!(?remaining, "schema cache invalidated");
    let invalidated = request.db_name.unwrap_or_else(|| "all".to_string());
    json_response(StatusCode::OK, &InvalidateResponse { invalidated })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::agent::{SqlValidator, ValidationVerdict};
    use common::db::{DatabaseProbe, SchemaCache, SchemaSource};
    use common::llm::{Choice, ChoiceMessage, ChatCompletion, CompletionRequest, CompletionResponse};
    use common::pipeline::{QueryRefiner, SqlGenerator};
    use common::schema::{Column, DatabaseSchema, Table};
    use common::{Result, TextToSqlError};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct CustomersSchema {
        extractions: AtomicUsize,
    }

    #[async_trait]
    impl SchemaSource for CustomersSchema {
        async fn extract_schema(&self, _db_name: Option<&str>) -> Result<DatabaseSchema> {
            self.extractions.fetch_add(1, Ordering::SeqCst);
            Ok(DatabaseSchema::new(
                vec![Table {
                    name: "customers".to_string(),
                    schema: "public".to_string(),
                    columns: vec![Column {
                        name: "id".to_string(),
                        data_type: "integer".to_string(),
                        nullable: false,
                        default: None,
                        description: None,
                    }],
                    description: None,
                }],
                vec![],
            ))
        }
    }

    struct FixedCompletion {
        reply: Option<String>,
    }

    #[async_trait]
    impl ChatCompletion for FixedCompletion {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
            let content = self.reply.clone().ok_or(TextToSqlError::Upstream {
                status: 502,
                body: "bad gateway".to_string(),
            })?;
            Ok(CompletionResponse {
                id: "fixed".to_string(),
                model: request.model,
                created: 0,
                choices: vec![Choice {
                    index: 0,
                    message: ChoiceMessage {
                        role: "assistant".to_string(),
                        content,
                    },
                    finish_reason: None,
                }],
                usage: None,
            })
        }

        fn default_model(&self) -> &str {
            "fixed"
        }
    }

    struct AlwaysValid;

    #[async_trait]
    impl SqlValidator for AlwaysValid {
        async fn validate(&self, _sql: &str, _schema_context: &str) -> Result<ValidationVerdict> {
            Ok(ValidationVerdict {
                is_valid: true,
                issues: vec![],
                suggestions: None,
            })
        }
    }

    struct Probe {
        up: bool,
    }

    #[async_trait]
    impl DatabaseProbe for Probe {
        async fn ping(&self) -> Result<()> {
            if self.up {
                Ok(())
            } else {
                Err(TextToSqlError::DataAccess("connection refused".to_string()))
            }
        }
    }

    fn state_with(reply: Option<&str>, db_up: bool, origins: &[&str]) -> (AppState, Arc<CustomersSchema>) {
        let source = Arc::new(CustomersSchema {
            extractions: AtomicUsize::new(0),
        });
        let cache = Arc::new(SchemaCache::new(source.clone(), Duration::from_secs(3600)));
        let client: Arc<dyn ChatCompletion> = Arc::new(FixedCompletion {
            reply: reply.map(str::to_string),
        });
        let validator: Arc<dyn SqlValidator> = Arc::new(AlwaysValid);

        let state = AppState {
            generator: SqlGenerator::new(cache.clone(), client.clone(), validator.clone()),
            refiner: QueryRefiner::new(cache.clone(), client, validator),
            cache,
            probe: Arc::new(Probe { up: db_up }),
            cors: CorsPolicy::new(origins.iter().map(|o| o.to_string()).collect()),
        };
        (state, source)
    }

    fn state(reply: Option<&str>) -> AppState {
        state_with(reply, true, &["*"]).0
    }

    async fn body_json(response: Response<Full<Bytes>>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_query_endpoint_returns_sql() {
        let state = state(Some("```sql\nSELECT COUNT(*) FROM customers\n```"));
        let body = Bytes::from(r#"{"query": "how many customers are there"}"#);

        let response = route(&state, &Method::POST, "/api/v1/query", &HeaderMap::new(), body).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
        let json = body_json(response).await;
        assert_eq!(json["sql"], "SELECT COUNT(*) FROM customers");
        assert_eq!(json["validation_failed"], false);
        assert_eq!(json["validation"]["is_valid"], true);
    }

    #[tokio::test]
    async fn test_query_without_validation_omits_verdict() {
        let state = state(Some("SELECT 1"));
        let body = Bytes::from(r#"{"query": "one", "validate": false}"#);

        let response = route(&state, &Method::POST, "/api/v1/query", &HeaderMap::new(), body).await;

        let json = body_json(response).await;
        assert!(json.get("validation").is_none());
        assert_eq!(json["validation_failed"], false);
    }

    #[tokio::test]
    async fn test_pipeline_error_is_500_with_detail() {
        let state = state(None);
        let body = Bytes::from(r#"{"query": "anything"}"#);

        let response = route(&state, &Method::POST, "/api/v1/query", &HeaderMap::new(), body).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert!(json["detail"].as_str().unwrap().contains("502"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let state = state(Some("SELECT 1"));

        let response = route(
            &state,
            &Method::POST,
            "/api/v1/query",
            &HeaderMap::new(),
            Bytes::from_static(b"{not json"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["detail"].is_string());
    }

    #[tokio::test]
    async fn test_refine_endpoint() {
        let state = state(Some("```sql\nSELECT id FROM customers\n```\nChanges: only ids"));
        let body = Bytes::from(
            json!({
                "query": "list customers",
                "original_sql": "SELECT * FROM customers",
                "feedback": "only the ids"
            })
            .to_string(),
        );

        let response = route(&state, &Method::POST, "/api/v1/refine", &HeaderMap::new(), body).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["query"], "list customers");
        assert_eq!(json["original_sql"], "SELECT * FROM customers");
        assert_eq!(json["refined_sql"], "SELECT id FROM customers");
        assert_eq!(json["changes"], "only ids");
        assert_eq!(json["validation_failed"], false);
    }

    #[tokio::test]
    async fn test_health_reports_database_state() {
        let (up, _) = state_with(Some("SELECT 1"), true, &["*"]);
        let json = body_json(route(&up, &Method::GET, "/health", &HeaderMap::new(), Bytes::new()).await).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["database"], "connected");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));

        let (down, _) = state_with(Some("SELECT 1"), false, &["*"]);
        let json = body_json(route(&down, &Method::GET, "/health", &HeaderMap::new(), Bytes::new()).await).await;
        assert_eq!(json["status"], "unhealthy");
        assert!(json["database"]
            .as_str()
            .unwrap()
            .starts_with("error: "));
    }

    #[tokio::test]
    async fn test_invalidate_forces_reextraction() {
        let (state, source) = state_with(Some("SELECT 1"), true, &["*"]);
        let query = || Bytes::from(r#"{"query": "q", "db_name": "shop", "validate": false}"#);

        route(&state, &Method::POST, "/api/v1/query", &HeaderMap::new(), query()).await;
        route(&state, &Method::POST, "/api/v1/query", &HeaderMap::new(), query()).await;
        assert_eq!(source.extractions.load(Ordering::SeqCst), 1);

        let response = route(
            &state,
            &Method::POST,
            "/api/v1/schema/invalidate",
            &HeaderMap::new(),
            Bytes::from(r#"{"db_name": "shop"}"#),
        )
        .await;
        assert_eq!(body_json(response).await["invalidated"], "shop");

        route(&state, &Method::POST, "/api/v1/query", &HeaderMap::new(), query()).await;
        assert_eq!(source.extractions.load(Ordering::SeqCst), 2);

        let response = route(
            &state,
            &Method::POST,
            "/api/v1/schema/invalidate",
            &HeaderMap::new(),
            Bytes::new(),
        )
        .await;
        assert_eq!(body_json(response).await["invalidated"], "all");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let state = state(Some("SELECT 1"));

        let response = route(&state, &Method::GET, "/api/v2/query", &HeaderMap::new(), Bytes::new()).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["detail"], "Not Found");
    }

    fn origin_headers(origin: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, HeaderValue::from_str(origin).unwrap());
        headers
    }

    #[tokio::test]
    async fn test_preflight_and_origin_matching() {
        let (state, _) = state_with(Some("SELECT 1"), true, &["http://localhost:3000"]);

        let response = route(
            &state,
            &Method::OPTIONS,
            "/api/v1/query",
            &origin_headers("http://localhost:3000"),
            Bytes::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );
        assert!(response.headers().contains_key("access-control-allow-methods"));

        let response = route(
            &state,
            &Method::GET,
            "/health",
            &origin_headers("http://evil.example"),
            Bytes::new(),
        )
        .await;
        assert!(!response.headers().contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn test_credentialed_preflight_echoes_requested_headers() {
        let (state, _) = state_with(Some("SELECT 1"), true, &["http://localhost:3000"]);
        let mut headers = origin_headers("http://localhost:3000");
        headers.insert(ACCESS_CONTROL_REQUEST_METHOD, HeaderValue::from_static("POST"));
        headers.insert(
            ACCESS_CONTROL_REQUEST_HEADERS,
            HeaderValue::from_static("content-type"),
        );

        let response = route(&state, &Method::OPTIONS, "/api/v1/query", &headers, Bytes::new()).await;

        let got = response.headers();
        assert_eq!(got.get("access-control-allow-credentials").unwrap(), "true");
        assert_eq!(got.get("access-control-allow-headers").unwrap(), "content-type");
        assert_eq!(got.get("access-control-allow-methods").unwrap(), "POST");
    }

    #[tokio::test]
    async fn test_wildcard_preflight_allows_any_header() {
        let state = state(Some("SELECT 1"));

        let response = route(
            &state,
            &Method::OPTIONS,
            "/api/v1/query",
            &origin_headers("http://a.test"),
            Bytes::new(),
        )
        .await;

        assert_eq!(
            response.headers().get("access-control-allow-headers").unwrap(),
            "*"
        );
        assert!(!response
            .headers()
            .contains_key("access-control-allow-credentials"));
    }

    #[test]
    fn test_route_future_is_send() {
        fn assert_send<T: Send>(_: T) {}

        let state = state(Some("SELECT 1"));
        let headers = HeaderMap::new();
        assert_send(route(
            &state,
            &Method::POST,
            "/api/v1/schema/invalidate",
            &headers,
            Bytes::new(),
        ));
    }

    #[test]
    fn test_cors_policy_wildcard() {
        let policy = CorsPolicy::new(vec!["*".to_string()]);
        assert_eq!(policy.allow_origin(None).as_deref(), Some("*"));
        assert_eq!(policy.allow_origin(Some("http://a")).as_deref(), Some("*"));
    }
}
