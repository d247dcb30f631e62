use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::collections::HashMap;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::audit;
use crate::config::Config;
use crate::db::Db;
use crate::error::{Result, VisError};
use crate::graph::{generate_vis_graph, GraphResult, TraversalLimits};
use crate::repository::{analyst_sources, SqliteRepository};

/// Header naming the caller in authless mode.
const ANALYST_HEADER: &str = "x-analyst";

/// Check if a port is available by attempting to bind to it
async fn check_port_available(port: u16) -> bool {
    tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await.is_ok()
}

/// HTTP server for the relationship graph endpoint
pub struct VisServer {
    state: AppState,
}

#[derive(Clone)]
struct AppState {
    db: Db,
    limits: TraversalLimits,
    /// API key value -> analyst it authenticates as.
    api_keys: HashMap<String, String>,
    allowed_origins: Vec<String>,
    authless: bool,
    default_analyst: Option<String>,
}

impl VisServer {
    /// Create a server, reading each configured API key from its environment
    /// variable unless authless mode is on.
    pub fn new(db: Db, config: &Config) -> Result<Self> {
        let mut api_keys = HashMap::new();
        if !config.http_server.authless {
            if config.http_server.api_keys.is_empty() {
                return Err(VisError::Config(
                    "No API keys configured. Add entries under [http_server.api_keys] or enable authless mode."
                        .to_string(),
                ));
            }
            for (env_var, analyst) in &config.http_server.api_keys {
                let key = std::env::var(env_var).map_err(|_| {
                    VisError::Config(format!(
                        "Environment variable {} not set. Set it in your .env file or as an environment variable, or enable authless mode.",
                        env_var
                    ))
                })?;
                if api_keys.insert(key, analyst.clone()).is_some() {
                    return Err(VisError::Config(format!(
                        "API key in {} is shared with another analyst",
                        env_var
                    )));
                }
            }
            log::info!("Loaded {} API key(s)", api_keys.len());
        }
        Ok(Self::with_api_keys(db, config, api_keys))
    }

    /// Create a server from already-resolved `key -> analyst` pairs.
    pub fn with_api_keys(db: Db, config: &Config, api_keys: HashMap<String, String>) -> Self {
        Self {
            state: AppState {
                db,
                limits: config.traversal.limits(),
                api_keys,
                allowed_origins: config.http_server.allowed_origins.clone(),
                authless: config.http_server.authless,
                default_analyst: config.http_server.default_analyst.clone(),
            },
        }
    }

    /// Run the HTTP server
    pub async fn run(&self, port: u16) -> Result<()> {
        let addr = format!("127.0.0.1:{}", port);

        if !check_port_available(port).await {
            return Err(VisError::Config(format!(
                "Port {} is already in use. Set http_server.port in config.toml to use a different port.",
                port
            )));
        }

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        log::info!("Serving relationship graphs on http://{}/api/v1/vis/:id", addr);

        axum::serve(listener, self.router())
            .await
            .map_err(|e| VisError::Io(std::io::Error::new(std::io::ErrorKind::Other, format!("HTTP server error: {}", e))))?;

        Ok(())
    }

    /// The axum router
    pub fn router(&self) -> Router {
        let cors = if self.state.allowed_origins.is_empty() {
            CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
        } else {
            let origins: Vec<axum::http::HeaderValue> = self
                .state
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .route("/api/v1/vis/:id", get(handle_vis))
            .route("/health", get(handle_health))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(cors),
            )
            .with_state(self.state.clone())
    }
}

/// Build the graph for one entity as seen by the calling analyst
async fn handle_vis(
    State(state): State<AppState>,
    Path(object_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let analyst = if state.authless {
        let claimed = headers
            .get(ANALYST_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(String::from)
            .or_else(|| state.default_analyst.clone());
        let Some(analyst) = claimed else {
            return error_response(StatusCode::BAD_REQUEST, "Missing X-Analyst header");
        };
        analyst
    } else {
        // The key decides who the caller is; X-Analyst is ignored.
        let analyst = match validate_auth(&headers, &state.api_keys) {
            Ok(analyst) => analyst,
            Err(response) => return response,
        };
        if let Err(response) = validate_origin(&headers, &state.allowed_origins) {
            return response;
        }
        analyst
    };

    let limits = state.limits.clone();
    let start_id = object_id.clone();
    let who = analyst.clone();
    let outcome = state
        .db
        .with_connection(move |conn| {
            let allowed = analyst_sources(conn, &who)?;
            let repo = SqliteRepository::new(conn);
            generate_vis_graph(&repo, &start_id, &allowed, &limits)
        })
        .await;

    if let Err(e) = audit::log_request(&state.db, Some(&analyst), &object_id, &outcome).await {
        log::warn!("Failed to record vis request for {}: {}", object_id, e);
    }

    match outcome {
        Ok(result @ GraphResult::Found(_)) => (StatusCode::OK, Json(result)).into_response(),
        Ok(result @ GraphResult::NotFound) => (StatusCode::NOT_FOUND, Json(result)).into_response(),
        Err(VisError::BudgetExceeded(msg)) => error_response(StatusCode::UNPROCESSABLE_ENTITY, &msg),
        Err(VisError::InvalidInput(msg)) => error_response(StatusCode::BAD_REQUEST, &msg),
        Err(e) => {
            log::error!("Graph request for {} failed: {}", object_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

async fn handle_health() -> Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": "critsvis",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
        .into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Validate Authorization header and return the analyst bound to the key
fn validate_auth(headers: &HeaderMap, api_keys: &HashMap<String, String>) -> std::result::Result<String, Response> {
    let provided_key = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| {
            error_response(StatusCode::UNAUTHORIZED, "Use 'Authorization: Bearer <api-key>' header")
        })?;

    api_keys
        .get(provided_key)
        .cloned()
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "Invalid API key"))
}

/// Validate Origin header against the configured list
fn validate_origin(headers: &HeaderMap, allowed_origins: &[String]) -> std::result::Result<(), Response> {
    if allowed_origins.is_empty() {
        return Ok(());
    }

    // Requests without an Origin header are not from a browser.
    let Some(origin) = headers.get("origin").and_then(|h| h.to_str().ok()) else {
        return Ok(());
    };

    if allowed_origins.iter().any(|allowed| origin == allowed) {
        Ok(())
    } else {
        Err(error_response(
            StatusCode::FORBIDDEN,
            &format!("Origin '{}' is not in the allowed origins list", origin),
        ))
    }
}
