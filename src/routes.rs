use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::{get, patch, MethodRouter},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::spots;
use crate::middleware::{jwt_auth_middleware, remove_blanks_middleware};
use crate::state::AppState;

/// Build the full application router around `state`
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.api.max_request_size_bytes;

    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Protected
        .merge(spot_routes(state.clone()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(&state));

    if state.config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn spot_routes(state: AppState) -> Router<AppState> {
    // Blank-field removal only applies to updates
    let update: MethodRouter<AppState> = patch(spots::update)
        .layer(from_fn_with_state(state.clone(), remove_blanks_middleware));

    Router::new()
        .route("/spots", get(spots::index).post(spots::create))
        .route(
            "/spots/:id",
            get(spots::show).merge(update).delete(spots::destroy),
        )
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let security = &state.config.security;
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "Spots API",
        "version": version,
        "description": "Authenticated CRUD API for personal spots",
        "endpoints": {
            "home": "/ (public)",
            "health": "/health (public)",
            "spots": "/spots, /spots/:id (bearer token required)",
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let backend = state.store.backend();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "store": backend,
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed for {} store: {}", backend, e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "store": backend,
                    "error": "store unavailable",
                })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::models::{Spot, SpotPatch};
    use crate::store::{MemoryStore, SpotFilter, SpotStore, StoreError};
    use uuid::Uuid;

    /// A store whose backend is unreachable
    struct DownStore;

    fn down() -> StoreError {
        StoreError::ConnectionError("connection refused".to_string())
    }

    #[async_trait::async_trait]
    impl SpotStore for DownStore {
        fn backend(&self) -> &'static str {
            "down"
        }

        async fn insert(&self, _spot: Spot) -> Result<Spot, StoreError> {
            Err(down())
        }

        async fn find(&self, _filter: SpotFilter) -> Result<Vec<Spot>, StoreError> {
            Err(down())
        }

        async fn find_one(&self, _filter: SpotFilter) -> Result<Option<Spot>, StoreError> {
            Err(down())
        }

        async fn update(&self, _id: Uuid, _patch: SpotPatch) -> Result<Spot, StoreError> {
            Err(down())
        }

        async fn delete(&self, _id: Uuid) -> Result<(), StoreError> {
            Err(down())
        }

        async fn health_check(&self) -> Result<(), StoreError> {
            Err(down())
        }
    }

    fn test_app() -> Router {
        app(AppState::new(Arc::new(MemoryStore::new()), AppConfig::from_env()))
    }

    #[tokio::test]
    async fn health_reports_store_backend() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["store"], "memory");
    }

    #[tokio::test]
    async fn root_is_public() {
        let response = test_app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_is_degraded_when_store_is_down() {
        let app = app(AppState::new(Arc::new(DownStore), AppConfig::from_env()));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["store"], "down");
        assert_eq!(body["error"], "store unavailable");
    }
}
