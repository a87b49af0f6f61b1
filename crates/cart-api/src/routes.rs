//! # Routes
//!
//! Axum router configuration for the cart backend.

use crate::error::render_errors;
use crate::handlers;
use crate::state::AppState;
use axum::{middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - GET /health - Health check
///
/// Anything else answers with a JSON 404.
pub fn create_router(state: AppState) -> Router {
    with_layers(Router::new().route("/health", get(handlers::health)), state)
}

/// Attach the fallback, error rendering and middleware to `routes`
pub(crate) fn with_layers(routes: Router<AppState>, state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(middleware::map_response_with_state(
                    state.clone(),
                    render_errors,
                )),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::state::AppConfig;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::Value;

    fn state(environment: &str) -> AppState {
        AppState::new(AppConfig {
            environment: environment.to_string(),
            ..AppConfig::default()
        })
    }

    fn server(environment: &str) -> TestServer {
        let routes = Router::new()
            .route("/health", get(handlers::health))
            .route(
                "/teapot",
                get(|| async { Err::<(), _>(ApiError::with_status(418, "short and stout")) }),
            )
            .route(
                "/boom",
                get(|| async {
                    Err::<(), _>(ApiError::from(
                        anyhow::anyhow!("disk full").context("write failed"),
                    ))
                }),
            );
        TestServer::new(with_layers(routes, state(environment))).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let server = TestServer::new(create_router(state("development"))).unwrap();

        let response = server.get("/health").await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "Server is running");
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let server = TestServer::new(create_router(state("development"))).unwrap();

        let response = server.get("/api/v1/cart").expect_failure().await;
        response.assert_status(StatusCode::NOT_FOUND);

        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Route not found: GET /api/v1/cart");
        assert!(body["stack"].is_string());
    }

    #[tokio::test]
    async fn test_error_keeps_its_status() {
        let response = server("development")
            .get("/teapot")
            .expect_failure()
            .await;
        response.assert_status(StatusCode::IM_A_TEAPOT);

        let body: Value = response.json();
        assert_eq!(body["error"], "short and stout");
    }

    #[tokio::test]
    async fn test_internal_error_outside_production_has_stack() {
        let response = server("development").get("/boom").expect_failure().await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "write failed");
        assert!(body["stack"]
            .as_str()
            .unwrap()
            .contains("caused by: disk full"));
    }

    #[tokio::test]
    async fn test_production_hides_stack() {
        let response = server("production").get("/boom").expect_failure().await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = response.json();
        assert_eq!(body["error"], "write failed");
        assert!(body.get("stack").is_none());
    }
}
