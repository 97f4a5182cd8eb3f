use axum::http::StatusCode;

/// Liveness only; the store is not consulted.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
