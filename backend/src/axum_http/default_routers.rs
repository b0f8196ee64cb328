use axum::{http::StatusCode, response::IntoResponse};

use super::error_responses::status_body;

pub async fn health_check() -> impl IntoResponse {
    status_body(StatusCode::OK, "All is well :)")
}

pub async fn not_found() -> impl IntoResponse {
    status_body(StatusCode::NOT_FOUND, "Resource not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::Request,
        routing::get,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/health-check", get(health_check))
            .fallback(not_found)
    }

    async fn call(uri: &str) -> (StatusCode, Value) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_check_uses_status_body() {
        let (status, body) = call("/health-check").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 200);
        assert_eq!(body["message"], "All is well :)");
    }

    #[tokio::test]
    async fn unknown_route_is_a_json_404() {
        let (status, body) = call("/api/v1/nope").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 404);
        assert_eq!(body["message"], "Resource not found");
    }
}
