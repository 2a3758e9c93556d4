use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

pub fn router() -> Router {
    Router::new().route("/health", get(get_health_check))
}

pub fn api_router() -> Router {
    Router::new().route("/test", get(get_test_message))
}

/// Liveness probe for the deployment
async fn get_health_check() -> Result<StatusCode, StatusCode>
{
    Ok(StatusCode::OK)
}

async fn get_test_message() -> Json<Value> {
    Json(json!({ "message": "hello world" }))
}
