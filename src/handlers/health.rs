use axum::response::Json;
use serde_json::{json, Value};

/// Liveness check
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "image-drive-relay",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
