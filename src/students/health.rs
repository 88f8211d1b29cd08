use axum::{debug_handler, http::StatusCode, Json};
use serde_json::{json, Value};

#[debug_handler]
pub async fn student_test() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "success": true, "message": "Endpoint works" })))
}
