//! Success envelope for JSON responses.
//!
//! Every successful response body is `{"success": true, "data": ...}`;
//! errors use the same shape through [`crate::error::AppError`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

/// A successful JSON response.
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    data: T,
}

/// `200 OK` with `data`.
pub const fn ok<T: Serialize>(data: T) -> ApiResponse<T> {
    ApiResponse {
        status: StatusCode::OK,
        data,
    }
}

/// `201 Created` with `data`.
pub const fn created<T: Serialize>(data: T) -> ApiResponse<T> {
    ApiResponse {
        status: StatusCode::CREATED,
        data,
    }
}

/// Message body for operations that return nothing else.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

/// `200 OK` with `{"message": ...}`.
pub const fn message(message: &'static str) -> ApiResponse<Message> {
    ok(Message { message })
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Envelope {
            success: true,
            data: self.data,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_envelope() {
        let response = created(json!({"id": 1})).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"success": true, "data": {"id": 1}}));
    }

    #[tokio::test]
    async fn test_message() {
        let response = message("Item removed").into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["data"]["message"], "Item removed");
    }
}
