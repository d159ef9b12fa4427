//! Success envelope shared by all handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

/// `{success, count?, data?, message?}` wrapper around a payload
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            count: None,
            data: Some(data),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Pair the envelope with a status code
    pub fn status(self, status: StatusCode) -> (StatusCode, Json<Self>) {
        (status, Json(self))
    }
}

impl<T: Serialize> Envelope<Vec<T>> {
    /// List payload with its `count`
    pub fn collection(items: Vec<T>) -> Self {
        Self {
            success: true,
            count: Some(items.len()),
            data: Some(items),
            message: None,
        }
    }
}

impl Envelope<()> {
    /// Payload-less confirmation
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            count: None,
            data: None,
            message: Some(message.into()),
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Documentation shape of [`Envelope::message`]
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageBody {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collection_counts_items() {
        let envelope = Envelope::collection(vec!["a", "b"]);
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"success": true, "count": 2, "data": ["a", "b"]})
        );
    }

    #[test]
    fn message_has_no_data() {
        let envelope = Envelope::message("Book deleted successfully");
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"success": true, "message": "Book deleted successfully"})
        );
    }

    #[test]
    fn data_with_message() {
        let envelope = Envelope::data(json!({"title": "Dune"})).with_message("Book created successfully");
        let (status, Json(body)) = envelope.status(StatusCode::CREATED);
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "success": true,
                "data": {"title": "Dune"},
                "message": "Book created successfully"
            })
        );
    }
}
