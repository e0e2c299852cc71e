use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Uniform result of every business operation: a status code plus either a
/// payload or an error message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self::success_with(StatusCode::OK, data)
    }

    pub fn success_with(status: StatusCode, data: T) -> Self {
        Self {
            status_code: status.as_u16(),
            data: Some(data),
            error: None,
        }
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data: None,
            error: Some(message.into()),
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn is_success(&self) -> bool {
        self.status().is_success()
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_omits_error() {
        let envelope = Envelope::success(vec![1, 2, 3]);
        assert!(envelope.is_success());
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json, serde_json::json!({ "statusCode": 200, "data": [1, 2, 3] }));
    }

    #[test]
    fn error_envelope_omits_data() {
        let envelope: Envelope<()> = Envelope::error(StatusCode::FORBIDDEN, "Users are not contacts");
        assert!(!envelope.is_success());
        assert_eq!(envelope.status(), StatusCode::FORBIDDEN);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "statusCode": 403, "error": "Users are not contacts" })
        );
    }
}
