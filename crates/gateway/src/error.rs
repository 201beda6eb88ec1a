use crate::fetch::FetchError;
use crate::source::ResolveError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use inference::LoadError;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinError;

const GENERIC_MESSAGE: &str = "Internal server error";

/// Failure of one `/predict` request, tagged by the stage that produced it.
#[derive(Error, Debug)]
pub enum PredictError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("YOLO model failed to load")]
    ModelUnavailable(LoadError),

    #[error("Prediction failed: {0}")]
    DetectionFailed(String),

    #[error("Internal server error: {0}")]
    Unclassified(String),
}

impl From<JoinError> for PredictError {
    fn from(err: JoinError) -> Self {
        PredictError::Unclassified(format!("worker task failed: {}", err))
    }
}

impl PredictError {
    pub fn status(&self) -> StatusCode {
        match self {
            PredictError::Resolve(_) => StatusCode::BAD_REQUEST,
            PredictError::Fetch(FetchError::InvalidUrl(_)) => StatusCode::BAD_REQUEST,
            PredictError::Fetch(_) => StatusCode::BAD_GATEWAY,
            PredictError::DecodeFailed(_) => StatusCode::BAD_REQUEST,
            PredictError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PredictError::DetectionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PredictError::Unclassified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Request stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            PredictError::Resolve(_) => "received",
            PredictError::Fetch(_) => "resolving",
            PredictError::DecodeFailed(_) => "decoding",
            PredictError::ModelUnavailable(_) => "loading",
            PredictError::DetectionFailed(_) => "detecting",
            PredictError::Unclassified(_) => "unclassified",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let body = match &self {
            PredictError::ModelUnavailable(e) => ErrorBody {
                error: self.to_string(),
                details: Some(e.reason().to_string()),
            },
            PredictError::Unclassified(_) => ErrorBody {
                error: GENERIC_MESSAGE.to_string(),
                details: None,
            },
            _ => ErrorBody {
                error: self.to_string(),
                details: None,
            },
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Body for failures caught outside any handler, such as panics.
pub fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: GENERIC_MESSAGE.to_string(),
            details: None,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn status_codes_follow_stage_table() {
        let cases = [
            (PredictError::from(ResolveError::MissingImage), 400),
            (PredictError::from(ResolveError::EmptyFilename), 400),
            (PredictError::from(ResolveError::EmptyUrl), 400),
            (PredictError::from(FetchError::InvalidUrl("x".into())), 400),
            (PredictError::from(FetchError::Status(404)), 502),
            (PredictError::from(FetchError::Timeout(Duration::from_secs(15))), 502),
            (PredictError::from(FetchError::Connection("refused".into())), 502),
            (PredictError::DecodeFailed("bad magic".into()), 400),
            (PredictError::ModelUnavailable(LoadError::new("missing")), 503),
            (PredictError::DetectionFailed("shape".into()), 500),
            (PredictError::Unclassified("boom".into()), 500),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status().as_u16(), expected, "unexpected status for {err}");
        }
    }

    #[test]
    fn fetch_failures_share_one_status() {
        let statuses: Vec<_> = [
            FetchError::Status(500),
            FetchError::Timeout(Duration::from_secs(10)),
            FetchError::Connection("dns".into()),
        ]
        .into_iter()
        .map(|e| PredictError::from(e).status())
        .collect();

        assert!(statuses.iter().all(|s| *s == StatusCode::BAD_GATEWAY));
    }

    #[test]
    fn missing_image_message_names_both_inputs() {
        let err = PredictError::from(ResolveError::MissingImage);
        assert_eq!(err.to_string(), "No image provided. Send 'file' or 'url'.");
    }

    #[test]
    fn unclassified_display_keeps_detail_for_logs() {
        let err = PredictError::Unclassified("worker task failed".into());
        assert_eq!(err.to_string(), "Internal server error: worker task failed");
        assert_eq!(err.stage(), "unclassified");
    }
}
