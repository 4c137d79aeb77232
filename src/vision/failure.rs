//! Detection failure classification
//!
//! Every failed detection is sorted into one [`FailureKind`], which picks the
//! guidance shown to the user. The raw detail is kept for logs.

use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::FoodVisionError;

/// Message used when the detection response names no food.
pub const NO_FOOD_MESSAGE: &str =
    "No food detected in the image. Please try a clearer image with visible food items.";

/// Class of a detection failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The upload was malformed or incomplete.
    Validation,
    /// Timeout or connectivity trouble.
    Network,
    /// The service found nothing edible in the picture.
    NoFoodDetected,
    /// Anything else.
    Unknown,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Network => "network",
            Self::NoFoodDetected => "no-food-detected",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A classified detection failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionFailure {
    /// Failure class.
    pub kind: FailureKind,
    /// Server or transport detail.
    pub detail: String,
}

impl DetectionFailure {
    /// Builds a failure of an explicit kind.
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Classifies a non-success HTTP response by status and message.
    pub fn from_response(status: StatusCode, message: &str) -> Self {
        let lower = message.to_lowercase();
        let kind = if status == StatusCode::UNPROCESSABLE_ENTITY
            || lower.contains("field required")
            || lower.contains("missing")
        {
            FailureKind::Validation
        } else if status == StatusCode::REQUEST_TIMEOUT
            || status == StatusCode::GATEWAY_TIMEOUT
            || lower.contains("timeout")
            || lower.contains("network")
        {
            FailureKind::Network
        } else if lower.contains("no food detected") {
            FailureKind::NoFoodDetected
        } else {
            FailureKind::Unknown
        };
        Self::new(kind, message)
    }

    /// Classifies a transport-level error.
    pub fn from_transport(error: &reqwest::Error) -> Self {
        let kind = if error.is_timeout() || error.is_connect() || error.is_request() {
            FailureKind::Network
        } else {
            FailureKind::Unknown
        };
        Self::new(kind, error.to_string())
    }

    /// The guidance shown to the user.
    pub fn user_message(&self) -> String {
        match self.kind {
            FailureKind::Validation => "Image data validation failed. Please try:\n\
                 \u{2022} Taking a new photo\n\
                 \u{2022} Selecting a different image\n\
                 \u{2022} Ensuring the image is not corrupted"
                .to_string(),
            FailureKind::Network => "Network connection error. Please:\n\
                 \u{2022} Check your internet connection\n\
                 \u{2022} Try again in a few moments\n\
                 \u{2022} Make sure you have a stable connection"
                .to_string(),
            FailureKind::NoFoodDetected => format!(
                "{}\n\nTips for better detection:\n\
                 \u{2022} Ensure good lighting\n\
                 \u{2022} Center the food in the frame\n\
                 \u{2022} Use a clear, focused image\n\
                 \u{2022} Make sure food is clearly visible",
                self.detail
            ),
            FailureKind::Unknown => self.detail.clone(),
        }
    }
}

impl fmt::Display for DetectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.detail, self.kind)
    }
}

impl From<DetectionFailure> for FoodVisionError {
    fn from(failure: DetectionFailure) -> Self {
        let message = failure.user_message();
        match failure.kind {
            FailureKind::Validation => Self::Validation(message),
            FailureKind::Network => Self::Network(message),
            FailureKind::NoFoodDetected => Self::NoFoodDetected(message),
            FailureKind::Unknown => Self::Api(message),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValidationIssue {
    #[serde(default)]
    loc: Vec<serde_json::Value>,
    #[serde(default)]
    msg: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Detail {
    Text(String),
    Issues(Vec<ValidationIssue>),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Detail>,
    #[serde(default)]
    message: Option<String>,
}

/// Turns an error response body into a single message.
///
/// Understands `{detail: "..."}`, `{detail: [{loc, msg}]}` (rendered as
/// `loc.joined - msg`, comma separated) and `{message: "..."}`. Non-JSON
/// bodies are returned as-is; an empty body yields `API Error (status)`.
pub fn error_message_from_body(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: Some(Detail::Text(text)),
            ..
        }) => text,
        Ok(ErrorBody {
            detail: Some(Detail::Issues(issues)),
            ..
        }) => issues
            .iter()
            .map(|issue| {
                let loc: Vec<String> = issue
                    .loc
                    .iter()
                    .map(|part| match part {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                format!("{} - {}", loc.join("."), issue.msg)
            })
            .collect::<Vec<_>>()
            .join(", "),
        Ok(ErrorBody {
            message: Some(message),
            ..
        }) => message,
        Ok(_) => format!("API Error ({})", status.as_u16()),
        Err(_) if body.trim().is_empty() => format!("API Error ({})", status.as_u16()),
        Err(_) => body.to_string(),
    }
}
