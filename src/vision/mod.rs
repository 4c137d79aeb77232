//! Food recognition service: types, classification and HTTP client
//!
//! Detection uploads a picture and returns the recognised food; follow-up
//! queries ask for one [`FollowUpCategory`] of information about it.

pub mod categories;
pub mod client;
pub mod failure;

pub use categories::{label_for_key, FollowUpCategory};
pub use client::FoodVisionClient;
pub use failure::{error_message_from_body, DetectionFailure, FailureKind, NO_FOOD_MESSAGE};

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// An image chosen from the camera or the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedImage {
    /// Where the image was read from.
    pub uri: PathBuf,
    /// MIME type sent with the upload.
    pub mime_type: String,
    /// File name sent with the upload; always carries an extension.
    pub file_name: String,
    /// Raw image bytes.
    pub bytes: Bytes,
}

/// Outcome of a successful detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Recognised food.
    pub food_name: String,
    /// Follow-up keys the service suggests; may be empty.
    #[serde(default)]
    pub options: Vec<String>,
}

/// Body of a follow-up request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpQuery {
    pub food_name: String,
    pub info_type: String,
}

impl FollowUpQuery {
    /// Query for `category` about the detected food.
    pub fn new(detection: &DetectionResult, category: FollowUpCategory) -> Self {
        Self {
            food_name: detection.food_name.clone(),
            info_type: category.key().to_string(),
        }
    }
}

/// Answer to a follow-up request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpResult {
    pub food_name: String,
    pub info_type: String,
    pub response: String,
}

impl FollowUpResult {
    /// Heading the answer is shown under.
    pub fn label(&self) -> String {
        label_for_key(&self.info_type)
    }
}

/// Remote food recognition service.
#[async_trait]
pub trait VisionApi: Send + Sync {
    /// Uploads `image` for recognition.
    ///
    /// Failures come back already classified so callers can pick guidance
    /// without inspecting transport errors.
    async fn detect_food(
        &self,
        image: &PickedImage,
    ) -> std::result::Result<DetectionResult, DetectionFailure>;

    /// Asks for one category of information about a detected food.
    async fn food_info(&self, query: &FollowUpQuery) -> Result<FollowUpResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_uses_category_key() {
        let detection = DetectionResult {
            food_name: "Pizza".to_string(),
            options: vec![],
        };
        let query = FollowUpQuery::new(&detection, FollowUpCategory::Calories);
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            serde_json::json!({"food_name": "Pizza", "info_type": "calories"})
        );
    }

    #[test]
    fn test_detection_result_options_default() {
        let result: DetectionResult = serde_json::from_str(r#"{"food_name":"Sushi"}"#).unwrap();
        assert!(result.options.is_empty());
    }

    #[test]
    fn test_follow_up_label() {
        let result = FollowUpResult {
            food_name: "Pizza".to_string(),
            info_type: "hypertension_friendly".to_string(),
            response: "Moderate sodium".to_string(),
        };
        assert_eq!(result.label(), "Hypertension Guidelines");
    }
}
