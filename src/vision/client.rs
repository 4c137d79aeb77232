//! HTTP client for the food recognition service

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::config::VisionConfig;
use crate::error::{FoodVisionError, Result};

use super::failure::{error_message_from_body, DetectionFailure, FailureKind, NO_FOOD_MESSAGE};
use super::{DetectionResult, FollowUpQuery, FollowUpResult, PickedImage, VisionApi};

/// [`VisionApi`] over `POST /detect_food` and `POST /food_info`.
#[derive(Debug, Clone)]
pub struct FoodVisionClient {
    http: reqwest::Client,
    base_url: Url,
    language: String,
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    food_name: Option<String>,
    #[serde(default)]
    options: Vec<String>,
}

impl FoodVisionClient {
    /// Builds a client from vision configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FoodVisionError::Config`] for an invalid base URL.
    pub fn new(config: &VisionConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url).map_err(|e| {
            FoodVisionError::Config(format!("Invalid vision url {}: {}", config.base_url, e))
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(FoodVisionError::Http)?;

        Ok(Self {
            http,
            base_url,
            language: config.language.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| FoodVisionError::Config(format!("Invalid endpoint {}: {}", path, e)).into())
    }
}

#[async_trait]
impl VisionApi for FoodVisionClient {
    async fn detect_food(
        &self,
        image: &PickedImage,
    ) -> std::result::Result<DetectionResult, DetectionFailure> {
        let url = self
            .endpoint("detect_food")
            .map_err(|e| DetectionFailure::new(FailureKind::Unknown, e.to_string()))?;

        let part = Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime_type)
            .map_err(|e| DetectionFailure::new(FailureKind::Validation, e.to_string()))?;
        let form = Form::new()
            .part("image", part)
            .text("lang", self.language.clone());

        tracing::debug!(
            file = %image.file_name,
            mime = %image.mime_type,
            size = image.bytes.len(),
            "Uploading image for detection"
        );

        let response = self
            .http
            .post(url)
            .header("Accept", "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Detection request failed: {}", e);
                DetectionFailure::from_transport(&e)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DetectionFailure::from_transport(&e))?;

        if !status.is_success() {
            let message = error_message_from_body(status, &body);
            tracing::error!("Detection failed with {}: {}", status, message);
            return Err(DetectionFailure::from_response(status, &message));
        }

        let parsed: DetectResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Detection response was not JSON: {}", e);
            DetectionFailure::new(FailureKind::Unknown, "Invalid response format from server")
        })?;

        match parsed.food_name {
            Some(food_name) if !food_name.trim().is_empty() => {
                tracing::info!(food = %food_name, "Food detected");
                Ok(DetectionResult {
                    food_name,
                    options: parsed.options,
                })
            }
            _ => Err(DetectionFailure::new(
                FailureKind::NoFoodDetected,
                NO_FOOD_MESSAGE,
            )),
        }
    }

    async fn food_info(&self, query: &FollowUpQuery) -> Result<FollowUpResult> {
        let url = self.endpoint("food_info")?;
        tracing::debug!(food = %query.food_name, info = %query.info_type, "Requesting food info");

        let response = self
            .http
            .post(url)
            .header("Accept", "application/json")
            .json(query)
            .send()
            .await
            .map_err(|e| FoodVisionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!("Food info failed with {}: {}", status, text);
            return Err(FoodVisionError::Api(status_line(status, &text)).into());
        }

        let result: FollowUpResult = response.json().await.map_err(|e| {
            FoodVisionError::Api(format!("Invalid response format from server: {}", e))
        })?;
        Ok(result)
    }
}

fn status_line(status: StatusCode, text: &str) -> String {
    format!("{}: {}", status.as_u16(), text)
}
