//! Food-vision client and pipeline against a mocked service.

mod common;

use std::sync::Arc;

use bytes::Bytes;
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use foodvision::media::{MediaSource, PermissionStatus, SourceKind};
use foodvision::pipeline::{CaptureState, FollowUpState, Pipeline};
use foodvision::vision::{
    FailureKind, FollowUpCategory, FollowUpQuery, FoodVisionClient, PickedImage, VisionApi,
};

fn client(server: &MockServer) -> FoodVisionClient {
    FoodVisionClient::new(&common::vision_config(&server.uri())).unwrap()
}

fn image() -> PickedImage {
    PickedImage {
        uri: "/tmp/pizza.jpg".into(),
        mime_type: "image/jpeg".to_string(),
        file_name: "pizza.jpg".to_string(),
        bytes: Bytes::from_static(b"\xFF\xD8\xFFjpeg-bytes"),
    }
}

struct OneImage;

#[async_trait::async_trait]
impl MediaSource for OneImage {
    async fn request_permission(&self, _kind: SourceKind) -> foodvision::Result<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }

    async fn launch(&self, _kind: SourceKind) -> foodvision::Result<Option<PickedImage>> {
        Ok(Some(image()))
    }
}

#[tokio::test]
async fn test_detect_sends_multipart_image_and_language() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/detect_food"))
        .and(body_string_contains(r#"name="image"; filename="pizza.jpg""#))
        .and(body_string_contains(r#"name="lang""#))
        .and(body_string_contains("english"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "food_name": "Pizza",
            "options": ["calories", "ingredients"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server).detect_food(&image()).await.unwrap();
    assert_eq!(result.food_name, "Pizza");
    assert_eq!(result.options, vec!["calories", "ingredients"]);
}

#[tokio::test]
async fn test_missing_field_422_is_validation_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/detect_food"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "detail": [{"loc": ["body", "image"], "msg": "Field required", "type": "missing"}]
        })))
        .mount(&server)
        .await;

    let failure = client(&server).detect_food(&image()).await.unwrap_err();
    assert_eq!(failure.kind, FailureKind::Validation);
    assert_eq!(failure.detail, "body.image - Field required");
    assert!(failure
        .user_message()
        .starts_with("Image data validation failed. Please try:"));
}

#[tokio::test]
async fn test_gateway_timeout_is_network_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/detect_food"))
        .respond_with(ResponseTemplate::new(504))
        .mount(&server)
        .await;

    let failure = client(&server).detect_food(&image()).await.unwrap_err();
    assert_eq!(failure.kind, FailureKind::Network);
    assert_eq!(failure.detail, "API Error (504)");
}

#[tokio::test]
async fn test_empty_food_name_is_no_food_detected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/detect_food"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"food_name": ""})))
        .mount(&server)
        .await;

    let failure = client(&server).detect_food(&image()).await.unwrap_err();
    assert_eq!(failure.kind, FailureKind::NoFoodDetected);
    assert!(failure.user_message().contains("Tips for better detection"));
}

#[tokio::test]
async fn test_non_json_success_is_invalid_format() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/detect_food"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let failure = client(&server).detect_food(&image()).await.unwrap_err();
    assert_eq!(failure.detail, "Invalid response format from server");
}

#[tokio::test]
async fn test_food_info_error_reports_status_and_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/food_info"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let query = FollowUpQuery {
        food_name: "Pizza".to_string(),
        info_type: "calories".to_string(),
    };
    let err = client(&server).food_info(&query).await.unwrap_err();
    assert!(err.to_string().contains("500: boom"));
}

#[tokio::test]
async fn test_pipeline_pizza_calories_round() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/detect_food"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "food_name": "Pizza",
            "options": ["calories"]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/food_info"))
        .and(body_json(json!({"food_name": "Pizza", "info_type": "calories"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "food_name": "Pizza",
            "info_type": "calories",
            "response": "About 285 kcal per slice."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut pipeline = Pipeline::new(Arc::new(client(&server)));
    pipeline
        .pick_image(&OneImage, SourceKind::Library)
        .await
        .unwrap();
    pipeline.submit_detection().await.unwrap();
    pipeline
        .request_follow_up(FollowUpCategory::Calories)
        .await
        .unwrap();

    match pipeline.state() {
        CaptureState::Detected {
            result,
            follow_up: FollowUpState::Loaded(info),
            ..
        } => {
            assert_eq!(result.food_name, "Pizza");
            assert_eq!(info.label(), "Calories");
            assert_eq!(info.response, "About 285 kcal per slice.");
        }
        other => panic!("unexpected state {:?}", other),
    }
}

#[tokio::test]
async fn test_pipeline_without_image_never_calls_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut pipeline = Pipeline::new(Arc::new(client(&server)));
    assert!(pipeline.submit_detection().await.is_err());
    assert!(pipeline
        .request_follow_up(FollowUpCategory::Calories)
        .await
        .is_err());
}
