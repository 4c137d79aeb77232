//! Capture-and-query pipeline
//!
//! [`CaptureMachine`] is a pure state machine over pick, detect and
//! follow-up events. Every network request it asks for carries a ticket from
//! a monotonically increasing sequence; a response is applied only when its
//! ticket is still the one the current state is waiting on, so results of a
//! superseded request are dropped instead of overwriting newer state.
//!
//! [`Pipeline`] drives the machine against a [`MediaSource`] and a
//! [`VisionApi`].

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::error::Result;
use crate::media::{self, MediaSource, SourceKind};
use crate::vision::{
    DetectionFailure, DetectionResult, FollowUpCategory, FollowUpQuery, FollowUpResult,
    PickedImage, VisionApi,
};

/// Identifies one outstanding request.
pub type Ticket = u64;

/// Follow-up lookup state, only meaningful next to a detection result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FollowUpState {
    #[default]
    Idle,
    Loading {
        category: FollowUpCategory,
        ticket: Ticket,
    },
    Loaded(FollowUpResult),
    Failed {
        category: FollowUpCategory,
        message: String,
    },
}

/// Where the user is in the capture flow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CaptureState {
    /// Nothing picked yet.
    #[default]
    Idle,
    /// The picker is open; `previous` is restored on cancel.
    Picking { previous: Box<CaptureState> },
    /// An image is selected and no detection has run for it.
    Ready { image: PickedImage },
    /// Detection request in flight.
    Detecting { image: PickedImage, ticket: Ticket },
    /// Detection succeeded.
    Detected {
        image: PickedImage,
        result: DetectionResult,
        follow_up: FollowUpState,
    },
    /// Detection failed; the image is kept for a retry.
    DetectionFailed {
        image: PickedImage,
        failure: DetectionFailure,
    },
}

impl CaptureState {
    /// The selected image, if any.
    pub fn image(&self) -> Option<&PickedImage> {
        match self {
            Self::Idle => None,
            Self::Picking { previous } => previous.image(),
            Self::Ready { image }
            | Self::Detecting { image, .. }
            | Self::Detected { image, .. }
            | Self::DetectionFailed { image, .. } => Some(image),
        }
    }

    /// The current detection result, if any.
    pub fn detection(&self) -> Option<&DetectionResult> {
        match self {
            Self::Detected { result, .. } => Some(result),
            Self::Picking { previous } => previous.detection(),
            _ => None,
        }
    }

    /// The follow-up state next to the current detection.
    pub fn follow_up(&self) -> Option<&FollowUpState> {
        match self {
            Self::Detected { follow_up, .. } => Some(follow_up),
            Self::Picking { previous } => previous.follow_up(),
            _ => None,
        }
    }

    /// The last detection failure, if any.
    pub fn failure(&self) -> Option<&DetectionFailure> {
        match self {
            Self::DetectionFailed { failure, .. } => Some(failure),
            Self::Picking { previous } => previous.failure(),
            _ => None,
        }
    }

    /// `true` while a detection request is outstanding.
    pub fn is_detecting(&self) -> bool {
        match self {
            Self::Detecting { .. } => true,
            Self::Picking { previous } => previous.is_detecting(),
            _ => false,
        }
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Picking { .. } => "picking",
            Self::Ready { .. } => "ready",
            Self::Detecting { .. } => "detecting",
            Self::Detected { .. } => "detected",
            Self::DetectionFailed { .. } => "detection-failed",
        };
        f.write_str(name)
    }
}

/// Inputs to the machine.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    PickStarted,
    PickCancelled,
    ImagePicked(PickedImage),
    DetectRequested,
    DetectSucceeded {
        ticket: Ticket,
        result: DetectionResult,
    },
    DetectFailed {
        ticket: Ticket,
        failure: DetectionFailure,
    },
    FollowUpRequested(FollowUpCategory),
    FollowUpSucceeded {
        ticket: Ticket,
        result: FollowUpResult,
    },
    FollowUpFailed {
        ticket: Ticket,
        message: String,
    },
}

/// Why a request was refused without touching the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Please select an image first.")]
    NoImageSelected,
    #[error("Detection is already in progress.")]
    DetectionInFlight,
    #[error("No food detected yet. Please detect food first.")]
    NoDetection,
    #[error("Another information request is still loading.")]
    FollowUpInFlight,
    #[error("There is nothing to retry.")]
    NothingToRetry,
}

/// What the caller has to do after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    SubmitDetection { ticket: Ticket, image: PickedImage },
    RequestFollowUp { ticket: Ticket, query: FollowUpQuery },
    Rejected(Rejection),
    /// A response arrived for a request that is no longer current.
    DiscardedStale,
}

/// Pure capture state machine.
#[derive(Debug, Clone, Default)]
pub struct CaptureMachine {
    state: CaptureState,
    last_ticket: Ticket,
}

impl CaptureMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    /// Most recently issued ticket.
    pub fn last_ticket(&self) -> Ticket {
        self.last_ticket
    }

    fn next_ticket(&mut self) -> Ticket {
        self.last_ticket += 1;
        self.last_ticket
    }

    fn with(self, state: CaptureState, effect: Effect) -> (Self, Effect) {
        (
            Self {
                state,
                last_ticket: self.last_ticket,
            },
            effect,
        )
    }

    fn unchanged(self, effect: Effect) -> (Self, Effect) {
        (self, effect)
    }

    /// Applies one event, returning the next machine and the effect to run.
    pub fn apply(mut self, event: CaptureEvent) -> (Self, Effect) {
        match event {
            CaptureEvent::PickStarted => match self.state {
                CaptureState::Picking { .. } => self.unchanged(Effect::None),
                _ => {
                    let previous = Box::new(std::mem::take(&mut self.state));
                    self.with(CaptureState::Picking { previous }, Effect::None)
                }
            },
            CaptureEvent::PickCancelled => match std::mem::take(&mut self.state) {
                CaptureState::Picking { previous } => self.with(*previous, Effect::None),
                other => self.with(other, Effect::None),
            },
            CaptureEvent::ImagePicked(image) => {
                // Any outstanding request belongs to the old image.
                self.next_ticket();
                self.with(CaptureState::Ready { image }, Effect::None)
            }
            CaptureEvent::DetectRequested => self.request_detection(),
            CaptureEvent::FollowUpRequested(category) => self.request_follow_up(category),
            response => self.apply_response(response),
        }
    }

    fn request_detection(mut self) -> (Self, Effect) {
        if self.state.is_detecting() {
            return self.unchanged(Effect::Rejected(Rejection::DetectionInFlight));
        }
        let image = match &self.state {
            CaptureState::Ready { image }
            | CaptureState::Detected { image, .. }
            | CaptureState::DetectionFailed { image, .. } => image.clone(),
            _ => return self.unchanged(Effect::Rejected(Rejection::NoImageSelected)),
        };
        let ticket = self.next_ticket();
        let effect = Effect::SubmitDetection {
            ticket,
            image: image.clone(),
        };
        self.with(CaptureState::Detecting { image, ticket }, effect)
    }

    fn request_follow_up(mut self, category: FollowUpCategory) -> (Self, Effect) {
        let query = match &self.state {
            CaptureState::Detected {
                follow_up: FollowUpState::Loading { .. },
                ..
            } => return self.unchanged(Effect::Rejected(Rejection::FollowUpInFlight)),
            CaptureState::Detected { result, .. } => FollowUpQuery::new(result, category),
            _ => return self.unchanged(Effect::Rejected(Rejection::NoDetection)),
        };
        let ticket = self.next_ticket();
        if let CaptureState::Detected { follow_up, .. } = &mut self.state {
            *follow_up = FollowUpState::Loading { category, ticket };
        }
        self.unchanged(Effect::RequestFollowUp { ticket, query })
    }

    fn apply_response(mut self, event: CaptureEvent) -> (Self, Effect) {
        // Responses landing while the picker is open update the state the
        // picker will fall back to.
        let state = match std::mem::take(&mut self.state) {
            CaptureState::Picking { previous } => {
                let inner = Self {
                    state: *previous,
                    last_ticket: self.last_ticket,
                };
                let (inner, effect) = inner.apply_response(event);
                let state = CaptureState::Picking {
                    previous: Box::new(inner.state),
                };
                return self.with(state, effect);
            }
            other => other,
        };

        match (state, event) {
            (
                CaptureState::Detecting { image, ticket },
                CaptureEvent::DetectSucceeded { ticket: got, result },
            ) if got == ticket => self.with(
                CaptureState::Detected {
                    image,
                    result,
                    follow_up: FollowUpState::Idle,
                },
                Effect::None,
            ),
            (
                CaptureState::Detecting { image, ticket },
                CaptureEvent::DetectFailed { ticket: got, failure },
            ) if got == ticket => {
                self.with(CaptureState::DetectionFailed { image, failure }, Effect::None)
            }
            (
                CaptureState::Detected {
                    image,
                    result,
                    follow_up: FollowUpState::Loading { ticket, .. },
                },
                CaptureEvent::FollowUpSucceeded {
                    ticket: got,
                    result: info,
                },
            ) if got == ticket => self.with(
                CaptureState::Detected {
                    image,
                    result,
                    follow_up: FollowUpState::Loaded(info),
                },
                Effect::None,
            ),
            (
                CaptureState::Detected {
                    image,
                    result,
                    follow_up: FollowUpState::Loading { category, ticket },
                },
                CaptureEvent::FollowUpFailed { ticket: got, message },
            ) if got == ticket => self.with(
                CaptureState::Detected {
                    image,
                    result,
                    follow_up: FollowUpState::Failed { category, message },
                },
                Effect::None,
            ),
            (state, event) => {
                tracing::debug!(state = %state, event = ?event_name(&event), "Discarding stale response");
                self.with(state, Effect::DiscardedStale)
            }
        }
    }
}

fn event_name(event: &CaptureEvent) -> &'static str {
    match event {
        CaptureEvent::PickStarted => "pick-started",
        CaptureEvent::PickCancelled => "pick-cancelled",
        CaptureEvent::ImagePicked(_) => "image-picked",
        CaptureEvent::DetectRequested => "detect-requested",
        CaptureEvent::DetectSucceeded { .. } => "detect-succeeded",
        CaptureEvent::DetectFailed { .. } => "detect-failed",
        CaptureEvent::FollowUpRequested(_) => "follow-up-requested",
        CaptureEvent::FollowUpSucceeded { .. } => "follow-up-succeeded",
        CaptureEvent::FollowUpFailed { .. } => "follow-up-failed",
    }
}

/// Message shown when a follow-up lookup fails.
pub fn follow_up_failure_message(category: FollowUpCategory, error: &str) -> String {
    format!(
        "Failed to get {} information. Please try again.\n\nError: {}",
        category.label().to_lowercase(),
        error
    )
}

// ----------------------------------------------------------------------------
// Driver
// ----------------------------------------------------------------------------

/// Runs the capture machine against real collaborators.
///
/// There are no automatic retries; [`Pipeline::retry`] repeats the last failed
/// step on request.
pub struct Pipeline {
    machine: CaptureMachine,
    vision: Arc<dyn VisionApi>,
}

impl Pipeline {
    pub fn new(vision: Arc<dyn VisionApi>) -> Self {
        Self {
            machine: CaptureMachine::new(),
            vision,
        }
    }

    pub fn state(&self) -> &CaptureState {
        self.machine.state()
    }

    /// Back to `Idle`, dropping the image and all results.
    pub fn reset(&mut self) {
        self.machine = CaptureMachine {
            state: CaptureState::Idle,
            last_ticket: self.machine.last_ticket + 1,
        };
    }

    fn dispatch(&mut self, event: CaptureEvent) -> Effect {
        let name = event_name(&event);
        let machine = std::mem::take(&mut self.machine);
        let (machine, effect) = machine.apply(event);
        self.machine = machine;
        tracing::debug!(event = name, state = %self.machine.state(), "Capture transition");
        effect
    }

    /// Opens `source` and replaces the selected image with the pick.
    ///
    /// Returns `false` when the user cancelled; the previous state is kept.
    ///
    /// # Errors
    ///
    /// Propagates permission and read errors; the previous state is kept.
    pub async fn pick_image(&mut self, source: &dyn MediaSource, kind: SourceKind) -> Result<bool> {
        self.dispatch(CaptureEvent::PickStarted);
        match media::pick_image(source, kind).await {
            Ok(Some(image)) => {
                self.dispatch(CaptureEvent::ImagePicked(image));
                Ok(true)
            }
            Ok(None) => {
                self.dispatch(CaptureEvent::PickCancelled);
                Ok(false)
            }
            Err(e) => {
                self.dispatch(CaptureEvent::PickCancelled);
                Err(e)
            }
        }
    }

    /// Sends the selected image for detection and records the outcome.
    ///
    /// A failed detection is not an error here; it is recorded as
    /// [`CaptureState::DetectionFailed`].
    pub async fn submit_detection(&mut self) -> std::result::Result<(), Rejection> {
        match self.dispatch(CaptureEvent::DetectRequested) {
            Effect::SubmitDetection { ticket, image } => {
                let event = match self.vision.detect_food(&image).await {
                    Ok(result) => CaptureEvent::DetectSucceeded { ticket, result },
                    Err(failure) => {
                        tracing::warn!(kind = %failure.kind, "Detection failed: {}", failure.detail);
                        CaptureEvent::DetectFailed { ticket, failure }
                    }
                };
                self.dispatch(event);
                Ok(())
            }
            Effect::Rejected(rejection) => Err(rejection),
            _ => Ok(()),
        }
    }

    /// Looks up `category` for the current detection.
    pub async fn request_follow_up(
        &mut self,
        category: FollowUpCategory,
    ) -> std::result::Result<(), Rejection> {
        match self.dispatch(CaptureEvent::FollowUpRequested(category)) {
            Effect::RequestFollowUp { ticket, query } => {
                let event = match self.vision.food_info(&query).await {
                    Ok(result) => CaptureEvent::FollowUpSucceeded { ticket, result },
                    Err(e) => {
                        tracing::warn!(info = %query.info_type, "Follow-up failed: {}", e);
                        CaptureEvent::FollowUpFailed {
                            ticket,
                            message: follow_up_failure_message(category, &e.to_string()),
                        }
                    }
                };
                self.dispatch(event);
                Ok(())
            }
            Effect::Rejected(rejection) => Err(rejection),
            _ => Ok(()),
        }
    }

    /// Repeats the failed detection or the failed follow-up.
    pub async fn retry(&mut self) -> std::result::Result<(), Rejection> {
        let failed_category = match self.state() {
            CaptureState::DetectionFailed { .. } => return self.submit_detection().await,
            CaptureState::Detected {
                follow_up: FollowUpState::Failed { category, .. },
                ..
            } => *category,
            _ => return Err(Rejection::NothingToRetry),
        };
        self.request_follow_up(failed_category).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{picked_image, FakeVisionApi};
    use crate::vision::FailureKind;

    fn pizza() -> DetectionResult {
        DetectionResult {
            food_name: "Pizza".to_string(),
            options: vec!["calories".to_string()],
        }
    }

    fn detected_machine() -> (CaptureMachine, Ticket) {
        let (m, _) = CaptureMachine::new().apply(CaptureEvent::ImagePicked(picked_image("a.jpg")));
        let (m, effect) = m.apply(CaptureEvent::DetectRequested);
        let ticket = match effect {
            Effect::SubmitDetection { ticket, .. } => ticket,
            other => panic!("unexpected effect {:?}", other),
        };
        let (m, _) = m.apply(CaptureEvent::DetectSucceeded {
            ticket,
            result: pizza(),
        });
        (m, ticket)
    }

    #[test]
    fn test_detect_without_image_is_rejected() {
        let (m, effect) = CaptureMachine::new().apply(CaptureEvent::DetectRequested);
        assert_eq!(effect, Effect::Rejected(Rejection::NoImageSelected));
        assert_eq!(m.state(), &CaptureState::Idle);
    }

    #[test]
    fn test_detect_while_detecting_is_rejected() {
        let (m, _) = CaptureMachine::new().apply(CaptureEvent::ImagePicked(picked_image("a.jpg")));
        let (m, _) = m.apply(CaptureEvent::DetectRequested);
        let (m, effect) = m.apply(CaptureEvent::DetectRequested);
        assert_eq!(effect, Effect::Rejected(Rejection::DetectionInFlight));
        assert!(m.state().is_detecting());
    }

    #[test]
    fn test_follow_up_without_detection_is_rejected() {
        let (_, effect) = CaptureMachine::new()
            .apply(CaptureEvent::FollowUpRequested(FollowUpCategory::Calories));
        assert_eq!(effect, Effect::Rejected(Rejection::NoDetection));
    }

    #[test]
    fn test_follow_up_query_uses_detected_food() {
        let (m, _) = detected_machine();
        let (_, effect) = m.apply(CaptureEvent::FollowUpRequested(FollowUpCategory::Calories));
        match effect {
            Effect::RequestFollowUp { query, .. } => {
                assert_eq!(query.food_name, "Pizza");
                assert_eq!(query.info_type, "calories");
            }
            other => panic!("unexpected effect {:?}", other),
        }
    }

    #[test]
    fn test_second_follow_up_rejected_until_first_resolves() {
        let (m, _) = detected_machine();
        let (m, first) = m.apply(CaptureEvent::FollowUpRequested(FollowUpCategory::Calories));
        let ticket = match first {
            Effect::RequestFollowUp { ticket, .. } => ticket,
            other => panic!("unexpected effect {:?}", other),
        };

        let (m, second) = m.apply(CaptureEvent::FollowUpRequested(FollowUpCategory::Ingredients));
        assert_eq!(second, Effect::Rejected(Rejection::FollowUpInFlight));

        let (m, _) = m.apply(CaptureEvent::FollowUpSucceeded {
            ticket,
            result: FollowUpResult {
                food_name: "Pizza".to_string(),
                info_type: "calories".to_string(),
                response: "About 285 kcal per slice".to_string(),
            },
        });
        let (_, third) = m.apply(CaptureEvent::FollowUpRequested(FollowUpCategory::Ingredients));
        assert!(matches!(third, Effect::RequestFollowUp { .. }));
    }

    #[test]
    fn test_repick_clears_detection_and_follow_up() {
        let (m, _) = detected_machine();
        let (m, _) = m.apply(CaptureEvent::PickStarted);
        assert!(m.state().detection().is_some());

        let (m, _) = m.apply(CaptureEvent::ImagePicked(picked_image("b.jpg")));
        assert!(m.state().detection().is_none());
        assert!(m.state().follow_up().is_none());
        assert_eq!(m.state().image().unwrap().file_name, "b.jpg");
    }

    #[test]
    fn test_pick_cancel_restores_previous_state() {
        let (m, _) = detected_machine();
        let before = m.state().clone();
        let (m, _) = m.apply(CaptureEvent::PickStarted);
        let (m, _) = m.apply(CaptureEvent::PickCancelled);
        assert_eq!(m.state(), &before);
    }

    #[test]
    fn test_stale_detection_response_is_discarded() {
        let (m, _) = CaptureMachine::new().apply(CaptureEvent::ImagePicked(picked_image("a.jpg")));
        let (m, effect) = m.apply(CaptureEvent::DetectRequested);
        let old = match effect {
            Effect::SubmitDetection { ticket, .. } => ticket,
            other => panic!("unexpected effect {:?}", other),
        };
        let (m, _) = m.apply(CaptureEvent::ImagePicked(picked_image("b.jpg")));

        let (m, effect) = m.apply(CaptureEvent::DetectSucceeded {
            ticket: old,
            result: pizza(),
        });
        assert_eq!(effect, Effect::DiscardedStale);
        assert!(matches!(m.state(), CaptureState::Ready { image } if image.file_name == "b.jpg"));
    }

    #[test]
    fn test_stale_follow_up_after_new_detection_is_discarded() {
        let (m, _) = detected_machine();
        let (m, effect) = m.apply(CaptureEvent::FollowUpRequested(FollowUpCategory::Calories));
        let old = match effect {
            Effect::RequestFollowUp { ticket, .. } => ticket,
            other => panic!("unexpected effect {:?}", other),
        };
        let (m, _) = m.apply(CaptureEvent::DetectRequested);
        let (m, effect) = m.apply(CaptureEvent::FollowUpFailed {
            ticket: old,
            message: "late".to_string(),
        });
        assert_eq!(effect, Effect::DiscardedStale);
        assert!(m.state().is_detecting());
    }

    #[test]
    fn test_detection_response_during_pick_updates_fallback() {
        let (m, _) = CaptureMachine::new().apply(CaptureEvent::ImagePicked(picked_image("a.jpg")));
        let (m, effect) = m.apply(CaptureEvent::DetectRequested);
        let ticket = match effect {
            Effect::SubmitDetection { ticket, .. } => ticket,
            other => panic!("unexpected effect {:?}", other),
        };
        let (m, _) = m.apply(CaptureEvent::PickStarted);
        let (m, effect) = m.apply(CaptureEvent::DetectSucceeded {
            ticket,
            result: pizza(),
        });
        assert_eq!(effect, Effect::None);
        let (m, _) = m.apply(CaptureEvent::PickCancelled);
        assert_eq!(m.state().detection(), Some(&pizza()));
    }

    #[tokio::test]
    async fn test_pipeline_detect_without_image_makes_no_call() {
        let vision = Arc::new(FakeVisionApi::default());
        let mut pipeline = Pipeline::new(vision.clone());
        let result = pipeline.submit_detection().await;
        assert_eq!(result, Err(Rejection::NoImageSelected));
        assert_eq!(vision.detect_calls(), 0);
    }

    #[tokio::test]
    async fn test_pipeline_detect_then_follow_up() {
        let vision = Arc::new(FakeVisionApi::default());
        vision.set_detection(Ok(pizza()));
        vision.set_info_response("About 285 kcal per slice");
        let mut pipeline = Pipeline::new(vision.clone());

        let source = crate::test_utils::FakeMediaSource::with_image(picked_image("pizza.jpg"));
        assert!(pipeline.pick_image(&source, SourceKind::Library).await.unwrap());
        pipeline.submit_detection().await.unwrap();
        pipeline
            .request_follow_up(FollowUpCategory::Calories)
            .await
            .unwrap();

        match pipeline.state().follow_up() {
            Some(FollowUpState::Loaded(result)) => {
                assert_eq!(result.label(), "Calories");
                assert_eq!(result.response, "About 285 kcal per slice");
            }
            other => panic!("unexpected follow-up state {:?}", other),
        }
        assert_eq!(
            vision.last_query(),
            Some(FollowUpQuery {
                food_name: "Pizza".to_string(),
                info_type: "calories".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_pipeline_retry_after_failure() {
        let vision = Arc::new(FakeVisionApi::default());
        vision.set_detection(Err(DetectionFailure::new(FailureKind::Network, "timeout")));
        let mut pipeline = Pipeline::new(vision.clone());
        let source = crate::test_utils::FakeMediaSource::with_image(picked_image("pizza.jpg"));
        pipeline.pick_image(&source, SourceKind::Camera).await.unwrap();

        pipeline.submit_detection().await.unwrap();
        assert_eq!(pipeline.state().failure().unwrap().kind, FailureKind::Network);

        vision.set_detection(Ok(pizza()));
        pipeline.retry().await.unwrap();
        assert_eq!(pipeline.state().detection(), Some(&pizza()));
        assert_eq!(vision.detect_calls(), 2);
    }

    #[tokio::test]
    async fn test_pipeline_follow_up_failure_message() {
        let vision = Arc::new(FakeVisionApi::default());
        vision.set_detection(Ok(pizza()));
        let mut pipeline = Pipeline::new(vision.clone());
        let source = crate::test_utils::FakeMediaSource::with_image(picked_image("pizza.jpg"));
        pipeline.pick_image(&source, SourceKind::Library).await.unwrap();
        pipeline.submit_detection().await.unwrap();
        pipeline
            .request_follow_up(FollowUpCategory::AllergenInfo)
            .await
            .unwrap();

        match pipeline.state().follow_up() {
            Some(FollowUpState::Failed { category, message }) => {
                assert_eq!(*category, FollowUpCategory::AllergenInfo);
                assert!(message.starts_with("Failed to get allergen info information."));
            }
            other => panic!("unexpected follow-up state {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pipeline_cancelled_pick_keeps_state() {
        let vision = Arc::new(FakeVisionApi::default());
        let mut pipeline = Pipeline::new(vision);
        let source = crate::test_utils::FakeMediaSource::cancelled();
        assert!(!pipeline.pick_image(&source, SourceKind::Library).await.unwrap());
        assert_eq!(pipeline.state(), &CaptureState::Idle);
    }
}
