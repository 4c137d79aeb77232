//! One-shot detection command

use std::path::Path;

use colored::Colorize;

use crate::commands::render::{print_detection, print_follow_up};
use crate::commands::{require_screen, Services};
use crate::error::{FoodVisionError, Result};
use crate::gate::Screen;
use crate::media::SourceKind;
use crate::pipeline::{CaptureState, FollowUpState};
use crate::vision::FollowUpCategory;

/// Detects the food in `image` and fetches each requested category.
///
/// Only reachable with a complete profile. Category names are validated
/// before anything is uploaded.
pub async fn run_detect(services: &Services, image: &Path, info: &[String]) -> Result<()> {
    let categories = info
        .iter()
        .map(|key| key.parse::<FollowUpCategory>())
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut gate = services.gate();
    let state = gate.start().await;
    require_screen(state, Screen::Home)?;

    let mut pipeline = services.pipeline();
    let source = services.media().with_library_file(image);
    pipeline.pick_image(&source, SourceKind::Library).await?;
    pipeline
        .submit_detection()
        .await
        .map_err(|r| FoodVisionError::Validation(r.to_string()))?;

    let detection = match pipeline.state() {
        CaptureState::Detected { result, .. } => result.clone(),
        CaptureState::DetectionFailed { failure, .. } => {
            return Err(FoodVisionError::from(failure.clone()).into())
        }
        other => {
            return Err(FoodVisionError::Api(format!("Unexpected pipeline state: {}", other)).into())
        }
    };
    print_detection(&detection);

    let mut failed = 0;
    for category in categories {
        pipeline
            .request_follow_up(category)
            .await
            .map_err(|r| FoodVisionError::Validation(r.to_string()))?;
        match pipeline.state().follow_up() {
            Some(FollowUpState::Loaded(info)) => print_follow_up(info),
            Some(FollowUpState::Failed { message, .. }) => {
                failed += 1;
                eprintln!("{}", message.red());
            }
            _ => {}
        }
    }

    if failed > 0 {
        return Err(FoodVisionError::Api(format!("{} information request(s) failed", failed)).into());
    }
    Ok(())
}
