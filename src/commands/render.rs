//! Terminal rendering of gate, profile and pipeline state

use colored::Colorize;

use crate::gate::{GateState, Screen};
use crate::pipeline::{CaptureState, FollowUpState};
use crate::profile::Profile;
use crate::vision::{label_for_key, DetectionFailure, DetectionResult, FollowUpResult};

/// One-line summary of the gate.
pub fn print_gate(state: &GateState) {
    let label = match state {
        GateState::Loading { .. } => "loading".yellow(),
        GateState::Unauthenticated => "signed out".red(),
        GateState::AuthenticatedNoProfile { .. } => "signed in, profile incomplete".yellow(),
        GateState::AuthenticatedWithProfile { .. } => "signed in".green(),
    };
    let screens: Vec<String> = state.screens().iter().map(Screen::to_string).collect();
    println!("{} {}", "Status:".bold(), label);
    println!("{} {}", "Screens:".bold(), screens.join(", "));
}

/// Prints the profile screen's e-mail and age.
pub fn print_profile(profile: &Profile) {
    println!("{}", "Profile".bold());
    println!("  Email: {}", profile.email.as_deref().unwrap_or("-"));
    match profile.age {
        Some(age) => println!("  Age:   {}", age),
        None => println!("  Age:   {}", "not set".yellow()),
    }
}

/// Prints the detected food and the categories the service suggests.
pub fn print_detection(result: &DetectionResult) {
    println!("{} {}", "Detected:".green().bold(), result.food_name.bold());
    if !result.options.is_empty() {
        let labels: Vec<String> = result.options.iter().map(|k| label_for_key(k)).collect();
        println!("{} {}", "Ask about:".bold(), labels.join(", "));
    }
}

/// Prints a failed detection with its guidance text.
pub fn print_detection_failure(failure: &DetectionFailure) {
    eprintln!("{}", failure.user_message().red());
}

/// Prints the answer under its category label.
pub fn print_follow_up(result: &FollowUpResult) {
    println!();
    println!("{}", result.label().cyan().bold());
    println!("{}", result.response);
}

/// Renders whatever the capture pipeline currently holds.
pub fn print_capture(state: &CaptureState) {
    match state {
        CaptureState::Idle => println!("{}", "No image selected.".dimmed()),
        CaptureState::Picking { .. } => println!("{}", "Choosing an image...".dimmed()),
        CaptureState::Ready { image } => {
            println!("{} {} ({})", "Selected:".bold(), image.file_name, image.mime_type)
        }
        CaptureState::Detecting { .. } => println!("{}", "Detecting...".yellow()),
        CaptureState::Detected {
            result, follow_up, ..
        } => {
            print_detection(result);
            match follow_up {
                FollowUpState::Idle => {}
                FollowUpState::Loading { category, .. } => {
                    println!("{}", format!("Loading {}...", category.label()).yellow())
                }
                FollowUpState::Loaded(info) => print_follow_up(info),
                FollowUpState::Failed { message, .. } => eprintln!("{}", message.red()),
            }
        }
        CaptureState::DetectionFailed { failure, .. } => print_detection_failure(failure),
    }
}
