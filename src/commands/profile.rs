//! Profile commands

use colored::Colorize;

use crate::commands::render::print_profile;
use crate::commands::{require_screen, Services};
use crate::error::Result;
use crate::gate::Screen;

/// Shows the signed-in user's profile.
pub async fn show(services: &Services) -> Result<()> {
    let mut gate = services.gate();
    let state = gate.start().await;
    require_screen(state, Screen::Profile)
        .or_else(|_| require_screen(state, Screen::AgeSetup))?;

    let profile = gate.profile().await?;
    print_profile(&profile);
    Ok(())
}

/// Completes setup by saving the user's age.
pub async fn set_age(services: &Services, input: &str) -> Result<()> {
    let mut gate = services.gate();
    let state = gate.start().await;
    // Editing the age later is allowed from the profile screen.
    require_screen(state, Screen::AgeSetup).or_else(|_| require_screen(state, Screen::Profile))?;

    let age = gate.save_age(input).await?;
    println!("{} (age {})", "Profile setup complete!".green(), age);
    Ok(())
}
