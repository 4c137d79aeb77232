//! Account commands: status, sign-in, sign-up, sign-out, password reset

use colored::Colorize;

use crate::auth::{validate_sign_up, SignUpOutcome};
use crate::commands::render::print_gate;
use crate::commands::Services;
use crate::error::Result;
use crate::gate::GateState;

/// Prints the gate's current state after bootstrapping the session.
pub async fn status(services: &Services) -> Result<()> {
    let mut gate = services.gate();
    gate.start().await;
    if services.sessions.current_user().is_some() {
        match services.sessions.fetch_user().await {
            Ok(user) => println!(
                "{} {}",
                "User:".bold(),
                user.email.as_deref().unwrap_or(user.id.as_str())
            ),
            Err(e) => tracing::warn!("Could not confirm the signed-in user: {}", e),
        }
    }
    print_gate(gate.sync().await);
    Ok(())
}

/// Signs in and reports where the gate lands.
pub async fn sign_in(services: &Services, email: &str, password: &str) -> Result<()> {
    let mut gate = services.gate();
    gate.start().await;

    let session = services.sessions.sign_in(email, password).await?;
    let state = gate.sync().await;

    println!(
        "{} {}",
        "Signed in as".green(),
        session.user.email.as_deref().unwrap_or(session.user.id.as_str())
    );
    print_next_step(state);
    Ok(())
}

/// Creates an account.
pub async fn sign_up(
    services: &Services,
    email: &str,
    password: &str,
    confirm_password: Option<&str>,
) -> Result<()> {
    validate_sign_up(email, password, confirm_password.unwrap_or(password))?;

    let mut gate = services.gate();
    gate.start().await;

    match services.sessions.sign_up(email, password).await? {
        SignUpOutcome::ConfirmationRequired => {
            println!("{}", "Check Your Email".bold());
            println!(
                "A confirmation link has been sent to your email. Please verify your account before signing in."
            );
        }
        SignUpOutcome::SignedIn(session) => {
            let state = gate.sync().await;
            println!(
                "{} {}",
                "Account created, signed in as".green(),
                session.user.email.as_deref().unwrap_or(session.user.id.as_str())
            );
            print_next_step(state);
        }
    }
    Ok(())
}

/// Signs out; the local cache is cleared even if the backend is unreachable.
pub async fn sign_out(services: &Services) -> Result<()> {
    services.sessions.initialize().await;
    services.sessions.sign_out().await?;
    println!("{}", "Signed out.".green());
    Ok(())
}

/// Requests a password-reset e-mail.
pub async fn reset_password(services: &Services, email: &str) -> Result<()> {
    services.sessions.reset_password(email).await?;
    println!("Password reset instructions have been sent to your email.");
    Ok(())
}

fn print_next_step(state: &GateState) {
    match state {
        GateState::AuthenticatedNoProfile { .. } => println!(
            "{}",
            "Finish setup with: foodvision profile set-age <AGE>".yellow()
        ),
        GateState::AuthenticatedWithProfile { .. } => println!(
            "{}",
            "Ready. Try: foodvision detect <IMAGE> --info calories".dimmed()
        ),
        _ => {}
    }
}
