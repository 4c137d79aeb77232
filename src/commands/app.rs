//! Interactive app shell
//!
//! A readline loop over the gate: the prompt shows where the user is, and
//! only commands belonging to a reachable screen are executed. Auth changes
//! made from the shell flow back through the session manager's
//! notifications, so signing out anywhere drops the user to the welcome
//! screens and clears the capture pipeline.

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::auth::{validate_sign_up, SignUpOutcome};
use crate::commands::render::{print_capture, print_gate, print_profile};
use crate::commands::shell_commands::{parse_shell_command, print_help, ShellCommand};
use crate::commands::{categories, require_screen, Services};
use crate::error::{FoodVisionError, Result};
use crate::gate::{Gate, GateState, Screen};
use crate::media::{LocalMediaSource, SourceKind};
use crate::pipeline::Pipeline;

struct Shell<'a> {
    services: &'a Services,
    gate: Gate,
    pipeline: Pipeline,
    media: LocalMediaSource,
    editor: DefaultEditor,
}

/// Starts the interactive shell.
pub async fn run_app(services: &Services) -> Result<()> {
    tracing::info!("Starting app shell");
    let mut shell = Shell {
        services,
        gate: services.gate(),
        pipeline: services.pipeline(),
        media: services.media(),
        editor: DefaultEditor::new()?,
    };

    println!("{}", "Food Vision".green().bold());
    println!("Type 'help' for commands, 'exit' to quit.\n");
    shell.gate.start().await;
    print_gate(shell.gate.state());

    loop {
        let prompt = prompt_for(shell.gate.state());
        match shell.editor.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                shell.editor.add_history_entry(trimmed)?;

                let command = match parse_shell_command(trimmed) {
                    Ok(command) => command,
                    Err(e) => {
                        eprintln!("{}", e.to_string().red());
                        continue;
                    }
                };
                if command == ShellCommand::Exit {
                    break;
                }
                if let Err(e) = shell.execute(command).await {
                    eprintln!("{}", e.to_string().red());
                }
                shell.after_command().await;
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                tracing::error!("Readline error: {}", e);
                return Err(e.into());
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn prompt_for(state: &GateState) -> String {
    let place = match state {
        GateState::Loading { .. } => "loading".yellow(),
        GateState::Unauthenticated => "welcome".red(),
        GateState::AuthenticatedNoProfile { .. } => "setup".yellow(),
        GateState::AuthenticatedWithProfile { .. } => "home".green(),
    };
    format!("foodvision:{}> ", place)
}

/// Refuses commands whose screen the gate does not currently allow.
fn check_reachable(state: &GateState, command: &ShellCommand) -> Result<()> {
    match command {
        ShellCommand::SignOut if state.user().is_none() => {
            Err(FoodVisionError::Auth("You are not signed in".to_string()).into())
        }
        // The age can be edited later from the profile screen.
        ShellCommand::SaveAge(_) => require_screen(state, Screen::AgeSetup)
            .or_else(|_| require_screen(state, Screen::Profile)),
        other => match other.screen() {
            Some(screen) => require_screen(state, screen),
            None => Ok(()),
        },
    }
}

/// Drops capture results once the home screen is no longer reachable.
fn settle_pipeline(state: &GateState, pipeline: &mut Pipeline) {
    if !matches!(state, GateState::AuthenticatedWithProfile { .. }) {
        pipeline.reset();
    }
}

impl Shell<'_> {
    async fn execute(&mut self, command: ShellCommand) -> Result<()> {
        check_reachable(self.gate.state(), &command)?;
        let sessions = self.services.sessions.clone();

        match command {
            ShellCommand::Help => print_help(self.gate.screens()),
            ShellCommand::Status => print_gate(self.gate.state()),
            ShellCommand::Categories => categories::list(),
            ShellCommand::SignIn { email } => {
                let password = self.editor.readline("Password: ")?;
                sessions.sign_in(&email, &password).await?;
                println!("{}", "Signed in.".green());
            }
            ShellCommand::SignUp { email } => {
                let password = self.editor.readline("Password: ")?;
                let confirm = self.editor.readline("Confirm password: ")?;
                validate_sign_up(&email, &password, &confirm)?;
                match sessions.sign_up(&email, &password).await? {
                    SignUpOutcome::ConfirmationRequired => println!(
                        "A confirmation link has been sent to your email. Please verify your account before signing in."
                    ),
                    SignUpOutcome::SignedIn(_) => println!("{}", "Account created.".green()),
                }
            }
            ShellCommand::ResetPassword { email } => {
                sessions.reset_password(&email).await?;
                println!("Password reset instructions have been sent to your email.");
            }
            ShellCommand::SignOut => {
                sessions.sign_out().await?;
                println!("{}", "Signed out.".green());
            }
            ShellCommand::SaveAge(input) => {
                let age = self.gate.save_age(&input).await?;
                println!("{} (age {})", "Profile setup complete!".green(), age);
            }
            ShellCommand::Profile => {
                let profile = self.gate.profile().await?;
                print_profile(&profile);
            }
            ShellCommand::Camera => {
                if self.pipeline.pick_image(&self.media, SourceKind::Camera).await? {
                    print_capture(self.pipeline.state());
                }
            }
            ShellCommand::Library(path) => {
                let source = self.media.clone().with_library_file(path);
                if self.pipeline.pick_image(&source, SourceKind::Library).await? {
                    print_capture(self.pipeline.state());
                }
            }
            ShellCommand::Detect => {
                println!("{}", "Detecting...".yellow());
                self.pipeline
                    .submit_detection()
                    .await
                    .map_err(|r| FoodVisionError::Validation(r.to_string()))?;
                print_capture(self.pipeline.state());
            }
            ShellCommand::Info(category) => {
                self.pipeline
                    .request_follow_up(category)
                    .await
                    .map_err(|r| FoodVisionError::Validation(r.to_string()))?;
                print_capture(self.pipeline.state());
            }
            ShellCommand::Retry => {
                self.pipeline
                    .retry()
                    .await
                    .map_err(|r| FoodVisionError::Validation(r.to_string()))?;
                print_capture(self.pipeline.state());
            }
            ShellCommand::Clear => {
                self.pipeline.reset();
                print_capture(self.pipeline.state());
            }
            ShellCommand::Exit | ShellCommand::None => {}
        }
        Ok(())
    }

    /// Applies auth notifications and reports screen changes.
    async fn after_command(&mut self) {
        let before = self.gate.state().clone();
        let after = self.gate.sync().await.clone();
        settle_pipeline(&after, &mut self.pipeline);
        if before != after {
            print_gate(&after);
        }
    }
}
