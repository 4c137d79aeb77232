//! Command parser for the interactive app shell
//!
//! Each line typed into the shell maps to one [`ShellCommand`]. Commands are
//! case-insensitive and some have short aliases. Every command names the
//! screen it belongs to, so the shell can refuse commands the gate does not
//! currently allow.

use std::path::PathBuf;

use thiserror::Error;

use crate::gate::Screen;
use crate::vision::FollowUpCategory;

/// Errors that can occur when parsing shell commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType 'help' to see available commands")]
    UnknownCommand(String),

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },

    /// Command was given an argument it cannot use
    #[error("Invalid argument for {command}: {reason}")]
    InvalidArgument { command: String, reason: String },
}

/// A line of shell input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Help,
    Status,
    Categories,
    SignIn { email: String },
    SignUp { email: String },
    ResetPassword { email: String },
    SignOut,
    /// Age typed on the setup screen; validated when saved.
    SaveAge(String),
    Profile,
    Camera,
    Library(PathBuf),
    Detect,
    Info(FollowUpCategory),
    Retry,
    Clear,
    Exit,
    /// Empty input.
    None,
}

impl ShellCommand {
    /// Screen the command is issued from; `None` for commands available
    /// everywhere.
    pub fn screen(&self) -> Option<Screen> {
        match self {
            Self::SignIn { .. } | Self::ResetPassword { .. } => Some(Screen::SignIn),
            Self::SignUp { .. } => Some(Screen::SignUp),
            Self::SaveAge(_) => Some(Screen::AgeSetup),
            Self::Profile => Some(Screen::Profile),
            Self::Camera
            | Self::Library(_)
            | Self::Detect
            | Self::Info(_)
            | Self::Retry
            | Self::Clear => Some(Screen::Home),
            Self::Help
            | Self::Status
            | Self::Categories
            | Self::SignOut
            | Self::Exit
            | Self::None => None,
        }
    }
}

fn required(command: &str, arg: Option<&str>, usage: &str) -> Result<String, CommandError> {
    arg.map(str::to_string)
        .ok_or_else(|| CommandError::MissingArgument {
            command: command.to_string(),
            usage: usage.to_string(),
        })
}

/// Parses one line of shell input.
///
/// # Errors
///
/// Returns [`CommandError`] for unknown commands, missing arguments and
/// unknown category names.
pub fn parse_shell_command(input: &str) -> Result<ShellCommand, CommandError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(ShellCommand::None);
    }

    let (head, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, Some(rest.trim()).filter(|r| !r.is_empty())),
        None => (trimmed, None),
    };
    let head = head.to_lowercase();

    let command = match head.as_str() {
        "help" | "?" => ShellCommand::Help,
        "status" => ShellCommand::Status,
        "categories" => ShellCommand::Categories,
        "exit" | "quit" | "q" => ShellCommand::Exit,
        "sign-in" | "signin" | "login" => ShellCommand::SignIn {
            email: required(&head, rest, "sign-in <email>")?,
        },
        "sign-up" | "signup" => ShellCommand::SignUp {
            email: required(&head, rest, "sign-up <email>")?,
        },
        "reset-password" | "forgot" => ShellCommand::ResetPassword {
            email: required(&head, rest, "reset-password <email>")?,
        },
        "sign-out" | "signout" | "logout" => ShellCommand::SignOut,
        "age" => ShellCommand::SaveAge(required(&head, rest, "age <13-120>")?),
        "profile" => ShellCommand::Profile,
        "camera" | "photo" => ShellCommand::Camera,
        "library" | "gallery" | "pick" => {
            ShellCommand::Library(PathBuf::from(required(&head, rest, "library <path>")?))
        }
        "detect" => ShellCommand::Detect,
        "info" => {
            let name = required(&head, rest, "info <category>")?;
            let category =
                name.parse::<FollowUpCategory>()
                    .map_err(|e| CommandError::InvalidArgument {
                        command: head.clone(),
                        reason: e.to_string(),
                    })?;
            ShellCommand::Info(category)
        }
        "retry" => ShellCommand::Retry,
        "clear" | "reset" => ShellCommand::Clear,
        _ => return Err(CommandError::UnknownCommand(head)),
    };
    Ok(command)
}

/// Prints the commands reachable from `screens`.
pub fn print_help(screens: &[Screen]) {
    println!();
    println!("Food Vision shell");
    println!("=================");
    if screens.contains(&Screen::SignIn) {
        println!("  sign-in <email>         - Sign in (password is prompted)");
        println!("  sign-up <email>         - Create an account");
        println!("  reset-password <email>  - Send a password-reset e-mail");
    }
    if screens.contains(&Screen::AgeSetup) {
        println!("  age <13-120>            - Complete your profile");
    }
    if screens.contains(&Screen::Home) {
        println!("  camera                  - Take a photo with the capture command");
        println!("  library <path>          - Choose an image file");
        println!("  detect                  - Detect the food in the selected image");
        println!("  info <category>         - Ask about the detected food");
        println!("  retry                   - Repeat the last failed request");
        println!("  clear                   - Drop the image and results");
    }
    if screens.contains(&Screen::Profile) {
        println!("  profile                 - Show your profile");
        println!("  age <13-120>            - Update your age");
    }
    if screens.contains(&Screen::Home) || screens.contains(&Screen::AgeSetup) {
        println!("  sign-out                - Sign out");
    }
    println!("  categories              - List information categories");
    println!("  status                  - Show the current screen set");
    println!("  help                    - Show this help");
    println!("  exit                    - Leave the shell");
    println!();
}
