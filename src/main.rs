//! Food Vision - command-line client
//!
#![doc = "Food Vision - command-line client"]
#![doc = "Main entry point for the foodvision binary."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use foodvision::cli::{Cli, Commands, ProfileCommand};
use foodvision::commands::{self, Services};
use foodvision::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Categories need neither configuration nor network
    if let Commands::Categories = cli.command {
        commands::categories::list();
        return Ok(());
    }

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    let services = Services::from_config(config)?;

    // Execute command
    match cli.command {
        Commands::Status => {
            commands::auth::status(&services).await?;
            Ok(())
        }
        Commands::SignIn { email, password } => {
            tracing::info!("Starting sign in");
            commands::auth::sign_in(&services, &email, &password).await?;
            Ok(())
        }
        Commands::SignUp {
            email,
            password,
            confirm_password,
        } => {
            tracing::info!("Starting sign up");
            commands::auth::sign_up(&services, &email, &password, confirm_password.as_deref())
                .await?;
            Ok(())
        }
        Commands::SignOut => {
            commands::auth::sign_out(&services).await?;
            Ok(())
        }
        Commands::ResetPassword { email } => {
            commands::auth::reset_password(&services, &email).await?;
            Ok(())
        }
        Commands::Profile { command } => match command {
            ProfileCommand::Show => {
                commands::profile::show(&services).await?;
                Ok(())
            }
            ProfileCommand::SetAge { age } => {
                commands::profile::set_age(&services, &age).await?;
                Ok(())
            }
        },
        Commands::Detect { image, info } => {
            tracing::info!("Starting detection for {}", image.display());
            commands::detect::run_detect(&services, &image, &info).await?;
            Ok(())
        }
        Commands::Categories => {
            commands::categories::list();
            Ok(())
        }
        Commands::App => {
            commands::app::run_app(&services).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so command output stays pipeable.
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose {
        "foodvision=debug"
    } else {
        "foodvision=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
