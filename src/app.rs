use crate::client::ApiClient;
use crate::config::ApiConfig;
use crate::logging;
use crate::session::SessionManager;
use crate::storage::{Credentials, KeyringStore};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::BufRead;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Parser)]
#[command(name = "devotional", version, about = "Devotional account session tool")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
  /// Resolve the stored session and print it.
  Status,
  /// Sign in and store the access token.
  Login {
    email: String,
    /// Read from stdin when omitted.
    #[arg(long)]
    password: Option<String>,
  },
  /// Forget the stored access token.
  Logout,
  /// Check premium access against the server.
  Premium,
  /// Show or set the onboarding flag.
  Onboarding {
    #[arg(long)]
    complete: bool,
  },
  /// Print today's devotional, if any.
  Today,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
  let out = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
  println!("{out}");
  Ok(())
}

fn read_password() -> Result<String, String> {
  let mut line = String::new();
  std::io::stdin()
    .lock()
    .read_line(&mut line)
    .map_err(|e| format!("failed to read password: {e}"))?;
  let password = line.trim_end_matches(['\r', '\n']).to_string();
  if password.is_empty() {
    return Err("password is required".to_string());
  }
  Ok(password)
}

async fn execute(command: Command, session: SessionManager) -> Result<(), String> {
  match command {
    Command::Status => {
      session.refetch_user().await;
      print_json(&session.snapshot().await)
    }
    Command::Login { email, password } => {
      let password = match password {
        Some(p) => p,
        None => read_password()?,
      };
      let state = session
        .login(&email, &password)
        .await
        .map_err(|e| e.to_string())?;
      print_json(&state)
    }
    Command::Logout => {
      session.logout().await;
      print_json(&session.snapshot().await)
    }
    Command::Premium => print_json(&session.can_access_premium_content().await),
    Command::Onboarding { complete } => {
      if complete {
        session.complete_onboarding().map_err(|e| e.to_string())?;
      }
      print_json(&serde_json::json!({
        "onboardingCompleted": session.has_completed_onboarding(),
      }))
    }
    Command::Today => {
      let today = crate::api::devotionals::fetch_todays_devotional(session.client()).await;
      print_json(&today)
    }
  }
}

pub fn run() -> ExitCode {
  let cli = Cli::parse();
  logging::init_logging();

  let config = match ApiConfig::from_env() {
    Ok(config) => config,
    Err(err) => {
      error!(error = %err, "invalid configuration");
      eprintln!("{err}");
      return ExitCode::FAILURE;
    }
  };

  let credentials = Credentials::new(Arc::new(KeyringStore::default()));
  let client = match ApiClient::new(&config, credentials) {
    Ok(client) => client,
    Err(err) => {
      eprintln!("failed to build HTTP client: {err}");
      return ExitCode::FAILURE;
    }
  };

  let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
    Ok(runtime) => runtime,
    Err(err) => {
      eprintln!("failed to start runtime: {err}");
      return ExitCode::FAILURE;
    }
  };

  let session = SessionManager::new(client);
  match runtime.block_on(execute(cli.command, session)) {
    Ok(()) => ExitCode::SUCCESS,
    Err(message) => {
      eprintln!("{message}");
      ExitCode::FAILURE
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::CommandFactory;

  #[test]
  fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
  }

  #[test]
  fn parses_login_with_password_flag() {
    let cli = Cli::try_parse_from(["devotional", "login", "ada@example.com", "--password", "secret"]).unwrap();
    match cli.command {
      Command::Login { email, password } => {
        assert_eq!(email, "ada@example.com");
        assert_eq!(password.as_deref(), Some("secret"));
      }
      other => panic!("unexpected command {other:?}"),
    }
  }

  #[test]
  fn onboarding_complete_flag_defaults_off() {
    let cli = Cli::try_parse_from(["devotional", "onboarding"]).unwrap();
    assert!(matches!(cli.command, Command::Onboarding { complete: false }));
  }
}
