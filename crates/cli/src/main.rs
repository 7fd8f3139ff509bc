//! CLI entrypoint and subcommand orchestration.

mod app;
mod config;
mod shell;
#[cfg(test)]
mod test_support;

use clap::{Parser, Subcommand};
use proto::{AuthState, UserProfile};

#[cfg(not(test))]
use std::sync::Arc;

#[cfg(not(test))]
use crate::app::App;
#[cfg(not(test))]
use crate::shell::{Shell, ShellReply, format_outcome};
#[cfg(not(test))]
use api::ChatQuery;
#[cfg(not(test))]
use config::Config;
#[cfg(not(test))]
use proto::{LoginCredentials, RegisterData};
#[cfg(not(test))]
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
#[cfg(not(test))]
use tracing::{info, warn};
#[cfg(not(test))]
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Top-level command-line arguments for the vikki client.
#[derive(Parser)]
#[command(name = "vikki")]
#[command(about = "Vikki chat client", version = "0.1.0")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable debug logging to ~/.vikki/logs/debug.log
    #[arg(long, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// CLI subcommands available in the application.
#[derive(Subcommand)]
enum Commands {
    /// Start the interactive chat shell (default when no subcommand is given)
    Chat,

    /// Send one message in a fresh chat and print the reply
    Run {
        /// Message to send
        #[arg(short = 'e', long)]
        exec: String,
    },

    /// Sign in, sign out, or inspect the stored session
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// List chats stored on the server
    Chats {
        /// Maximum number of chats to show
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

/// `auth` sub-subcommands.
#[derive(Subcommand)]
enum AuthCommands {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show who is signed in
    Status,
}

#[cfg(not(test))]
#[tokio::main]
/// Program entrypoint.
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Commands::Chat);
    let is_shell = matches!(command, Commands::Chat);

    // Console output goes to a sink in the shell so log lines do not break the prompt.
    // --debug adds a daily-rotated file under ~/.vikki/logs.
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    // WorkerGuard must outlive main() so buffered file writes are flushed on exit.
    let _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>;

    let debug_writer = if cli.debug {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let log_dir = std::path::PathBuf::from(home).join(".vikki").join("logs");
        std::fs::create_dir_all(&log_dir).ok();
        let appender = tracing_appender::rolling::daily(&log_dir, "debug.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        _file_guard = Some(guard);
        Some(writer)
    } else {
        _file_guard = None;
        None
    };

    match (is_shell, debug_writer) {
        (true, Some(writer)) => {
            let console = fmt::layer()
                .with_writer(std::io::sink)
                .with_target(false)
                .with_filter(console_filter);
            let file = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .with_filter(EnvFilter::new(DEBUG_FILE_FILTER));
            tracing_subscriber::registry()
                .with(console)
                .with(file)
                .init();
        }
        (true, None) => {
            fmt()
                .with_env_filter(console_filter)
                .with_writer(std::io::sink)
                .with_target(false)
                .init();
        }
        (false, Some(writer)) => {
            let console = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter);
            let file = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .with_filter(EnvFilter::new(DEBUG_FILE_FILTER));
            tracing_subscriber::registry()
                .with(console)
                .with(file)
                .init();
        }
        (false, None) => {
            fmt()
                .with_env_filter(console_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
    }

    if cli.debug {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            command = command_label(&command),
            log_level = %cli.log_level,
            "========== vikki session start =========="
        );
    }

    let config = Config::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!("Failed to load config ({e}), using defaults");
        Config::default()
    });

    match command {
        Commands::Chat => cmd_chat(config).await,
        Commands::Run { exec } => cmd_run(config, exec).await,
        Commands::Auth { command } => match command {
            AuthCommands::Login { email, password } => {
                cmd_auth_login(config, email, password).await
            }
            AuthCommands::Register {
                name,
                email,
                password,
                confirm_password,
            } => {
                let data = RegisterData {
                    name,
                    email,
                    password,
                    confirm_password,
                    profile_image_url: None,
                };
                cmd_auth_register(config, data).await
            }
            AuthCommands::Logout => cmd_auth_logout(config).await,
            AuthCommands::Status => cmd_auth_status(config).await,
        },
        Commands::Chats { limit } => cmd_chats(config, limit).await,
    }
}

#[cfg(not(test))]
const DEBUG_FILE_FILTER: &str = "debug,hyper_util=info,reqwest=info,h2=info";

#[cfg(not(test))]
/// Runs the interactive chat shell until `/quit` or end of input.
async fn cmd_chat(config: Config) -> anyhow::Result<()> {
    let app = Arc::new(App::build(&config)?);
    let auth = app.auth.initialize().await;
    let shell = Shell::new(Arc::clone(&app));

    print_welcome_banner(&auth);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(PROMPT.as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match shell.handle(&line).await {
            ShellReply::Print(output) => {
                for text in output {
                    println!("{text}");
                }
            }
            ShellReply::Quit => break,
        }
    }

    println!("Bye.");
    Ok(())
}

#[cfg(not(test))]
/// Sends one message in a fresh chat and prints the reply.
async fn cmd_run(config: Config, exec: String) -> anyhow::Result<()> {
    let app = App::build(&config)?;
    let auth = app.auth.initialize().await;
    if !auth.is_authenticated {
        anyhow::bail!("Not signed in. Run `vikki auth login` first.");
    }

    println!("{}", format_run_header(&exec));
    app.sessions.create_session();
    let outcome = app.dispatcher.send_message(&exec, Vec::new()).await;
    if let chat::DispatchOutcome::Failed { error } = &outcome {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
    for text in format_outcome(&outcome) {
        println!("{text}");
    }
    Ok(())
}

#[cfg(not(test))]
async fn cmd_auth_login(config: Config, email: String, password: String) -> anyhow::Result<()> {
    let app = App::build(&config)?;
    app.auth
        .login(&LoginCredentials::new(email, password))
        .await?;
    println!("{}", format_auth_status(&app.auth.state()));
    Ok(())
}

#[cfg(not(test))]
async fn cmd_auth_register(config: Config, data: RegisterData) -> anyhow::Result<()> {
    let app = App::build(&config)?;
    app.auth.register(&data).await?;
    println!("{}", format_auth_status(&app.auth.state()));
    Ok(())
}

#[cfg(not(test))]
/// Restores the stored session so the server-side logout carries its token.
async fn cmd_auth_logout(config: Config) -> anyhow::Result<()> {
    let app = App::build(&config)?;
    app.auth.initialize().await;
    app.auth.logout().await;
    println!("Signed out. Stored session removed.");
    Ok(())
}

#[cfg(not(test))]
async fn cmd_auth_status(config: Config) -> anyhow::Result<()> {
    let app = App::build(&config)?;
    let state = app.auth.initialize().await;
    println!("{}", format_auth_status(&state));
    Ok(())
}

#[cfg(not(test))]
/// Lists chats stored on the server for the signed-in user.
async fn cmd_chats(config: Config, limit: u32) -> anyhow::Result<()> {
    let app = App::build(&config)?;
    let auth = app.auth.initialize().await;
    if !auth.is_authenticated {
        anyhow::bail!("Not signed in. Run `vikki auth login` first.");
    }

    let query = ChatQuery {
        limit: Some(limit),
        ..Default::default()
    };
    let chats = app.chat_api().list_chats(&query).await?;
    if chats.is_empty() {
        println!("No chats on the server.");
        return Ok(());
    }
    for chat in chats {
        let marker = if chat.pinned { "*" } else { " " };
        println!("{marker} {}  {}  (updated {})", chat.id, chat.title, chat.updated_at);
    }
    Ok(())
}

#[cfg(not(test))]
const PROMPT: &str = "you> ";

#[cfg(not(test))]
fn print_welcome_banner(auth: &AuthState) {
    println!();
    println!("  \x1b[1;36mVikki\x1b[0m  chat client v{}", env!("CARGO_PKG_VERSION"));
    println!("  {}", format_auth_status(auth));
    println!("  Type /help for commands.");
    println!();
}

#[cfg(not(test))]
fn command_label(command: &Commands) -> &'static str {
    match command {
        Commands::Chat => "chat",
        Commands::Run { .. } => "run",
        Commands::Auth { .. } => "auth",
        Commands::Chats { .. } => "chats",
    }
}

/// One-line summary of the auth state.
fn format_auth_status(state: &AuthState) -> String {
    match (&state.user, state.is_authenticated) {
        (Some(user), true) => format!("Signed in as {}", describe_user(user)),
        _ => match &state.error {
            Some(error) => format!("Not signed in ({error})"),
            None => "Not signed in.".to_string(),
        },
    }
}

fn describe_user(user: &UserProfile) -> String {
    let role = if user.is_admin() { " [admin]" } else { "" };
    format!("{} <{}>{role}", user.name, user.email)
}

/// Formats run mode header text.
fn format_run_header(exec: &str) -> String {
    format!("Sending: {exec}")
}
