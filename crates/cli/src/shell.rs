//! Line-oriented chat shell: `/command` parsing and execution.

use std::sync::Arc;

use chat::DispatchOutcome;
use navigation::{NavigationOptions, NavigationState};
use proto::{LoginCredentials, Session, SessionId};
use tracing::debug;

use crate::app::App;

pub const HELP: &str = "\
Commands:
  /login EMAIL PASSWORD   sign in
  /logout                 sign out
  /whoami                 show the signed-in user
  /new                    start a new chat
  /list                   list chats (* marks the active one)
  /select ID              switch to a chat (unique id prefix is enough)
  /delete ID              delete a chat
  /go PATH                navigate to a page, e.g. /go /chat
  /help                   show this help
  /quit                   exit
Anything else is sent to the assistant.";

/// One parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Login { email: String, password: String },
    Logout,
    WhoAmI,
    New,
    List,
    Select(String),
    Delete(String),
    Go(String),
    Help,
    Quit,
    Send(String),
    Empty,
    /// Malformed command with a usage hint.
    Invalid(String),
}

impl ShellCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Send(line.to_string());
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default().to_ascii_lowercase();
        let args: Vec<&str> = parts.collect();
        match (name.as_str(), args.as_slice()) {
            ("login", [email, password]) => Self::Login {
                email: email.to_string(),
                password: password.to_string(),
            },
            ("login", _) => Self::Invalid("usage: /login EMAIL PASSWORD".to_string()),
            ("logout", []) => Self::Logout,
            ("whoami", []) => Self::WhoAmI,
            ("new", []) => Self::New,
            ("list", []) => Self::List,
            ("select", [id]) => Self::Select(id.to_string()),
            ("select", _) => Self::Invalid("usage: /select ID".to_string()),
            ("delete", [id]) => Self::Delete(id.to_string()),
            ("delete", _) => Self::Invalid("usage: /delete ID".to_string()),
            ("go", [path]) => Self::Go(path.to_string()),
            ("go", _) => Self::Invalid("usage: /go PATH".to_string()),
            ("help", _) => Self::Help,
            ("quit" | "exit", _) => Self::Quit,
            (other, _) => Self::Invalid(format!("unknown command '/{other}', try /help")),
        }
    }

    /// Commands that only make sense for a signed-in user.
    fn needs_auth(&self) -> bool {
        matches!(
            self,
            Self::New | Self::List | Self::Select(_) | Self::Delete(_) | Self::Send(_)
        )
    }
}

/// What the loop should do after a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellReply {
    Print(Vec<String>),
    Quit,
}

impl ShellReply {
    fn line(text: impl Into<String>) -> Self {
        Self::Print(vec![text.into()])
    }
}

/// Executes shell commands against the app stores.
pub struct Shell {
    app: Arc<App>,
}

impl Shell {
    pub fn new(app: Arc<App>) -> Self {
        Self { app }
    }

    pub async fn handle(&self, line: &str) -> ShellReply {
        let command = ShellCommand::parse(line);
        debug!(command = command_label(&command), "Shell command");

        if command.needs_auth() && !self.app.auth.is_authenticated() {
            return ShellReply::line("Not signed in. Use /login EMAIL PASSWORD first.");
        }

        match command {
            ShellCommand::Empty => ShellReply::Print(Vec::new()),
            ShellCommand::Invalid(hint) => ShellReply::line(hint),
            ShellCommand::Help => ShellReply::line(HELP),
            ShellCommand::Quit => ShellReply::Quit,
            ShellCommand::Login { email, password } => {
                match self
                    .app
                    .auth
                    .login(&LoginCredentials::new(email, password))
                    .await
                {
                    Ok(()) => ShellReply::line(self.whoami()),
                    Err(e) => ShellReply::line(format!("Login failed: {e}")),
                }
            }
            ShellCommand::Logout => {
                self.app.auth.logout().await;
                ShellReply::line("Signed out.")
            }
            ShellCommand::WhoAmI => ShellReply::line(self.whoami()),
            ShellCommand::New => {
                let session = self.app.sessions.create_session();
                ShellReply::line(format!("Started new chat {}", session.id()))
            }
            ShellCommand::List => ShellReply::Print(self.list()),
            ShellCommand::Select(prefix) => match self.resolve(&prefix) {
                Ok(id) => match self.app.sessions.select_session(&id) {
                    Ok(()) => ShellReply::Print(self.transcript(&id)),
                    Err(e) => ShellReply::line(e.to_string()),
                },
                Err(msg) => ShellReply::line(msg),
            },
            ShellCommand::Delete(prefix) => match self.resolve(&prefix) {
                Ok(id) => match self.app.sessions.delete_session(&id) {
                    Ok(()) => ShellReply::line(format!("Deleted {id}")),
                    Err(e) => ShellReply::line(e.to_string()),
                },
                Err(msg) => ShellReply::line(msg),
            },
            ShellCommand::Go(path) => {
                let state = self
                    .app
                    .navigator
                    .navigate(&path, NavigationOptions::default());
                ShellReply::Print(describe_location(
                    &state,
                    &self.app.navigator.loading().loading_text(),
                ))
            }
            ShellCommand::Send(content) => {
                let outcome = self.app.dispatcher.send_message(&content, Vec::new()).await;
                ShellReply::Print(format_outcome(&outcome))
            }
        }
    }

    fn whoami(&self) -> String {
        match self.app.auth.user() {
            Some(user) => format!("Signed in as {} <{}> ({:?})", user.name, user.email, user.role),
            None => "Not signed in.".to_string(),
        }
    }

    fn list(&self) -> Vec<String> {
        let sessions = self.app.sessions.sessions();
        if sessions.is_empty() {
            return vec!["No chats yet. Use /new or just start typing.".to_string()];
        }
        let active = self.app.sessions.active_session_id();
        sessions
            .iter()
            .map(|s| session_line(s, active.as_ref() == Some(s.id())))
            .collect()
    }

    fn transcript(&self, id: &SessionId) -> Vec<String> {
        let Some(session) = self.app.sessions.session(id) else {
            return vec![format!("Session not found: {id}")];
        };
        let mut lines = vec![format!("Switched to {}", session_line(&session, true))];
        lines.extend(
            session
                .messages()
                .iter()
                .map(|m| format!("[{}] {}", m.role(), m.content())),
        );
        lines
    }

    /// Full id or a prefix matching exactly one session.
    fn resolve(&self, prefix: &str) -> Result<SessionId, String> {
        let matches: Vec<SessionId> = self
            .app
            .sessions
            .sessions()
            .into_iter()
            .filter(|s| s.id().as_str().starts_with(prefix))
            .map(|s| s.id().clone())
            .collect();
        match matches.as_slice() {
            [id] => Ok(id.clone()),
            [] => Err(format!("No chat matches '{prefix}'")),
            _ => Err(format!("'{prefix}' matches {} chats, be more specific", matches.len())),
        }
    }
}

fn command_label(command: &ShellCommand) -> &'static str {
    match command {
        ShellCommand::Login { .. } => "login",
        ShellCommand::Logout => "logout",
        ShellCommand::WhoAmI => "whoami",
        ShellCommand::New => "new",
        ShellCommand::List => "list",
        ShellCommand::Select(_) => "select",
        ShellCommand::Delete(_) => "delete",
        ShellCommand::Go(_) => "go",
        ShellCommand::Help => "help",
        ShellCommand::Quit => "quit",
        ShellCommand::Send(_) => "send",
        ShellCommand::Empty => "empty",
        ShellCommand::Invalid(_) => "invalid",
    }
}

fn session_line(session: &Session, active: bool) -> String {
    format!(
        "{} {}  {}  ({} messages)",
        if active { "*" } else { " " },
        session.id(),
        session.title(),
        session.messages().len()
    )
}

/// Human-readable result of one dispatch.
pub fn format_outcome(outcome: &DispatchOutcome) -> Vec<String> {
    match outcome {
        DispatchOutcome::SessionCreated(id) => vec![format!(
            "Started new chat {id}. Send your message again to deliver it."
        )],
        DispatchOutcome::Replied { reply, .. } => vec![format!("vikki> {}", reply.content())],
        DispatchOutcome::Dropped { session_id, .. } => {
            vec![format!("Reply discarded: chat {session_id} was deleted.")]
        }
        DispatchOutcome::Failed { error } => vec![format!("Error: {error}")],
    }
}

/// Title, subtitle and breadcrumbs of the current location.
pub fn describe_location(state: &NavigationState, loading_text: &str) -> Vec<String> {
    vec![
        format!("{} ({})", loading_text, state.current_path),
        format!("{} - {}", state.current_page.title(), state.current_page.subtitle()),
        state.breadcrumbs.join(" > "),
    ]
}
