//!
//! coursegate shell
//! ----------------
//! Line-oriented interpreter driving the gate: authenticate against the backend,
//! visit paths, walk history and inspect the session. Every command prints the
//! settled screen.

use std::sync::Arc;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::identity::{AuthBackend, AuthService, LoginRequest, NavigationState};
use crate::navigator::{Navigator, Screen};
use crate::router::Guard;

pub const HELP: &str = "Commands:
  login <email> <password>                 authenticate and go to the role's home
  logout                                   end the session
  expire                                   simulate credential expiry
  visit <path> [--allow-when-logged-in]    navigate to a path
  back                                     return to the previous history entry
  status                                   show the current session
  routes                                   list the route table
  history                                  show the history stack
  help                                     show this help
  quit | exit                              leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { email: String, password: String },
    Logout,
    Expire,
    Visit { path: String, state: NavigationState },
    Back,
    Status,
    Routes,
    History,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> AppResult<Command> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(head) = parts.first() else {
        return Err(AppError::user("empty_command", "empty command"));
    };
    let cmd = match head.to_ascii_lowercase().as_str() {
        "login" => {
            if parts.len() != 3 {
                return Err(AppError::user("usage", "usage: login <email> <password>"));
            }
            Command::Login { email: parts[1].to_string(), password: parts[2].to_string() }
        }
        "logout" => Command::Logout,
        "expire" => Command::Expire,
        "visit" | "go" => {
            let mut path = None;
            let mut state = NavigationState::default();
            for p in &parts[1..] {
                match *p {
                    "--allow-when-logged-in" => state.allow_when_logged_in = true,
                    other if path.is_none() => path = Some(other.to_string()),
                    other => return Err(AppError::user("usage".to_string(), format!("unexpected argument: {}", other))),
                }
            }
            let Some(path) = path else {
                return Err(AppError::user("usage", "usage: visit <path> [--allow-when-logged-in]"));
            };
            Command::Visit { path, state }
        }
        "back" => Command::Back,
        "status" => Command::Status,
        "routes" => Command::Routes,
        "history" => Command::History,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(AppError::user("unknown_command".to_string(), format!("unknown command: {} (try 'help')", other))),
    };
    Ok(cmd)
}

pub fn describe_screen(screen: &Screen) -> String {
    match screen {
        Screen::Blank { path } => format!("[{}] (waiting for session)", path),
        Screen::View { path, view, state } => format!("[{}] {:?} ({:?})", path, view, state),
        Screen::Stuck { path } => format!("[{}] redirect loop", path),
    }
}

pub struct Shell<B: AuthBackend> {
    auth: AuthService<B>,
    navigator: Arc<Navigator>,
}

impl<B: AuthBackend> Shell<B> {
    pub fn new(auth: AuthService<B>, navigator: Arc<Navigator>) -> Self { Self { auth, navigator } }

    pub fn navigator(&self) -> &Arc<Navigator> { &self.navigator }

    /// Run one command; `Ok(None)` means quit.
    pub async fn execute(&self, cmd: Command) -> AppResult<Option<String>> {
        let out = match cmd {
            Command::Login { email, password } => {
                let outcome = self.auth.login(&LoginRequest { email, password }).await?;
                let screen = self.navigator.replace(outcome.home, NavigationState::default());
                format!("logged in as {} ({})\n{}", outcome.principal.label(), outcome.role, describe_screen(&screen))
            }
            Command::Logout => {
                let was = self.auth.logout()?;
                let screen = self.navigator.screen();
                format!("{}\n{}", if was { "logged out" } else { "not logged in" }, describe_screen(&screen))
            }
            Command::Expire => {
                self.auth.expire()?;
                format!("credential expired\n{}", describe_screen(&self.navigator.screen()))
            }
            Command::Visit { path, state } => describe_screen(&self.navigator.visit(&path, state)),
            Command::Back => describe_screen(&self.navigator.back()),
            Command::Status => {
                let snap = self.auth.store().snapshot();
                serde_json::to_string_pretty(&snap)
                    .map_err(|e| AppError::internal("encode_status".to_string(), e.to_string()))?
            }
            Command::Routes => {
                let mut lines = Vec::new();
                for r in self.navigator.router().table().routes() {
                    let guard = match &r.guard {
                        Guard::Open => "open".to_string(),
                        Guard::Public => "public".to_string(),
                        Guard::Protected(roles) if roles.is_empty() => "protected (any)".to_string(),
                        Guard::Protected(roles) => {
                            format!("protected ({})", roles.iter().map(|x| x.as_str()).collect::<Vec<_>>().join(", "))
                        }
                    };
                    lines.push(format!("{:<26} {:<22} {}", r.pattern.as_str(), format!("{:?}", r.view), guard));
                }
                lines.join("\n")
            }
            Command::History => self.navigator.history().iter().enumerate()
                .map(|(i, e)| format!("{:>2} {}{}", i, e.path, if e.state.allow_when_logged_in { " (override)" } else { "" }))
                .collect::<Vec<_>>()
                .join("\n"),
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(None),
        };
        Ok(Some(out))
    }
}

/// Interactive loop. Command errors are printed and the loop continues.
pub fn run<B: AuthBackend>(rt: &tokio::runtime::Runtime, shell: &Shell<B>) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("coursegate shell. Type 'help' for commands.");
    println!("{}", describe_screen(&shell.navigator().screen()));
    loop {
        let line = match editor.readline("> ") {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim();
        if line.is_empty() { continue; }
        let _ = editor.add_history_entry(line);
        let cmd = match parse_command(line) {
            Ok(c) => c,
            Err(e) => { eprintln!("{}", e.message()); continue; }
        };
        match rt.block_on(shell.execute(cmd)) {
            Ok(Some(out)) => println!("{}", out),
            Ok(None) => break,
            Err(e) => eprintln!("error: {}", e),
        }
    }
    info!(target: "coursegate::shell", "shell exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(
            parse_command("login a@b.c secret").unwrap(),
            Command::Login { email: "a@b.c".into(), password: "secret".into() }
        );
        assert_eq!(
            parse_command("VISIT /login --allow-when-logged-in").unwrap(),
            Command::Visit { path: "/login".into(), state: NavigationState::allow_when_logged_in() }
        );
        assert_eq!(
            parse_command("go /courses/7").unwrap(),
            Command::Visit { path: "/courses/7".into(), state: NavigationState::default() }
        );
        assert_eq!(parse_command("exit").unwrap(), Command::Quit);
        assert_eq!(parse_command(" back ").unwrap(), Command::Back);
    }

    #[tokio::test]
    async fn login_visit_logout_session() {
        use crate::identity::{MemorySessionStorage, SessionStore, StaticAuthBackend};
        use crate::router::{Router, View};
        use serde_json::json;

        let store = SessionStore::new();
        store.hydrate(None);
        let backend = StaticAuthBackend::new().with_account("sam@uni.edu", "pw", json!({"name": "Sam", "role": "student"}));
        let auth = AuthService::new(backend, store.clone(), Arc::new(MemorySessionStorage::default()));
        let nav = Navigator::new(Router::default(), store.clone(), "/login", 8);
        let shell = Shell::new(auth, nav);

        let out = shell.execute(parse_command("login sam@uni.edu pw").unwrap()).await.unwrap().unwrap();
        assert!(out.starts_with("logged in as Sam (STUDENT)"), "{}", out);
        assert_eq!(shell.navigator().screen().view(), Some(View::StudentDashboard));

        let out = shell.execute(parse_command("visit /admin").unwrap()).await.unwrap().unwrap();
        assert!(out.contains("StudentDashboard"), "{}", out);

        let err = shell.execute(parse_command("login sam@uni.edu nope").unwrap()).await.unwrap_err();
        assert!(err.is_auth());

        let out = shell.execute(Command::Logout).await.unwrap().unwrap();
        assert!(out.starts_with("logged out"));
        assert_eq!(shell.navigator().screen().view(), Some(View::Login));

        assert!(shell.execute(Command::Routes).await.unwrap().unwrap().contains("/courses/:courseId/edit"));
        assert_eq!(shell.execute(Command::Quit).await.unwrap(), None);
    }

    #[test]
    fn rejects_bad_usage() {
        assert_eq!(parse_command("login onlyemail").unwrap_err().code_str(), "usage");
        assert_eq!(parse_command("visit").unwrap_err().code_str(), "usage");
        assert_eq!(parse_command("visit /a /b").unwrap_err().code_str(), "usage");
        assert_eq!(parse_command("dance").unwrap_err().code_str(), "unknown_command");
        assert_eq!(parse_command("   ").unwrap_err().code_str(), "empty_command");
    }
}
