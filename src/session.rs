use std::collections::BTreeMap;
use std::path::PathBuf;

use log::{debug, warn};

use crate::error::Result;
use crate::models::User;

pub const TOKEN_KEY: &str = "portfolio_token";
pub const USER_KEY: &str = "portfolio_user";

/// Where the portfolio bearer token (and the cached signed-in user) live.
pub trait SessionContext {
    fn token(&self) -> Option<String>;
    fn set_token(&mut self, token: &str) -> Result<()>;
    fn user(&self) -> Option<User>;
    fn set_user(&mut self, user: &User) -> Result<()>;
    /// Forget both the token and the cached user.
    fn clear(&mut self) -> Result<()>;
}

/// Something that can move the user to another route. In the terminal client
/// the "route" is the command currently running.
pub trait Navigator {
    fn current_path(&self) -> String;
    fn navigate(&mut self, path: &str);
}

// ---------------------------------------------------------------------------
// Key-value stores
// ---------------------------------------------------------------------------

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySession {
    values: BTreeMap<String, String>,
}

#[cfg(test)]
impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        let mut s = Self::new();
        s.values.insert(TOKEN_KEY.to_string(), token.to_string());
        s
    }
}

#[cfg(test)]
impl SessionContext for MemorySession {
    fn token(&self) -> Option<String> {
        self.values.get(TOKEN_KEY).cloned()
    }

    fn set_token(&mut self, token: &str) -> Result<()> {
        self.values.insert(TOKEN_KEY.to_string(), token.to_string());
        Ok(())
    }

    fn user(&self) -> Option<User> {
        self.values
            .get(USER_KEY)
            .and_then(|s| serde_json::from_str(s).ok())
    }

    fn set_user(&mut self, user: &User) -> Result<()> {
        self.values
            .insert(USER_KEY.to_string(), serde_json::to_string(user)?);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.values.remove(TOKEN_KEY);
        self.values.remove(USER_KEY);
        Ok(())
    }
}

/// JSON object on disk, one string value per key.
pub struct FileSession {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileSession {
    pub fn open(path: PathBuf) -> Self {
        let values = std::fs::read_to_string(&path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        Self { path, values }
    }

    fn persist(&self) -> Result<()> {
        if self.values.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path)?;
            }
            return Ok(());
        }
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, format!("{json}\n"))?;
        Ok(())
    }
}

impl SessionContext for FileSession {
    fn token(&self) -> Option<String> {
        self.values.get(TOKEN_KEY).cloned()
    }

    fn set_token(&mut self, token: &str) -> Result<()> {
        self.values.insert(TOKEN_KEY.to_string(), token.to_string());
        self.persist()
    }

    fn user(&self) -> Option<User> {
        self.values
            .get(USER_KEY)
            .and_then(|s| serde_json::from_str(s).ok())
    }

    fn set_user(&mut self, user: &User) -> Result<()> {
        self.values
            .insert(USER_KEY.to_string(), serde_json::to_string(user)?);
        self.persist()
    }

    fn clear(&mut self) -> Result<()> {
        self.values.remove(TOKEN_KEY);
        self.values.remove(USER_KEY);
        self.persist()
    }
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// Records the route of the running command; a redirect becomes a hint on
/// stderr telling the user which command to run next.
pub struct TerminalNavigator {
    current: String,
}

impl TerminalNavigator {
    pub fn new(current: &str) -> Self {
        Self {
            current: current.to_string(),
        }
    }
}

impl Navigator for TerminalNavigator {
    fn current_path(&self) -> String {
        self.current.clone()
    }

    fn navigate(&mut self, path: &str) {
        debug!("redirect {} -> {}", self.current, path);
        eprintln!("Session expired. Sign in again with `ssrf portfolio login <email>`.");
        self.current = path.to_string();
    }
}

/// Login route to send the user to after a 401, or `None` when they are
/// already on a login/register screen.
pub fn login_route_for(current_path: &str) -> Option<&'static str> {
    if current_path.contains("/login") || current_path.contains("/register") {
        None
    } else if current_path.starts_with("/portfolio") {
        Some("/portfolio/login")
    } else {
        Some("/login")
    }
}

/// Apply the unauthorized-response policy: drop credentials, then redirect.
pub fn handle_unauthorized(
    session: &mut dyn SessionContext,
    navigator: &mut dyn Navigator,
) -> Result<()> {
    warn!("server rejected the session token; clearing it");
    session.clear()?;
    if let Some(route) = login_route_for(&navigator.current_path()) {
        navigator.navigate(route);
    }
    Ok(())
}
