//! Load configuration from XDG `config.toml` and project `.env`, apply it to the process
//! environment with priority **existing env > .env > XDG**, then read the toolkit's
//! `STRIPE_*` settings.
//!
//! ```toml
//! # ~/.config/<app>/config.toml
//! [env]
//! STRIPE_SECRET_KEY = "rk_live_..."
//! STRIPE_MCP_TIMEOUT_MS = "30000"
//! ```

mod dotenv;
#[cfg(feature = "tracing-init")]
mod tracing_init;
mod xdg_toml;

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

#[cfg(feature = "tracing-init")]
pub use tracing_init::init_tracing;

pub const ENV_SECRET_KEY: &str = "STRIPE_SECRET_KEY";
pub const ENV_ACCOUNT: &str = "STRIPE_ACCOUNT";
pub const ENV_CUSTOMER: &str = "STRIPE_CUSTOMER";
pub const ENV_MCP_URL: &str = "STRIPE_MCP_URL";
pub const ENV_MCP_TIMEOUT_MS: &str = "STRIPE_MCP_TIMEOUT_MS";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("read xdg config: {0}")]
    XdgRead(std::io::Error),
    #[error("parse xdg toml: {0}")]
    XdgParse(#[from] toml::de::Error),
    #[error("read .env: {0}")]
    Dotenv(String),
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Sets environment variables from project `.env` and `$XDG_CONFIG_HOME/<app_name>/config.toml`
/// `[env]`, only for keys that are **not** already set.
///
/// For a key missing from the environment, `.env` wins over XDG.
///
/// * `app_name`: XDG directory name, e.g. `"stripe-agent-toolkit"`.
/// * `override_dir`: if `Some`, look for `.env` there instead of the current directory.
pub fn load_and_apply(app_name: &str, override_dir: Option<&Path>) -> Result<(), LoadError> {
    let xdg_map = xdg_toml::load_env_map(app_name)?;
    let dotenv_map = dotenv::load_env_map(override_dir)?;

    let keys: HashSet<&String> = xdg_map.keys().chain(dotenv_map.keys()).collect();
    for key in keys {
        if std::env::var_os(key).is_some() {
            continue;
        }
        if let Some(value) = dotenv_map.get(key).or_else(|| xdg_map.get(key)) {
            std::env::set_var(key, value);
        }
    }
    Ok(())
}

/// Toolkit settings read from `STRIPE_*` variables. Empty values count as unset.
#[derive(Clone, PartialEq, Eq)]
pub struct ToolkitEnv {
    pub secret_key: String,
    pub account: Option<String>,
    pub customer: Option<String>,
    pub server_url: Option<String>,
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for ToolkitEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolkitEnv")
            .field("secret_key", &"<redacted>")
            .field("account", &self.account)
            .field("customer", &self.customer)
            .field("server_url", &self.server_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ToolkitEnv {
    /// Reads the process environment. Call [`load_and_apply`] first to include files.
    pub fn from_env() -> Result<Self, LoadError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup` (variable name to value).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LoadError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let secret_key = get(ENV_SECRET_KEY).ok_or(LoadError::Missing(ENV_SECRET_KEY))?;
        let timeout = get(ENV_MCP_TIMEOUT_MS)
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|e| LoadError::Invalid {
                        name: ENV_MCP_TIMEOUT_MS,
                        reason: format!("{:?}: {}", raw, e),
                    })
            })
            .transpose()?;
        Ok(Self {
            secret_key,
            account: get(ENV_ACCOUNT),
            customer: get(ENV_CUSTOMER),
            server_url: get(ENV_MCP_URL),
            timeout,
        })
    }
}

/// Serializes tests that mutate process-wide variables.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
