//! `[env]` table of `$XDG_CONFIG_HOME/<app>/config.toml`.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::LoadError;

/// `$XDG_CONFIG_HOME` when set to an absolute path, else the platform config dir.
fn config_home() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .or_else(dirs::config_dir)
}

fn config_path(app_name: &str) -> Option<PathBuf> {
    let path = config_home()?.join(app_name).join("config.toml");
    path.exists().then_some(path)
}

#[derive(serde::Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    env: HashMap<String, String>,
}

/// Env pairs from the `[env]` table. Missing file, missing config dir or missing table yield an empty map.
pub fn load_env_map(app_name: &str) -> Result<HashMap<String, String>, LoadError> {
    let Some(path) = config_path(app_name) else {
        return Ok(HashMap::new());
    };
    let content = std::fs::read_to_string(&path).map_err(LoadError::XdgRead)?;
    let config: ConfigFile = toml::from_str(&content)?;
    Ok(config.env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Runs `f` with `XDG_CONFIG_HOME` pointing at a temp dir holding `<app>/config.toml`.
    fn with_config<T>(app: &str, toml: &str, f: impl FnOnce() -> T) -> T {
        let dir = tempfile::tempdir().unwrap();
        let app_dir = dir.path().join(app);
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(app_dir.join("config.toml"), toml).unwrap();

        let _guard = crate::ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let prev = env::var_os("XDG_CONFIG_HOME");
        env::set_var("XDG_CONFIG_HOME", dir.path());
        let out = f();
        match prev {
            Some(p) => env::set_var("XDG_CONFIG_HOME", p),
            None => env::remove_var("XDG_CONFIG_HOME"),
        }
        out
    }

    #[test]
    fn missing_config_returns_empty_map() {
        let map = load_env_map("stripe-toolkit-test-nonexistent-12345").unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn reads_env_table() {
        let map = with_config(
            "xdg-reads-env",
            "[env]\nSTRIPE_MCP_URL = \"https://mcp.example.test\"\nSTRIPE_MCP_TIMEOUT_MS = \"1500\"\n",
            || load_env_map("xdg-reads-env"),
        )
        .unwrap();
        assert_eq!(map["STRIPE_MCP_URL"], "https://mcp.example.test");
        assert_eq!(map["STRIPE_MCP_TIMEOUT_MS"], "1500");
    }

    #[test]
    fn other_tables_are_ignored() {
        let map = with_config("xdg-no-env", "[other]\nkey = \"ignored\"\n", || {
            load_env_map("xdg-no-env")
        })
        .unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let result = with_config("xdg-bad", "not valid toml [[[\n", || {
            load_env_map("xdg-bad")
        });
        assert!(matches!(result, Err(LoadError::XdgParse(_))));
    }
}
