//! Read a project `.env` into a key-value map without touching the process environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::LoadError;

/// `.env` in `override_dir` if given, else in the current directory; `None` when absent.
fn dotenv_path(override_dir: Option<&Path>) -> Option<PathBuf> {
    let dir = override_dir
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok())?;
    let path = dir.join(".env");
    path.is_file().then_some(path)
}

/// Parses `.env` with the `dotenv` crate's line grammar (quotes, comments, `$VAR` substitution).
/// A missing file yields an empty map.
pub fn load_env_map(override_dir: Option<&Path>) -> Result<HashMap<String, String>, LoadError> {
    let Some(path) = dotenv_path(override_dir) else {
        return Ok(HashMap::new());
    };
    let iter = dotenv::from_path_iter(&path)
        .map_err(|e| LoadError::Dotenv(format!("{}: {}", path.display(), e)))?;
    iter.map(|item| item.map_err(|e| LoadError::Dotenv(format!("{}: {}", path.display(), e))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_env(content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), content).unwrap();
        dir
    }

    #[test]
    fn missing_file_returns_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_env_map(Some(dir.path())).unwrap().is_empty());
    }

    #[test]
    fn reads_stripe_keys_with_quotes_and_comments() {
        let dir = write_env(
            "# toolkit settings\nSTRIPE_SECRET_KEY=rk_test_123\nSTRIPE_ACCOUNT=\"acct_9\"\n\nSTRIPE_CUSTOMER='cus_7'\n",
        );
        let m = load_env_map(Some(dir.path())).unwrap();
        assert_eq!(m.len(), 3);
        assert_eq!(m["STRIPE_SECRET_KEY"], "rk_test_123");
        assert_eq!(m["STRIPE_ACCOUNT"], "acct_9");
        assert_eq!(m["STRIPE_CUSTOMER"], "cus_7");
    }

    #[test]
    fn malformed_line_is_reported_with_path() {
        let dir = write_env("STRIPE_SECRET_KEY=\"unterminated\n");
        match load_env_map(Some(dir.path())) {
            Err(LoadError::Dotenv(msg)) => assert!(msg.contains(".env"), "{}", msg),
            other => panic!("expected Dotenv error, got {:?}", other),
        }
    }
}
