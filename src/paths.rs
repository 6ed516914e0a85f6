//! Path resolution for the provider's configuration file
//!
//! # Environment Variables
//!
//! - `SMALLSTEP_PROVIDER_CONFIG_DIR` - Override the config directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `SMALLSTEP_PROVIDER_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/smallstep` (if set)
//! 3. `~/.config/smallstep`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "SMALLSTEP_PROVIDER_CONFIG_DIR";

/// File name of the provider configuration inside the config directory
pub const CONFIG_FILE: &str = "provider.toml";

/// Get the provider config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!("Using config dir from {}: {}", ENV_CONFIG_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("smallstep");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("smallstep");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Default location of `provider.toml`
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables leave the path unexpanded.
///
/// ```
/// use terraform_provider_smallstep::paths;
///
/// let secret = paths::expand("~/.step/webhook.secret");
/// assert!(!secret.starts_with("~"));
/// ```
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Run `f` with `key` set to `value`, restoring the previous value.
    ///
    /// # Safety
    /// Uses env::set_var/remove_var; every test touches a distinct variable.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: no other test reads this variable
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: as above
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    #[test]
    fn test_config_dir_env_override() {
        with_env_var(ENV_CONFIG_DIR, "/custom/smallstep", || {
            assert_eq!(config_dir().unwrap(), PathBuf::from("/custom/smallstep"));
            assert_eq!(
                config_file().unwrap(),
                PathBuf::from("/custom/smallstep/provider.toml")
            );
        });
    }

    #[test]
    fn test_expand_with_tilde() {
        let result = expand("~/test/path");
        let home = dirs::home_dir().unwrap();
        assert_eq!(result, home.join("test").join("path"));
    }

    #[test]
    fn test_expand_absolute() {
        assert_eq!(expand("/absolute/path"), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_with_env_var() {
        with_env_var("SMALLSTEP_PATHS_TEST_VAR", "test_value", || {
            let result = expand("/path/$SMALLSTEP_PATHS_TEST_VAR/file");
            assert_eq!(result, PathBuf::from("/path/test_value/file"));
        });
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_VAR_12345/file");
        assert_eq!(result, PathBuf::from("/path/$NONEXISTENT_VAR_12345/file"));
    }
}
