use std::path::{Path, PathBuf};

use anyhow::Context;

const DEFAULT_CONFIG_DIR_NAME: &str = "drivesync";
const DEFAULT_EXCLUDE: &str = "node_modules";
const TOKEN_FILE_NAME: &str = "token.json";
const CLIENT_SECRET_FILE_NAME: &str = "client_secret.json";
const SELECTION_FILE_NAME: &str = "selection.json";

#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub config_dir: PathBuf,
    pub token_path: PathBuf,
    pub client_secret_path: PathBuf,
    pub selection_path: PathBuf,
    pub exclude: Vec<String>,
    pub api_base_url: Option<String>,
}

impl SyncConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let home = dirs::home_dir().context("home directory is unavailable")?;
        Ok(Self::from_lookup(&home, |name| std::env::var(name).ok()))
    }

    pub fn from_lookup<F>(home: &Path, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let path_var = |name: &str| lookup(name).map(|value| expand_with_home(&value, home));

        let config_dir = path_var("DRIVESYNC_CONFIG_DIR").unwrap_or_else(default_config_dir);
        let token_path =
            path_var("DRIVESYNC_TOKEN_PATH").unwrap_or_else(|| config_dir.join(TOKEN_FILE_NAME));
        let client_secret_path = path_var("DRIVESYNC_CLIENT_SECRET_PATH")
            .unwrap_or_else(|| config_dir.join(CLIENT_SECRET_FILE_NAME));
        let selection_path = path_var("DRIVESYNC_SELECTION_PATH")
            .unwrap_or_else(|| config_dir.join(SELECTION_FILE_NAME));
        let exclude = parse_exclude_list(
            lookup("DRIVESYNC_EXCLUDE")
                .as_deref()
                .unwrap_or(DEFAULT_EXCLUDE),
        );
        let api_base_url = lookup("DRIVESYNC_API_URL").filter(|value| !value.trim().is_empty());

        Self {
            config_dir,
            token_path,
            client_secret_path,
            selection_path,
            exclude,
            api_base_url,
        }
    }
}

fn parse_exclude_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn expand_with_home(value: &str, home: &Path) -> PathBuf {
    if value == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = value.strip_prefix("~/") {
        return home.join(rest);
    }
    PathBuf::from(value)
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(DEFAULT_CONFIG_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> SyncConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SyncConfig::from_lookup(Path::new("/home/alice"), |name| vars.get(name).cloned())
    }

    #[test]
    fn state_files_default_under_config_dir() {
        let config = config_with(&[("DRIVESYNC_CONFIG_DIR", "~/.drivesync")]);
        assert_eq!(config.config_dir, PathBuf::from("/home/alice/.drivesync"));
        assert_eq!(
            config.token_path,
            PathBuf::from("/home/alice/.drivesync/token.json")
        );
        assert_eq!(
            config.client_secret_path,
            PathBuf::from("/home/alice/.drivesync/client_secret.json")
        );
        assert_eq!(
            config.selection_path,
            PathBuf::from("/home/alice/.drivesync/selection.json")
        );
    }

    #[test]
    fn explicit_paths_override_config_dir() {
        let config = config_with(&[
            ("DRIVESYNC_CONFIG_DIR", "/etc/drivesync"),
            ("DRIVESYNC_TOKEN_PATH", "/run/token.json"),
        ]);
        assert_eq!(config.token_path, PathBuf::from("/run/token.json"));
        assert_eq!(
            config.client_secret_path,
            PathBuf::from("/etc/drivesync/client_secret.json")
        );
    }

    #[test]
    fn exclude_defaults_to_node_modules() {
        let config = config_with(&[]);
        assert_eq!(config.exclude, vec!["node_modules".to_string()]);
        assert!(config.api_base_url.is_none());
    }

    #[test]
    fn exclude_list_is_trimmed_and_split() {
        let config = config_with(&[("DRIVESYNC_EXCLUDE", " node_modules, target ,,.git")]);
        assert_eq!(config.exclude, vec!["node_modules", "target", ".git"]);
    }

    #[test]
    fn empty_exclude_disables_exclusions() {
        let config = config_with(&[("DRIVESYNC_EXCLUDE", "")]);
        assert!(config.exclude.is_empty());
    }
}
