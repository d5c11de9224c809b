use config::{Config, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;

const DEFAULT_CONFIG_NAME: &str = "rules";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub source_folder: PathBuf,
    pub duplicate_folder: PathBuf,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default)]
    pub stability: StabilitySettings,
    #[serde(default)]
    pub hashing: HashSettings,
    #[serde(default)]
    pub relocation: RelocationSettings,
    #[serde(default)]
    pub watch: WatchSettings,
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// One rule as written by the user. Validated into a `SortingRule` by
/// `RuleSet::from_configs`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RuleConfig {
    pub name: String,
    #[serde(default)]
    pub dest: Option<String>,
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
    #[serde(default)]
    pub name_contains: Option<Vec<String>>,
    #[serde(default)]
    pub content_contains: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StabilitySettings {
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for StabilitySettings {
    fn default() -> Self {
        Self {
            interval_ms: 1500,
            max_attempts: 5,
        }
    }
}

impl StabilitySettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HashSettings {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for HashSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 250,
        }
    }
}

/// Retry budget for moves that fail while a file is briefly locked.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelocationSettings {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RelocationSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchSettings {
    pub debounce_ms: u64,
    pub queue_capacity: usize,
    /// Worker threads for in-flight candidates; 0 lets rayon decide.
    pub workers: usize,
    pub sweep_on_start: bool,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            queue_capacity: 256,
            workers: 0,
            sweep_on_start: true,
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("file_hashes.db")
}

pub fn default_ignore_patterns() -> Vec<String> {
    [".*", "~*", "Thumbs.db", "*.tmp", "*.crdownload", "*.part"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Load configuration from `path`, or from a file named `rules` (any
/// extension the `config` crate understands) in the working directory.
/// `CORTEX_*` environment variables override file values.
pub fn load_configuration(path: Option<&Path>) -> Result<AppConfig, Error> {
    let file_source = match path {
        Some(p) => ConfigFile::from(p).required(true),
        None => ConfigFile::with_name(DEFAULT_CONFIG_NAME).required(true),
    };

    let builder = Config::builder()
        .add_source(file_source)
        .add_source(
            Environment::with_prefix("CORTEX")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let mut app_config = builder.try_deserialize::<AppConfig>()?;
    app_config.expand_paths();
    Ok(app_config)
}

impl AppConfig {
    fn expand_paths(&mut self) {
        self.source_folder = expand_home(&self.source_folder);
        self.duplicate_folder = expand_home(&self.duplicate_folder);
        self.database_path = expand_home(&self.database_path);
    }
}

/// Replace a leading `~` with the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_expand_home_leaves_absolute_paths() {
        let p = Path::new("/var/data/inbox");
        assert_eq!(expand_home(p), PathBuf::from("/var/data/inbox"));
    }

    #[test]
    fn test_expand_home_replaces_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/Downloads")), home.join("Downloads"));
        }
    }

    #[test]
    fn test_load_yaml_configuration() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rules.yml");
        fs::write(
            &path,
            r#"
source_folder: /tmp/inbox
duplicate_folder: /tmp/inbox/_dupes
stability:
  interval_ms: 10
  max_attempts: 2
rules:
  - name: Invoices
    dest: /tmp/sorted/invoices
    extensions: [pdf]
    content_contains: [Invoice]
  - name: Images
    dest: /tmp/sorted/images
    extensions: [".PNG", jpg]
"#,
        )
        .unwrap();

        let cfg = load_configuration(Some(&path)).unwrap();
        assert_eq!(cfg.source_folder, PathBuf::from("/tmp/inbox"));
        assert_eq!(cfg.stability.interval_ms, 10);
        assert_eq!(cfg.stability.max_attempts, 2);
        assert_eq!(cfg.hashing.max_attempts, 3);
        assert_eq!(cfg.relocation.max_attempts, 3);
        assert_eq!(cfg.relocation.backoff_ms, 250);
        assert_eq!(cfg.database_path, PathBuf::from("file_hashes.db"));
        assert_eq!(cfg.ignore_patterns, default_ignore_patterns());
        assert_eq!(cfg.rules.len(), 2);
        assert_eq!(cfg.rules[0].name, "Invoices");
        assert_eq!(cfg.rules[1].dest.as_deref(), Some("/tmp/sorted/images"));
        assert!(cfg.rules[1].name_contains.is_none());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let result = load_configuration(Some(&dir.path().join("absent.yml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
