use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "chatview_config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,

    #[serde(skip)]
    pub config_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_debounce_ms")]
    pub search_debounce_ms: u64,

    #[serde(default = "default_flash_ms")]
    pub highlight_flash_ms: u64,

    #[serde(default = "default_result_limit")]
    pub search_result_limit: usize,

    #[serde(default = "default_toast_secs")]
    pub error_toast_secs: u64,

    #[serde(default = "default_true")]
    pub show_borders: bool,

    /// Export opened when none is given on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            search_debounce_ms: default_debounce_ms(),
            highlight_flash_ms: default_flash_ms(),
            search_result_limit: default_result_limit(),
            error_toast_secs: default_toast_secs(),
            show_borders: true,
            last_file: None,
        }
    }
}

fn default_debounce_ms() -> u64 {
    200
}

fn default_flash_ms() -> u64 {
    2000
}

fn default_result_limit() -> usize {
    200
}

fn default_toast_secs() -> u64 {
    8
}

fn default_true() -> bool {
    true
}

impl Settings {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn highlight_flash(&self) -> Duration {
        Duration::from_millis(self.highlight_flash_ms)
    }

    pub fn error_toast(&self) -> Duration {
        Duration::from_secs(self.error_toast_secs)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Self::get_config_dir())
    }

    /// Load from `config_dir`, writing out defaults when no file exists yet.
    pub fn load_from(config_dir: PathBuf) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            let mut config: Config = serde_json::from_str(&content)?;
            config.config_dir = config_dir;
            Ok(config)
        } else {
            fs::create_dir_all(&config_dir)?;
            let config = Config {
                settings: Settings::default(),
                config_dir,
            };
            config.save()?;
            crate::info_log!("config: wrote defaults to {}", config_path.display());
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = self.config_dir.join(CONFIG_FILE);
        let content = serde_json::to_string_pretty(&self)?;
        fs::write(config_path, content)?;
        Ok(())
    }

    /// Remember `path` as the export to reopen next time.
    pub fn remember_file(&mut self, path: &Path) -> Result<()> {
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if self.settings.last_file.as_deref() == Some(path.as_path()) {
            return Ok(());
        }
        self.settings.last_file = Some(path);
        self.save()
    }

    fn get_config_dir() -> PathBuf {
        // First check current directory
        let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        if current_dir.join(CONFIG_FILE).exists() {
            return current_dir;
        }

        if let Ok(config_dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(config_dir).join("chatview")
        } else if let Some(home) = dirs::home_dir() {
            home.join(".config").join("chatview")
        } else {
            PathBuf::from(".chatview")
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.config_dir.join("debug.log")
    }
}
