use crate::error::{HakbotError, Result};
use chrono::FixedOffset;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `storage.path`.
pub const DATABASE_URL_ENV: &str = "HAKBOT_DATABASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HakbotConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub school: SchoolConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding `meals.csv`, `events.csv` and `timetable.json`.
    #[serde(default = "default_data_dir")]
    pub dir: String,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl DataConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolConfig {
    /// Offset from UTC, in minutes, of the school's timezone. All relative
    /// dates ("today", "내일") are computed in this offset.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

impl Default for SchoolConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

impl SchoolConfig {
    pub fn timezone(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            HakbotError::Config(format!(
                "school.utc_offset_minutes = {} is not a valid UTC offset",
                self.utc_offset_minutes
            ))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Path of the SQLite database. Defaults to `~/.config/hakbot/hakbot.db`.
    #[serde(default)]
    pub path: Option<String>,
}

impl StorageConfig {
    pub fn resolve_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(p) if !p.is_empty() => Ok(PathBuf::from(p)),
            _ => default_sqlite_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_web_port")]
    pub port: u16,
    #[serde(default = "default_web_host")]
    pub host: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: default_web_port(),
            host: default_web_host(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: default_session_ttl_hours(),
        }
    }
}

// -- Defaults --

fn default_data_dir() -> String {
    "data/sample".to_string()
}
fn default_read_timeout_ms() -> u64 {
    2000
}
fn default_utc_offset_minutes() -> i32 {
    // Asia/Manila, no DST.
    8 * 60
}
fn default_web_port() -> u16 {
    3000
}
fn default_web_host() -> String {
    "127.0.0.1".to_string()
}
fn default_session_ttl_hours() -> u64 {
    24 * 30
}

impl HakbotConfig {
    /// Load configuration with a layered merge:
    /// 1. ~/.config/hakbot/config.toml (global)
    /// 2. .hakbot/config.toml (project)
    /// 3. .hakbot/config.local.toml (local, gitignored)
    /// 4. `HAKBOT__SECTION__KEY` environment variables, then `HAKBOT_DATABASE_URL`
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        if let Some(dir) = project_dir {
            let project_config = dir.join(".hakbot").join("config.toml");
            if project_config.exists() {
                builder = builder.add_source(File::from(project_config).required(false));
            }

            let local_config = dir.join(".hakbot").join("config.local.toml");
            if local_config.exists() {
                builder = builder.add_source(File::from(local_config).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("HAKBOT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| HakbotError::Config(e.to_string()))?;

        let mut cfg: Self = config
            .try_deserialize()
            .map_err(|e| HakbotError::Config(e.to_string()))?;

        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            if !url.is_empty() {
                cfg.storage.path = Some(url.trim_start_matches("sqlite://").to_string());
            }
        }

        cfg.validate();
        Ok(cfg)
    }

    /// Defaults only (no files, no environment).
    pub fn default_config() -> Self {
        Self {
            data: DataConfig::default(),
            school: SchoolConfig::default(),
            storage: StorageConfig::default(),
            web: WebConfig::default(),
            auth: AuthConfig::default(),
        }
    }

    /// Validate config values, repairing out-of-range ones and logging warnings.
    pub fn validate(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        // Real-world offsets span UTC-12:00 to UTC+14:00.
        if !(-12 * 60..=14 * 60).contains(&self.school.utc_offset_minutes) {
            warnings.push(format!(
                "school.utc_offset_minutes = {} out of range [-720, 840], using {}",
                self.school.utc_offset_minutes,
                default_utc_offset_minutes()
            ));
            self.school.utc_offset_minutes = default_utc_offset_minutes();
        }

        if self.data.read_timeout_ms == 0 {
            warnings.push(format!(
                "data.read_timeout_ms = 0, setting to {}",
                default_read_timeout_ms()
            ));
            self.data.read_timeout_ms = default_read_timeout_ms();
        }

        if self.auth.session_ttl_hours == 0 {
            warnings.push("auth.session_ttl_hours = 0, setting to 1".to_string());
            self.auth.session_ttl_hours = 1;
        }

        if self.data.dir.trim().is_empty() {
            warnings.push(format!("data.dir is empty, using {}", default_data_dir()));
            self.data.dir = default_data_dir();
        }

        for w in &warnings {
            tracing::warn!("config: {}", w);
        }

        warnings
    }

    /// Checks that must pass before the server starts. Failures here are
    /// fatal; nothing is retried per request.
    pub fn check_startup(&self) -> Result<()> {
        let dir = Path::new(&self.data.dir);
        if !dir.is_dir() {
            return Err(HakbotError::Config(format!(
                "data directory {} does not exist",
                dir.display()
            )));
        }
        self.storage.resolve_path()?;
        self.school.timezone()?;
        Ok(())
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| HakbotError::Config(format!("failed to serialize config: {e}")))
    }
}

fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("hakbot").join("config.toml"))
}

/// Default SQLite path: `~/.config/hakbot/hakbot.db`
fn default_sqlite_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join("hakbot").join("hakbot.db"))
        .ok_or_else(|| HakbotError::Config("cannot determine config directory".to_string()))
}
