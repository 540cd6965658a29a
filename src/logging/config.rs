use std::{fs, io, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};
use streamhub_error::{ensure, StatusCode, StreamhubResult};

/// Формат вывода событий.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Настройки логирования.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Базовый уровень: `trace`, `debug`, `info`, `warn`, `error`.
    pub level: String,
    /// Дополнительные директивы `EnvFilter`, например `streamhub::listener=debug`.
    pub directives: Vec<String>,
    pub format: LogFormat,
    pub console: ConsoleConfig,
    pub file: FileConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_thread_ids: bool,
    pub with_line_numbers: bool,
}

/// Файловый sink с ежедневной ротацией.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    pub enabled: bool,
    pub directory: PathBuf,
    pub file_name: String,
    /// Формат файла; по умолчанию JSON, чтобы его было удобно разбирать.
    pub format: LogFormat,
}

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl LoggingConfig {
    /// Применяет `STREAMHUB_LOG_LEVEL` и `STREAMHUB_LOG_FORMAT`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("STREAMHUB_LOG_LEVEL") {
            self.level = level.to_lowercase();
        }
        if let Ok(format) = std::env::var("STREAMHUB_LOG_FORMAT") {
            match LogFormat::from_str(&format) {
                Ok(format) => self.format = format,
                Err(_) => eprintln!("Ignoring unknown STREAMHUB_LOG_FORMAT '{format}'"),
            }
        }
    }

    pub fn validate(&self) -> StreamhubResult<()> {
        ensure!(
            LEVELS.contains(&self.level.as_str()),
            StatusCode::InvalidArgs,
            "unknown log level '{}'",
            self.level
        );
        ensure!(
            !self.file.enabled || !self.file.file_name.is_empty(),
            StatusCode::InvalidArgs,
            "log file name cannot be empty"
        );
        Ok(())
    }

    /// Собирает строку фильтра: базовый уровень и директивы через запятую.
    pub fn build_filter_directive(&self) -> String {
        std::iter::once(self.level.as_str())
            .chain(self.directives.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn ensure_log_dir(&self) -> io::Result<()> {
        if self.file.enabled {
            fs::create_dir_all(&self.file.directory)?;
        }
        Ok(())
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directives: Vec::new(),
            format: LogFormat::default(),
            console: ConsoleConfig::default(),
            file: FileConfig::default(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            with_ansi: true,
            with_target: true,
            with_thread_ids: false,
            with_line_numbers: false,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: PathBuf::from("logs"),
            file_name: "streamhub.log".to_string(),
            format: LogFormat::Json,
        }
    }
}
