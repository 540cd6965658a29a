use std::{path::Path, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use streamhub_error::{ensure, ResultExt, StatusCode, StreamhubResult};

use crate::{
    driver::DEFAULT_BUS_CAPACITY,
    hub::DEFAULT_INSTANCE_NAME,
    listener::{
        RetryPolicy, SupervisorConfig, DEFAULT_CONCURRENCY_LEVEL, DEFAULT_GROUP,
        DEFAULT_RETRY_INITIAL_INTERVAL, DEFAULT_RETRY_MAX_INTERVAL, DEFAULT_RETRY_TIMEOUT,
    },
    logging::LoggingConfig,
};

/// Настройки процесса.
///
/// Слои в порядке приоритета: встроенные значения → файл (TOML/YAML/JSON,
/// по расширению) → переменные окружения `STREAMHUB__<СЕКЦИЯ>__<ПОЛЕ>`.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub hub: HubSettings,
    pub listener: ListenerSettings,
    pub memory_bus: MemoryBusSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HubSettings {
    pub instance_name: String,
}

/// Умолчания узлов слушателей. Интервалы в миллисекундах.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListenerSettings {
    pub group: String,
    pub concurrency_level: usize,
    pub retry_initial_interval_ms: u64,
    pub retry_max_interval_ms: u64,
    pub retry_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MemoryBusSettings {
    pub capacity: usize,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let listener = ListenerSettings::default();

        let mut builder = Config::builder()
            .set_default("hub.instance_name", DEFAULT_INSTANCE_NAME)?
            .set_default("listener.group", DEFAULT_GROUP)?
            .set_default("listener.concurrency_level", listener.concurrency_level as u64)?
            .set_default("listener.retry_initial_interval_ms", listener.retry_initial_interval_ms)?
            .set_default("listener.retry_max_interval_ms", listener.retry_max_interval_ms)?
            .set_default("listener.retry_timeout_ms", listener.retry_timeout_ms)?
            .set_default("memory_bus.capacity", DEFAULT_BUS_CAPACITY as u64)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        builder
            .add_source(
                Environment::with_prefix("STREAMHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn validate(&self) -> StreamhubResult<()> {
        ensure!(
            !self.hub.instance_name.is_empty(),
            StatusCode::InvalidArgs,
            "hub instance name cannot be empty"
        );
        ensure!(
            self.listener.concurrency_level >= 1,
            StatusCode::InvalidArgs,
            "listener concurrency level must be >= 1"
        );
        ensure!(
            self.listener.retry_max_interval_ms >= self.listener.retry_initial_interval_ms,
            StatusCode::InvalidArgs,
            "retry max interval ({}ms) is below initial interval ({}ms)",
            self.listener.retry_max_interval_ms,
            self.listener.retry_initial_interval_ms
        );
        ensure!(
            self.memory_bus.capacity >= 1,
            StatusCode::InvalidArgs,
            "memory bus capacity must be >= 1"
        );
        self.logging.validate().context("invalid logging settings")
    }
}

impl ListenerSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_millis(self.retry_initial_interval_ms),
            Duration::from_millis(self.retry_max_interval_ms),
            Duration::from_millis(self.retry_timeout_ms),
        )
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            instance_name: DEFAULT_INSTANCE_NAME.to_string(),
        }
    }
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            group: DEFAULT_GROUP.to_string(),
            concurrency_level: DEFAULT_CONCURRENCY_LEVEL,
            retry_initial_interval_ms: DEFAULT_RETRY_INITIAL_INTERVAL.as_millis() as u64,
            retry_max_interval_ms: DEFAULT_RETRY_MAX_INTERVAL.as_millis() as u64,
            retry_timeout_ms: DEFAULT_RETRY_TIMEOUT.as_millis() as u64,
        }
    }
}

impl Default for MemoryBusSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_BUS_CAPACITY,
        }
    }
}

impl From<&ListenerSettings> for SupervisorConfig {
    fn from(settings: &ListenerSettings) -> Self {
        Self {
            group: settings.group.clone(),
            concurrency_level: settings.concurrency_level,
            retry: settings.retry_policy(),
            ..Default::default()
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
