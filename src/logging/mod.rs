//! Логирование на `tracing`.
//!
//! [`init_logging`] собирает глобальный subscriber из фильтра, консольного
//! слоя и (опционально) файлового слоя с ежедневной ротацией.

pub mod config;
mod filters;
mod formatter;
pub mod handle;
pub mod sinks;

pub use config::{ConsoleConfig, FileConfig, LogFormat, LoggingConfig};
pub use handle::LoggingHandle;
use streamhub_error::BoxError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Устанавливает глобальный subscriber по конфигурации.
///
/// Возвращает ошибку при некорректной конфигурации или если глобальный
/// subscriber уже установлен.
pub fn init_logging(mut config: LoggingConfig) -> Result<LoggingHandle, BoxError> {
    config.apply_env_overrides();
    config.validate()?;
    config.ensure_log_dir()?;

    let env_filter = filters::build_filter_from_config(&config);
    let mut layers = Vec::new();

    if config.console.enabled {
        layers.push(sinks::console::layer_with_config(&config));
    }

    let file_guard = if config.file.enabled {
        let (file_layer, guard) = sinks::file::layer_with_config(&config);
        layers.push(file_layer);
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        level = %config.level,
        format = ?config.format,
        console = config.console.enabled,
        file = config.file.enabled,
        "logging initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}
