use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{layer::Layer, registry::LookupSpan};

use crate::logging::{config::LoggingConfig, formatter};

/// Файловый слой с ежедневной ротацией и неблокирующей записью.
///
/// Guard нужно держать, пока логирование активно: при его сбросе буфер
/// сбрасывается на диск.
pub fn layer_with_config<S>(config: &LoggingConfig) -> (Box<dyn Layer<S> + Send + Sync>, WorkerGuard)
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let appender = rolling::daily(&config.file.directory, &config.file.file_name);
    let (writer, guard) = non_blocking(appender);
    let layer = formatter::build_formatter(config.file.format, &config.console, false, writer);
    (layer, guard)
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::{prelude::*, registry::Registry};

    use super::*;
    use crate::logging::config::FileConfig;

    #[test]
    fn test_file_layer_writes_to_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = LoggingConfig {
            file: FileConfig {
                enabled: true,
                directory: tmp.path().to_path_buf(),
                ..Default::default()
            },
            ..Default::default()
        };

        let (layer, guard) = layer_with_config::<Registry>(&cfg);
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(stream = "orders", "receive failed");
        });
        drop(guard);

        let files: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let contents = std::fs::read_to_string(files[0].as_ref().unwrap().path()).unwrap();
        assert!(contents.contains("receive failed"));
    }
}
