use std::{sync::Arc, time::Duration};

use super::Hub;
use crate::{
    codec::{JsonMarshaler, Marshaler, SchemaRegistry},
    config::Settings,
    driver::{ListenerDriver, NoopWriter, Writer},
    id::{IdFactory, UuidIdFactory},
    listener::{ErrorSink, Listener, ListenerSupervisor, SupervisorConfig},
    metrics::HubMetrics,
    stream::StreamRegistry,
};

/// Имя экземпляра хаба по умолчанию (поле `source` конверта).
pub const DEFAULT_INSTANCE_NAME: &str = "com.streamhub";

/// Построитель [`Hub`].
///
/// Незаданные коллабораторы заменяются значениями по умолчанию: JSON-кодек,
/// UUID v4, писатель-заглушка, без реестра схем.
pub struct HubBuilder {
    instance_name: String,
    marshaler: Arc<dyn Marshaler>,
    schema_registry: Option<Arc<dyn SchemaRegistry>>,
    id_factory: Arc<dyn IdFactory>,
    writer: Arc<dyn Writer>,
    metrics: Arc<HubMetrics>,
    listener: SupervisorConfig,
}

impl HubBuilder {
    pub fn new() -> Self {
        Self {
            instance_name: DEFAULT_INSTANCE_NAME.to_string(),
            marshaler: Arc::new(JsonMarshaler),
            schema_registry: None,
            id_factory: Arc::new(UuidIdFactory),
            writer: Arc::new(NoopWriter),
            metrics: Arc::new(HubMetrics::new()),
            listener: SupervisorConfig::default(),
        }
    }

    /// Применяет имя экземпляра и умолчания слушателей из настроек.
    pub fn with_settings(
        mut self,
        settings: &Settings,
    ) -> Self {
        let supervisor = SupervisorConfig::from(&settings.listener);
        self.instance_name = settings.hub.instance_name.clone();
        self.listener.group = supervisor.group;
        self.listener.concurrency_level = supervisor.concurrency_level;
        self.listener.retry = supervisor.retry;
        self
    }

    pub fn instance_name(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.instance_name = name.into();
        self
    }

    pub fn marshaler(
        mut self,
        marshaler: Arc<dyn Marshaler>,
    ) -> Self {
        self.marshaler = marshaler;
        self
    }

    pub fn schema_registry(
        mut self,
        registry: Arc<dyn SchemaRegistry>,
    ) -> Self {
        self.schema_registry = Some(registry);
        self
    }

    pub fn id_factory(
        mut self,
        factory: Arc<dyn IdFactory>,
    ) -> Self {
        self.id_factory = factory;
        self
    }

    pub fn writer(
        mut self,
        writer: Arc<dyn Writer>,
    ) -> Self {
        self.writer = writer;
        self
    }

    /// Общие счётчики; по умолчанию создаются новые.
    pub fn metrics(
        mut self,
        metrics: Arc<HubMetrics>,
    ) -> Self {
        self.metrics = metrics;
        self
    }

    /// Драйвер по умолчанию для всех узлов слушателей.
    pub fn driver(
        mut self,
        driver: Arc<dyn ListenerDriver>,
    ) -> Self {
        self.listener.driver = driver;
        self
    }

    pub fn group(
        mut self,
        group: impl Into<String>,
    ) -> Self {
        self.listener.group = group.into();
        self
    }

    pub fn concurrency_level(
        mut self,
        level: usize,
    ) -> Self {
        self.listener.concurrency_level = level;
        self
    }

    pub fn retry_initial_interval(
        mut self,
        interval: Duration,
    ) -> Self {
        self.listener.retry.initial_interval = interval;
        self
    }

    pub fn retry_max_interval(
        mut self,
        interval: Duration,
    ) -> Self {
        self.listener.retry.max_interval = interval;
        self
    }

    pub fn retry_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.listener.retry.timeout = timeout;
        self
    }

    /// Обработчик по умолчанию для узлов без собственного.
    pub fn listener<L: Listener + 'static>(
        mut self,
        listener: L,
    ) -> Self {
        self.listener.listener = Arc::new(listener);
        self
    }

    pub fn error_sink(
        mut self,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        self.listener.error_sink = sink;
        self
    }

    pub fn build(self) -> Hub {
        let supervisor = ListenerSupervisor::new(self.listener, Arc::clone(&self.metrics));
        Hub {
            instance_name: self.instance_name,
            registry: StreamRegistry::new(),
            marshaler: self.marshaler,
            schema_registry: self.schema_registry,
            id_factory: self.id_factory,
            writer: self.writer,
            supervisor,
            metrics: self.metrics,
        }
    }
}

impl Default for HubBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::DEFAULT_CONCURRENCY_LEVEL;

    #[test]
    fn test_builder_defaults() {
        let hub = HubBuilder::new().build();
        assert_eq!(hub.instance_name(), DEFAULT_INSTANCE_NAME);
        assert_eq!(
            hub.supervisor().config().concurrency_level,
            DEFAULT_CONCURRENCY_LEVEL
        );
    }

    #[test]
    fn test_with_settings_applies_listener_defaults() {
        let mut settings = Settings::default();
        settings.hub.instance_name = "ncorp".to_string();
        settings.listener.group = "wallet".to_string();
        settings.listener.concurrency_level = 4;
        settings.listener.retry_timeout_ms = 500;

        let hub = HubBuilder::new().with_settings(&settings).build();
        let config = hub.supervisor().config();
        assert_eq!(hub.instance_name(), "ncorp");
        assert_eq!(config.group, "wallet");
        assert_eq!(config.concurrency_level, 4);
        assert_eq!(config.retry.timeout, Duration::from_millis(500));
    }
}
