use std::{fmt, sync::Arc, time::Duration};

use tracing::warn;

use super::{supervisor::SupervisorConfig, ErrorSink, Listener, RetryPolicy};
use crate::driver::ListenerDriver;

pub const DEFAULT_GROUP: &str = "";
pub const DEFAULT_CONCURRENCY_LEVEL: usize = 1;

/// Регистрация потребления: поток, группа, обработчик и политика.
///
/// Создаётся супервизором в [`ListenerSupervisor::fork_node`] и после этого
/// не меняется. Инварианты (`concurrency_level >= 1`,
/// `max_interval >= initial_interval`) обеспечиваются при создании.
///
/// [`ListenerSupervisor::fork_node`]: super::ListenerSupervisor::fork_node
pub struct ListenerNode {
    stream: String,
    group: String,
    concurrency_level: usize,
    retry: RetryPolicy,
    driver: Arc<dyn ListenerDriver>,
    listener: Arc<dyn Listener>,
    error_sink: Arc<dyn ErrorSink>,
}

/// Переопределения для одного узла. Незаданные поля берутся из
/// [`SupervisorConfig`].
#[derive(Default, Clone)]
pub struct ListenerOptions {
    group: Option<String>,
    concurrency_level: Option<usize>,
    retry_initial_interval: Option<Duration>,
    retry_max_interval: Option<Duration>,
    retry_timeout: Option<Duration>,
    driver: Option<Arc<dyn ListenerDriver>>,
    listener: Option<Arc<dyn Listener>>,
    error_sink: Option<Arc<dyn ErrorSink>>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl ListenerNode {
    /// Собирает узел: сначала умолчания супервизора, затем переопределения.
    pub(crate) fn compose(
        stream: &str,
        defaults: &SupervisorConfig,
        opts: ListenerOptions,
    ) -> Self {
        let mut concurrency_level = opts
            .concurrency_level
            .unwrap_or(defaults.concurrency_level);
        if concurrency_level == 0 {
            warn!(stream, "concurrency level 0 is not allowed, using 1");
            concurrency_level = 1;
        }

        let retry = RetryPolicy::new(
            opts.retry_initial_interval
                .unwrap_or(defaults.retry.initial_interval),
            opts.retry_max_interval
                .unwrap_or(defaults.retry.max_interval),
            opts.retry_timeout.unwrap_or(defaults.retry.timeout),
        )
        .normalized(stream);

        Self {
            stream: stream.to_string(),
            group: opts.group.unwrap_or_else(|| defaults.group.clone()),
            concurrency_level,
            retry,
            driver: opts.driver.unwrap_or_else(|| Arc::clone(&defaults.driver)),
            listener: opts
                .listener
                .unwrap_or_else(|| Arc::clone(&defaults.listener)),
            error_sink: opts
                .error_sink
                .unwrap_or_else(|| Arc::clone(&defaults.error_sink)),
        }
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn concurrency_level(&self) -> usize {
        self.concurrency_level
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn driver(&self) -> &Arc<dyn ListenerDriver> {
        &self.driver
    }

    pub fn listener(&self) -> &Arc<dyn Listener> {
        &self.listener
    }

    pub fn error_sink(&self) -> &Arc<dyn ErrorSink> {
        &self.error_sink
    }
}

impl ListenerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Группа потребителей узла.
    pub fn group(
        mut self,
        group: impl Into<String>,
    ) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Число воркеров узла. `0` при создании узла поднимается до `1`.
    pub fn concurrency_level(
        mut self,
        level: usize,
    ) -> Self {
        self.concurrency_level = Some(level);
        self
    }

    pub fn retry_initial_interval(
        mut self,
        interval: Duration,
    ) -> Self {
        self.retry_initial_interval = Some(interval);
        self
    }

    pub fn retry_max_interval(
        mut self,
        interval: Duration,
    ) -> Self {
        self.retry_max_interval = Some(interval);
        self
    }

    pub fn retry_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.retry_timeout = Some(timeout);
        self
    }

    pub fn driver(
        mut self,
        driver: Arc<dyn ListenerDriver>,
    ) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn listener<L: Listener + 'static>(
        mut self,
        listener: L,
    ) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    pub fn error_sink(
        mut self,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        self.error_sink = Some(sink);
        self
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl fmt::Debug for ListenerNode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ListenerNode")
            .field("stream", &self.stream)
            .field("group", &self.group)
            .field("concurrency_level", &self.concurrency_level)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for ListenerOptions {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ListenerOptions")
            .field("group", &self.group)
            .field("concurrency_level", &self.concurrency_level)
            .field("retry_initial_interval", &self.retry_initial_interval)
            .field("retry_max_interval", &self.retry_max_interval)
            .field("retry_timeout", &self.retry_timeout)
            .field("driver", &self.driver.is_some())
            .field("listener", &self.listener.is_some())
            .field("error_sink", &self.error_sink.is_some())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
