use std::sync::atomic::{AtomicU64, Ordering};

/// Счётчики хаба.
///
/// Обновляются без блокировок из конвейера публикации и воркеров
/// слушателей. Снимок не атомарен как целое: каждое поле читается отдельно.
#[derive(Debug, Default)]
pub struct HubMetrics {
    published: AtomicU64,
    publish_failures: AtomicU64,
    received: AtomicU64,
    handled: AtomicU64,
    handler_failures: AtomicU64,
    retries: AtomicU64,
    exhausted: AtomicU64,
    driver_errors: AtomicU64,
}

/// Снимок счётчиков [`HubMetrics`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub published: u64,
    pub publish_failures: u64,
    pub received: u64,
    pub handled: u64,
    pub handler_failures: u64,
    pub retries: u64,
    pub exhausted: u64,
    pub driver_errors: u64,
}

impl HubMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_handled(&self) {
        self.handled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_handler_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Сообщение брошено после исчерпания времени ретраев.
    pub fn record_exhausted(&self) {
        self.exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_driver_error(&self) {
        self.driver_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            handled: self.handled.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
            driver_errors: self.driver_errors.load(Ordering::Relaxed),
        }
    }
}
