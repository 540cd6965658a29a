use std::time::Duration;

use tracing::warn;

pub const DEFAULT_RETRY_INITIAL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_RETRY_MAX_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_RETRY_TIMEOUT: Duration = Duration::from_secs(15);

/// Политика повторов обработчика для одного узла.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Пауза перед первым повтором.
    pub initial_interval: Duration,
    /// Верхняя граница паузы.
    pub max_interval: Duration,
    /// Сколько времени с первой неудачи сообщение ещё повторяется.
    pub timeout: Duration,
}

/// Экспоненциальная пауза: каждая следующая вдвое длиннее предыдущей, но
/// не больше `max_interval`.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
}

impl RetryPolicy {
    pub fn new(
        initial_interval: Duration,
        max_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            initial_interval,
            max_interval,
            timeout,
        }
    }

    /// Поднимает `max_interval` до `initial_interval`, если он меньше.
    pub fn normalized(
        mut self,
        stream: &str,
    ) -> Self {
        if self.max_interval < self.initial_interval {
            warn!(
                stream,
                initial_ms = self.initial_interval.as_millis() as u64,
                max_ms = self.max_interval.as_millis() as u64,
                "retry max interval is below initial interval, raising it"
            );
            self.max_interval = self.initial_interval;
        }
        self
    }

    pub fn backoff(&self) -> Backoff {
        Backoff {
            next: self.initial_interval,
            max: self.max_interval.max(self.initial_interval),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_RETRY_INITIAL_INTERVAL,
            DEFAULT_RETRY_MAX_INTERVAL,
            DEFAULT_RETRY_TIMEOUT,
        )
    }
}

impl Backoff {
    /// Возвращает очередную паузу и сдвигает последовательность.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = self.next.checked_mul(2).unwrap_or(self.max).min(self.max);
        delay
    }
}
