use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::RwLock;
use streamhub_error::HandlerError;
use tokio::{task::JoinSet, time::Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::{
    node::{ListenerNode, ListenerOptions, DEFAULT_CONCURRENCY_LEVEL, DEFAULT_GROUP},
    ErrorSink, Listener, LogErrorSink, NoopListener, RetryPolicy,
};
use crate::{
    driver::{ListenerDriver, NoopListenerDriver},
    message::Message,
    metrics::HubMetrics,
    shutdown::ShutdownToken,
};

/// Умолчания супервизора, которые получает каждый новый узел.
#[derive(Clone)]
pub struct SupervisorConfig {
    pub group: String,
    pub concurrency_level: usize,
    pub retry: RetryPolicy,
    pub driver: Arc<dyn ListenerDriver>,
    pub listener: Arc<dyn Listener>,
    pub error_sink: Arc<dyn ErrorSink>,
}

/// Реестр узлов и запуск их воркеров.
pub struct ListenerSupervisor {
    config: SupervisorConfig,
    nodes: RwLock<Vec<Arc<ListenerNode>>>,
    metrics: Arc<HubMetrics>,
    started: AtomicBool,
}

/// Запущенные воркеры супервизора.
///
/// Сброс хэндла не останавливает воркеры: они отсоединяются и работают до
/// отмены токена, переданного в [`ListenerSupervisor::start_nodes`]. Чтобы
/// дождаться их завершения, вызовите [`wait`] или [`shutdown`].
///
/// [`wait`]: SupervisorHandle::wait
/// [`shutdown`]: SupervisorHandle::shutdown
#[derive(Debug)]
#[must_use = "dropping the handle detaches the workers; cancel the token to stop them"]
pub struct SupervisorHandle {
    workers: JoinSet<()>,
    worker_count: usize,
}

/// Итог обработки одного сообщения воркером.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    Handled,
    GaveUp,
    Cancelled,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl ListenerSupervisor {
    pub fn new(
        config: SupervisorConfig,
        metrics: Arc<HubMetrics>,
    ) -> Self {
        Self {
            config,
            nodes: RwLock::new(Vec::new()),
            metrics,
            started: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Добавляет узел для потока `stream`.
    ///
    /// Пустое имя потока ничего не регистрирует. На один поток можно
    /// добавить несколько узлов (разные обработчики или группы).
    pub fn fork_node(
        &self,
        stream: &str,
        opts: ListenerOptions,
    ) {
        if stream.is_empty() {
            return;
        }

        let node = ListenerNode::compose(stream, &self.config, opts);
        debug!(
            stream,
            group = node.group(),
            concurrency = node.concurrency_level(),
            "listener node registered"
        );
        self.nodes.write().push(Arc::new(node));
    }

    /// Снимок зарегистрированных узлов.
    pub fn nodes(&self) -> Vec<Arc<ListenerNode>> {
        self.nodes.read().clone()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    /// Были ли уже запущены воркеры.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    /// Запускает `concurrency_level` воркеров на каждый узел.
    ///
    /// Перед запуском воркеров узла вызывается `prepare` его драйвера; при
    /// ошибке узел пропускается, остальные запускаются как обычно. Должен
    /// вызываться внутри runtime tokio.
    ///
    /// Супервизор запускается один раз: повторный вызов ничего не запускает
    /// и возвращает пустой хэндл.
    pub fn start_nodes(
        &self,
        token: &ShutdownToken,
    ) -> SupervisorHandle {
        let mut workers = JoinSet::new();
        if self.started.swap(true, Ordering::AcqRel) {
            warn!("listener supervisor already started, ignoring");
            return SupervisorHandle {
                workers,
                worker_count: 0,
            };
        }

        let nodes = self.nodes();

        for node in &nodes {
            if let Err(err) = node.driver().prepare(node.stream(), node.group()) {
                self.metrics.record_driver_error();
                error!(
                    stream = node.stream(),
                    group = node.group(),
                    error = %err,
                    "failed to prepare listener node, skipping"
                );
                continue;
            }

            for worker in 0..node.concurrency_level() {
                let span = info_span!(
                    "listener",
                    stream = node.stream(),
                    group = node.group(),
                    worker
                );
                workers.spawn(
                    run_worker(Arc::clone(node), token.clone(), Arc::clone(&self.metrics))
                        .instrument(span),
                );
            }
        }

        let worker_count = workers.len();
        info!(nodes = nodes.len(), workers = worker_count, "listener supervisor started");

        SupervisorHandle {
            workers,
            worker_count,
        }
    }
}

impl SupervisorHandle {
    /// Число запущенных воркеров.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Ждёт завершения всех воркеров.
    pub async fn wait(mut self) {
        while let Some(res) = self.workers.join_next().await {
            if let Err(err) = res {
                if err.is_panic() {
                    error!(error = %err, "listener worker panicked");
                }
            }
        }
        info!(workers = self.worker_count, "listener supervisor stopped");
    }

    /// Отменяет токен и ждёт завершения всех воркеров.
    pub async fn shutdown(
        self,
        token: &ShutdownToken,
    ) {
        token.cancel();
        self.wait().await;
    }
}

////////////////////////////////////////////////////////////////////////////////
// Цикл воркера
////////////////////////////////////////////////////////////////////////////////

async fn run_worker(
    node: Arc<ListenerNode>,
    token: ShutdownToken,
    metrics: Arc<HubMetrics>,
) {
    debug!("listener worker started");

    while !token.is_cancelled() {
        let received = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            res = node.driver().receive(node.stream(), node.group()) => res,
        };

        match received {
            Ok(Some(message)) => {
                metrics.record_received();
                if dispatch(&node, message, &token, &metrics).await == Dispatch::Cancelled {
                    break;
                }
            }
            Ok(None) => {
                debug!("message source closed");
                break;
            }
            Err(err) => {
                metrics.record_driver_error();
                warn!(error = %err, "receive failed");
                if !sleep_or_cancel(node.retry().initial_interval, &token).await {
                    break;
                }
            }
        }
    }

    debug!("listener worker stopped");
}

/// Вызывает обработчик с повторами по политике узла.
async fn dispatch(
    node: &ListenerNode,
    message: Message,
    token: &ShutdownToken,
    metrics: &HubMetrics,
) -> Dispatch {
    let retry = node.retry();
    let mut backoff = retry.backoff();
    let mut first_failure: Option<Instant> = None;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let err = match node.listener().on_message(token, message.clone()).await {
            Ok(()) => {
                metrics.record_handled();
                return Dispatch::Handled;
            }
            Err(err) => err,
        };
        metrics.record_handler_failure();

        let elapsed = first_failure.get_or_insert_with(Instant::now).elapsed();
        if elapsed >= retry.timeout {
            metrics.record_exhausted();
            node.error_sink().report(&HandlerError {
                stream: node.stream().to_string(),
                group: node.group().to_string(),
                message_id: message.id().to_string(),
                attempts,
                elapsed,
                source: err,
            });
            return Dispatch::GaveUp;
        }

        if token.is_cancelled() {
            warn!(message_id = message.id(), attempts, "shutdown requested, message abandoned");
            return Dispatch::Cancelled;
        }

        let delay = backoff.next_delay();
        warn!(
            message_id = message.id(),
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "listener failed, retrying"
        );

        if !sleep_or_cancel(delay, token).await {
            warn!(message_id = message.id(), attempts, "shutdown requested, message abandoned");
            return Dispatch::Cancelled;
        }
        metrics.record_retry();
    }
}

/// Спит `delay`; возвращает `false`, если за это время пришла отмена.
async fn sleep_or_cancel(
    delay: Duration,
    token: &ShutdownToken,
) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl Drop for SupervisorHandle {
    fn drop(&mut self) {
        // Останавливает воркеры только токен.
        self.workers.detach_all();
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            group: DEFAULT_GROUP.to_string(),
            concurrency_level: DEFAULT_CONCURRENCY_LEVEL,
            retry: RetryPolicy::default(),
            driver: Arc::new(NoopListenerDriver),
            listener: Arc::new(NoopListener),
            error_sink: Arc::new(LogErrorSink),
        }
    }
}

impl fmt::Debug for SupervisorConfig {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("SupervisorConfig")
            .field("group", &self.group)
            .field("concurrency_level", &self.concurrency_level)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for ListenerSupervisor {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ListenerSupervisor")
            .field("config", &self.config)
            .field("nodes", &self.len())
            .field("started", &self.is_started())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn supervisor() -> ListenerSupervisor {
        ListenerSupervisor::new(SupervisorConfig::default(), Arc::new(HubMetrics::new()))
    }

    #[test]
    fn test_fork_empty_stream_is_noop() {
        let sup = supervisor();
        sup.fork_node("", ListenerOptions::new());
        assert!(sup.is_empty());
    }

    #[test]
    fn test_fork_node_keeps_previous_nodes() {
        let sup = supervisor();
        sup.fork_node("foo", ListenerOptions::new());
        sup.fork_node("foo", ListenerOptions::new().group("audit"));

        let nodes = sup.nodes();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].group(), DEFAULT_GROUP);
        assert_eq!(nodes[1].group(), "audit");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_or_cancel() {
        let token = ShutdownToken::new();
        assert!(sleep_or_cancel(Duration::from_secs(1), &token).await);

        token.cancel();
        assert!(!sleep_or_cancel(Duration::from_secs(3600), &token).await);
    }

    /// Тест проверяет, что воркер на драйвере без сообщений завершается по
    /// отмене.
    #[tokio::test]
    async fn test_start_and_shutdown_noop_nodes() {
        let sup = supervisor();
        sup.fork_node("a", ListenerOptions::new().concurrency_level(2));
        sup.fork_node("b", ListenerOptions::new());

        let token = ShutdownToken::new();
        let handle = sup.start_nodes(&token);
        assert_eq!(handle.worker_count(), 3);

        tokio::time::timeout(Duration::from_secs(5), handle.shutdown(&token))
            .await
            .unwrap();
    }

    /// Тест проверяет, что повторный запуск не порождает второй набор
    /// воркеров.
    #[tokio::test]
    async fn test_start_nodes_twice_spawns_once() {
        let sup = supervisor();
        sup.fork_node("a", ListenerOptions::new().concurrency_level(2));

        let token = ShutdownToken::new();
        let first = sup.start_nodes(&token);
        let second = sup.start_nodes(&token);

        assert!(sup.is_started());
        assert_eq!(first.worker_count(), 2);
        assert_eq!(second.worker_count(), 0);

        second.wait().await;
        tokio::time::timeout(Duration::from_secs(5), first.shutdown(&token))
            .await
            .unwrap();
    }
}
