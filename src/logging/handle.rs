use tracing_appender::non_blocking::WorkerGuard;

/// Хэндл инициализированного логирования.
///
/// Держит guard неблокирующего файлового writer'а: пока хэндл жив, события
/// пишутся в фоне, при сбросе буфер дописывается на диск.
#[derive(Debug)]
pub struct LoggingHandle {
    file_guard: Option<WorkerGuard>,
}

impl LoggingHandle {
    pub fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self { file_guard }
    }

    pub fn has_file_sink(&self) -> bool {
        self.file_guard.is_some()
    }

    /// Явно завершает логирование, дописывая буферы.
    pub fn shutdown(mut self) {
        tracing::debug!(file_sink = self.has_file_sink(), "logging shutdown");
        drop(self.file_guard.take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_without_file_sink() {
        let handle = LoggingHandle::new(None);
        assert!(!handle.has_file_sink());
        handle.shutdown();
    }

    #[test]
    fn test_handle_with_file_sink() {
        let (_writer, guard) = tracing_appender::non_blocking(std::io::sink());
        let handle = LoggingHandle::new(Some(guard));
        assert!(handle.has_file_sink());
        handle.shutdown();
    }
}
