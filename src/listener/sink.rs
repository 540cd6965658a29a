use streamhub_error::{ErrorExt, HandlerError};
use tracing::error;

/// Получатель ошибок обработчиков, исчерпавших ретраи.
///
/// Вызывается из воркера синхронно, поэтому не должен блокироваться
/// надолго. Замыкания `Fn(&HandlerError)` реализуют трейт автоматически.
pub trait ErrorSink: Send + Sync {
    fn report(
        &self,
        error: &HandlerError,
    );
}

/// Sink по умолчанию: пишет событие уровня `error` в `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn report(
        &self,
        err: &HandlerError,
    ) {
        error!(
            stream = %err.stream,
            group = %err.group,
            message_id = %err.message_id,
            attempts = err.attempts,
            elapsed_ms = err.elapsed.as_millis() as u64,
            status = %err.status_code(),
            error = %err.source,
            "listener gave up on message"
        );
    }
}

impl<F> ErrorSink for F
where
    F: Fn(&HandlerError) + Send + Sync,
{
    fn report(
        &self,
        error: &HandlerError,
    ) {
        self(error)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use parking_lot::Mutex;

    use super::*;

    fn handler_error() -> HandlerError {
        HandlerError {
            stream: "orders".to_string(),
            group: "billing".to_string(),
            message_id: "m-1".to_string(),
            attempts: 3,
            elapsed: Duration::from_secs(2),
            source: "boom".into(),
        }
    }

    #[test]
    fn test_closure_sink_receives_error() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |err: &HandlerError| seen.lock().push(err.message_id.clone())
        };

        sink.report(&handler_error());
        assert_eq!(*seen.lock(), vec!["m-1".to_string()]);
    }

    #[test]
    fn test_log_sink_does_not_panic() {
        LogErrorSink.report(&handler_error());
    }
}
