//! Сторона потребителя: узлы слушателей и их супервизор.
//!
//! Узел ([`ListenerNode`]) связывает поток, группу и обработчик с политикой
//! повторов и уровнем параллелизма. [`ListenerSupervisor`] хранит узлы и
//! запускает по `concurrency_level` воркеров на каждый из них.

pub mod node;
pub mod retry;
pub mod sink;
pub mod supervisor;

use std::future::Future;

use async_trait::async_trait;
use streamhub_error::BoxError;

pub use node::{ListenerNode, ListenerOptions, DEFAULT_CONCURRENCY_LEVEL, DEFAULT_GROUP};
pub use retry::{
    Backoff, RetryPolicy, DEFAULT_RETRY_INITIAL_INTERVAL, DEFAULT_RETRY_MAX_INTERVAL,
    DEFAULT_RETRY_TIMEOUT,
};
pub use sink::{ErrorSink, LogErrorSink};
pub use supervisor::{ListenerSupervisor, SupervisorConfig, SupervisorHandle};

use crate::{message::Message, shutdown::ShutdownToken};

/// Обработчик сообщений узла.
///
/// Ошибка запускает политику повторов узла. Супервизор не прерывает
/// обработчик посреди выполнения: долгий обработчик сам следит за `token`
/// и завершается, когда тот отменён. Асинхронные замыкания
/// `Fn(ShutdownToken, Message) -> impl Future<Output = Result<(), BoxError>>`
/// реализуют трейт автоматически.
#[async_trait]
pub trait Listener: Send + Sync {
    async fn on_message(
        &self,
        token: &ShutdownToken,
        message: Message,
    ) -> Result<(), BoxError>;
}

#[async_trait]
impl<F, Fut> Listener for F
where
    F: Fn(ShutdownToken, Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    async fn on_message(
        &self,
        token: &ShutdownToken,
        message: Message,
    ) -> Result<(), BoxError> {
        self(token.clone(), message).await
    }
}

/// Обработчик по умолчанию: подтверждает любое сообщение.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

#[async_trait]
impl Listener for NoopListener {
    async fn on_message(
        &self,
        _token: &ShutdownToken,
        message: Message,
    ) -> Result<(), BoxError> {
        tracing::trace!(stream = message.stream(), id = message.id(), "message ignored by noop listener");
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::NewMessageArgs;

    fn msg() -> Message {
        Message::new(NewMessageArgs {
            id: "1".to_string(),
            stream: "orders".to_string(),
            ..Default::default()
        })
    }

    /// Тест проверяет, что замыкание получает токен отмены и видит его
    /// состояние.
    #[tokio::test]
    async fn test_closure_listener_sees_cancellation() {
        let listener = |token: ShutdownToken, _msg: Message| async move {
            if token.is_cancelled() {
                return Err::<(), BoxError>("cancelled".into());
            }
            Ok(())
        };

        let token = ShutdownToken::new();
        assert!(listener.on_message(&token, msg()).await.is_ok());

        token.cancel();
        let err = listener.on_message(&token, msg()).await.unwrap_err();
        assert_eq!(err.to_string(), "cancelled");
    }

    #[tokio::test]
    async fn test_noop_listener_acks() {
        let token = ShutdownToken::new();
        assert!(NoopListener.on_message(&token, msg()).await.is_ok());
    }
}
