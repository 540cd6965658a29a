//! Интерфейсы транспорта.
//!
//! Ядро не знает ничего о брокерах: исходящие сообщения уходят через
//! [`Writer`], входящие приходят через [`ListenerDriver`]. Эталонная
//! реализация обоих интерфейсов в памяти: [`memory::InMemoryBus`].

pub mod memory;

use async_trait::async_trait;
use streamhub_error::{DriverError, WriterError};

pub use memory::{InMemoryBus, DEFAULT_BUS_CAPACITY};

use crate::message::Message;

/// Исходящий транспорт.
#[async_trait]
pub trait Writer: Send + Sync {
    /// Передаёт готовый конверт транспорту.
    ///
    /// Отмена публикации выражается сбросом возвращённого future.
    async fn write(
        &self,
        message: Message,
    ) -> Result<(), WriterError>;
}

/// Входящий транспорт.
#[async_trait]
pub trait ListenerDriver: Send + Sync {
    /// Подготавливает подписку на пару (поток, группа) до запуска воркеров.
    fn prepare(
        &self,
        _stream: &str,
        _group: &str,
    ) -> Result<(), DriverError> {
        Ok(())
    }

    /// Ожидает следующее сообщение.
    ///
    /// `Ok(Some)`: сообщение для обработчика. `Ok(None)`: источник
    /// закрыт и воркер должен завершиться. `Err`: временная ошибка,
    /// после паузы воркер вызовет метод снова.
    async fn receive(
        &self,
        stream: &str,
        group: &str,
    ) -> Result<Option<Message>, DriverError>;
}

/// Писатель, который принимает и отбрасывает любые сообщения.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWriter;

/// Драйвер, который никогда не выдаёт сообщений. Воркеры на нём только
/// ждут остановки.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListenerDriver;

#[async_trait]
impl Writer for NoopWriter {
    async fn write(
        &self,
        message: Message,
    ) -> Result<(), WriterError> {
        tracing::trace!(stream = message.stream(), id = message.id(), "message discarded");
        Ok(())
    }
}

#[async_trait]
impl ListenerDriver for NoopListenerDriver {
    async fn receive(
        &self,
        _stream: &str,
        _group: &str,
    ) -> Result<Option<Message>, DriverError> {
        std::future::pending().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::message::NewMessageArgs;

    #[tokio::test]
    async fn test_noop_writer_accepts() {
        let msg = Message::new(NewMessageArgs {
            stream: "s".to_string(),
            ..Default::default()
        });
        assert!(NoopWriter.write(msg).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_noop_driver_never_yields() {
        let driver = NoopListenerDriver;
        assert!(driver.prepare("s", "g").is_ok());
        let res = tokio::time::timeout(Duration::from_secs(60), driver.receive("s", "g")).await;
        assert!(res.is_err());
    }
}
