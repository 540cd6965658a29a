use std::{any::Any, time::Duration};

use thiserror::Error;

use crate::{BoxError, ErrorExt, MarshalError, SchemaNotFoundError, StatusCode};

/// Обработчик не справился с сообщением за отведённое время ретраев.
///
/// Попадает в error sink узла; воркер после этого переходит к следующему
/// сообщению.
#[derive(Debug, Error)]
#[error(
    "listener for stream '{stream}' (group '{group}') gave up after {attempts} attempt(s) in {elapsed:?}: {source}"
)]
pub struct HandlerError {
    pub stream: String,
    pub group: String,
    pub message_id: String,
    pub attempts: u32,
    pub elapsed: Duration,
    #[source]
    pub source: BoxError,
}

/// Ошибки драйвера входящих сообщений.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// Не удалось подготовить подписку для пары (поток, группа).
    #[error("failed to prepare subscription on stream '{stream}' (group '{group}'): {reason}")]
    Prepare {
        stream: String,
        group: String,
        reason: String,
    },
    /// Ошибка получения очередного сообщения.
    #[error("failed to receive from stream '{stream}' (group '{group}'): {reason}")]
    Receive {
        stream: String,
        group: String,
        reason: String,
    },
}

/// Не удалось восстановить типизированное значение из конверта.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error(transparent)]
    SchemaNotFound(#[from] SchemaNotFoundError),
    #[error(transparent)]
    Marshal(#[from] MarshalError),
}

impl ErrorExt for HandlerError {
    fn status_code(&self) -> StatusCode {
        StatusCode::RetryExhausted
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        vec![
            ("error_type", "listener".to_string()),
            ("status_code", self.status_code().to_string()),
            ("stream", self.stream.clone()),
            ("group", self.group.clone()),
            ("attempts", self.attempts.to_string()),
        ]
    }
}

impl ErrorExt for DriverError {
    fn status_code(&self) -> StatusCode {
        StatusCode::TransportFailed
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ErrorExt for DecodeError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::SchemaNotFound(e) => e.status_code(),
            Self::Marshal(e) => e.status_code(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
