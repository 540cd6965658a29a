use std::{any::Any, fmt};

use thiserror::Error;

use crate::{BoxError, ErrorExt, StatusCode};

/// Для ключа (типа сообщения или строкового ключа) не зарегистрирован поток.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no stream registered for key '{key}'")]
pub struct RegistryMissError {
    pub key: String,
}

/// Реестр схем не содержит определения с указанными именем и версией.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema definition '{name}' (version {version}) not found")]
pub struct SchemaNotFoundError {
    pub name: String,
    pub version: u32,
}

/// Направление работы кодека.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecDirection {
    Encode,
    Decode,
}

/// Ошибка кодирования/декодирования полезной нагрузки.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to {direction} '{content_type}' payload: {reason}")]
pub struct MarshalError {
    pub direction: CodecDirection,
    pub content_type: String,
    pub reason: String,
}

/// Фабрика идентификаторов не смогла выдать ID.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("message id generation failed: {reason}")]
pub struct IdFactoryError {
    pub reason: String,
}

/// Ошибка транспорта при записи сообщения. Оборачивает исходную ошибку
/// драйвера без изменений.
#[derive(Debug, Error)]
#[error("writer failed for stream '{stream}': {source}")]
pub struct WriterError {
    pub stream: String,
    #[source]
    pub source: BoxError,
}

/// Ошибки конвейера публикации. Ядро их не повторяет: решение о повторной
/// попытке остаётся за вызывающим кодом.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    RegistryMiss(#[from] RegistryMissError),
    #[error(transparent)]
    SchemaNotFound(#[from] SchemaNotFoundError),
    #[error(transparent)]
    Marshal(#[from] MarshalError),
    #[error(transparent)]
    IdFactory(#[from] IdFactoryError),
    #[error(transparent)]
    Writer(#[from] WriterError),
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl RegistryMissError {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl SchemaNotFoundError {
    pub fn new(
        name: impl Into<String>,
        version: u32,
    ) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl MarshalError {
    pub fn encode(
        content_type: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        Self {
            direction: CodecDirection::Encode,
            content_type: content_type.into(),
            reason: reason.to_string(),
        }
    }

    pub fn decode(
        content_type: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        Self {
            direction: CodecDirection::Decode,
            content_type: content_type.into(),
            reason: reason.to_string(),
        }
    }
}

impl IdFactoryError {
    pub fn new(reason: impl fmt::Display) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

impl WriterError {
    pub fn new(
        stream: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self {
            stream: stream.into(),
            source: source.into(),
        }
    }
}

impl PublishError {
    /// Имеет ли смысл повторить публикацию.
    pub fn is_retryable(&self) -> bool {
        self.status_code().is_retryable()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl fmt::Display for CodecDirection {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Encode => write!(f, "encode"),
            Self::Decode => write!(f, "decode"),
        }
    }
}

impl ErrorExt for RegistryMissError {
    fn status_code(&self) -> StatusCode {
        StatusCode::StreamNotRegistered
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ErrorExt for SchemaNotFoundError {
    fn status_code(&self) -> StatusCode {
        StatusCode::SchemaNotFound
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ErrorExt for MarshalError {
    fn status_code(&self) -> StatusCode {
        match self.direction {
            CodecDirection::Encode => StatusCode::SerializationFailed,
            CodecDirection::Decode => StatusCode::DeserializationFailed,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ErrorExt for IdFactoryError {
    fn status_code(&self) -> StatusCode {
        StatusCode::IdGenerationFailed
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ErrorExt for WriterError {
    fn status_code(&self) -> StatusCode {
        StatusCode::TransportFailed
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ErrorExt for PublishError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::RegistryMiss(e) => e.status_code(),
            Self::SchemaNotFound(e) => e.status_code(),
            Self::Marshal(e) => e.status_code(),
            Self::IdFactory(e) => e.status_code(),
            Self::Writer(e) => e.status_code(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "publish".to_string()),
            ("status_code", self.status_code().to_string()),
        ];

        match self {
            Self::RegistryMiss(e) => tags.push(("key", e.key.clone())),
            Self::SchemaNotFound(e) => {
                tags.push(("schema", e.name.clone()));
                tags.push(("schema_version", e.version.to_string()));
            }
            Self::Marshal(e) => tags.push(("content_type", e.content_type.clone())),
            Self::Writer(e) => tags.push(("stream", e.stream.clone())),
            Self::IdFactory(_) => {}
        }

        tags
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_registry_miss() {
        let err = PublishError::from(RegistryMissError::new("ncorp.wallet.tx.registered"));
        assert_eq!(err.status_code(), StatusCode::StreamNotRegistered);
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("ncorp.wallet.tx.registered"));
    }

    #[test]
    fn test_marshal_direction_codes() {
        let enc = MarshalError::encode("application/json", "boom");
        let dec = MarshalError::decode("application/json", "boom");
        assert_eq!(enc.status_code(), StatusCode::SerializationFailed);
        assert_eq!(dec.status_code(), StatusCode::DeserializationFailed);
        assert_eq!(
            enc.to_string(),
            "failed to encode 'application/json' payload: boom"
        );
    }

    /// Тест проверяет, что ошибка писателя сохраняет исходную ошибку
    /// драйвера и помечается как retryable.
    #[test]
    fn test_writer_error_keeps_source() {
        let err = PublishError::from(WriterError::new(
            "orders",
            io::Error::new(io::ErrorKind::BrokenPipe, "socket gone"),
        ));
        assert!(err.is_retryable());

        let PublishError::Writer(inner) = &err else {
            panic!("expected writer error");
        };
        let src = std::error::Error::source(inner).expect("source must be kept");
        assert_eq!(src.to_string(), "socket gone");

        let tags = err.metrics_tags();
        assert!(tags.iter().any(|(k, v)| *k == "stream" && v == "orders"));
    }

    #[test]
    fn test_schema_not_found_tags() {
        let err = PublishError::from(SchemaNotFoundError::new("tx", 3));
        let tags = err.metrics_tags();
        assert!(tags.iter().any(|(k, v)| *k == "schema_version" && v == "3"));
    }
}
