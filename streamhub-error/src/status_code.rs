use std::fmt;

use num_enum::TryFromPrimitive;

/// Коды статуса для категоризации ошибок.
///
/// # Диапазоны:
/// - 0xxx: Успех
/// - 1xxx: Общие ошибки
/// - 2xxx: Ошибки реестров (потоки, схемы)
/// - 5xxx: Кодеки и генерация идентификаторов
/// - 6xxx: Транспорт / IO
/// - 9xxx: Ошибки потребителей (обработчики, ретраи)
///
/// `num_enum::TryFromPrimitive` даёт нативную реализацию `TryFrom<u32>`,
/// что удобно при передаче кода через метрики или внешний транспорт.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 0xxx: Успех ===
    Success = 0,

    // === 1xxx: Общие ошибки ===
    Unknown = 1000,
    Unsupported = 1001,
    Unexpected = 1002,
    Internal = 1003,
    InvalidArgs = 1004,
    NotImplemented = 1005,

    // === 2xxx: Реестры ===
    NotFound = 2000,
    AlreadyExists = 2001,
    StreamNotRegistered = 2002,
    SchemaNotFound = 2003,
    InvalidData = 2004,

    // === 5xxx: Кодеки ===
    SerializationFailed = 5000,
    DeserializationFailed = 5001,
    IdGenerationFailed = 5002,

    // === 6xxx: Транспорт/IO ===
    Io = 6000,
    ConnectionClosed = 6001,
    Timeout = 6002,
    TransportFailed = 6003,

    // === 9xxx: Потребители ===
    HandlerFailed = 9000,
    RetryExhausted = 9001,
    Cancelled = 9002,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Пытается получить вариант `StatusCode` из `u32`.
    ///
    /// Возвращает `None`, если значение не соответствует ни одному варианту.
    pub fn from_u32(v: u32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// Возвращает `true`, если операцию имеет смысл повторить.
    ///
    /// Ядро само публикацию не повторяет: этот признак нужен вызывающему
    /// коду, который решает, делать ли повторную попытку.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::ConnectionClosed | Self::TransportFailed | Self::HandlerFailed
        )
    }

    /// Вернёт `true`, если переданный `code` означает успешный результат.
    pub fn is_success(code: u32) -> bool {
        Self::Success as u32 == code
    }

    /// Ошибка конфигурации со стороны приложения: незарегистрированный
    /// поток, отсутствующая схема, некорректные данные (диапазон 2xxx).
    pub fn is_client_error(&self) -> bool {
        (2000..=2999).contains(&self.code()) || matches!(self, Self::InvalidArgs)
    }

    /// Внутренняя или инфраструктурная ошибка (диапазоны `1xxx`, `5xxx..6xxx`).
    pub fn is_server_error(&self) -> bool {
        matches!(self.code(), 1000..=1999 | 5000..=6999)
    }

    /// Ошибка на стороне потребителя (диапазон 9xxx).
    pub fn is_consumer_error(&self) -> bool {
        (9000..=9999).contains(&self.code())
    }

    /// Требуется ли логировать как критическую ошибку.
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::Internal | Self::Unexpected)
    }

    /// Рекомендуемый уровень логирования для данного кода.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Success => LogLevel::Trace,
            Self::NotFound | Self::AlreadyExists | Self::Cancelled => LogLevel::Debug,
            Self::InvalidArgs
            | Self::InvalidData
            | Self::StreamNotRegistered
            | Self::SchemaNotFound => LogLevel::Info,
            Self::Timeout | Self::ConnectionClosed | Self::HandlerFailed => LogLevel::Warn,
            Self::Internal | Self::Unexpected | Self::RetryExhausted => LogLevel::Error,
            _ => LogLevel::Warn,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
