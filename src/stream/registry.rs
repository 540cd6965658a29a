use std::{any::TypeId, fmt, sync::Arc};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use streamhub_error::RegistryMissError;

/// Ключ записи в реестре потоков.
///
/// `Type` вычисляется один раз при регистрации из статического типа
/// сообщения, `Name` задаёт произвольную метку, выбранную вызывающим кодом.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamKey {
    Type { id: TypeId, name: &'static str },
    Name(Arc<str>),
}

/// Метаданные потока.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMetadata {
    /// Имя потока на транспорте.
    pub stream: String,
    /// Имя определения схемы в реестре схем.
    #[serde(default)]
    pub schema_definition: String,
    /// Версия схемы; `0` означает отсутствие версии.
    #[serde(default)]
    pub schema_version: u32,
}

/// Плоское отображение ключ → метаданные.
///
/// Повторная регистрация перезаписывает запись. Чтение безопасно из любого
/// числа задач; одновременные первичные записи сериализуются шардированными
/// блокировками `DashMap`.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    entries: DashMap<StreamKey, Arc<StreamMetadata>>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StreamKey {
    /// Ключ по статическому типу сообщения.
    pub fn of<T: 'static>() -> Self {
        Self::Type {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Ключ по строковой метке.
    pub fn named(key: impl AsRef<str>) -> Self {
        Self::Name(Arc::from(key.as_ref()))
    }
}

impl StreamMetadata {
    pub fn new(stream: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            ..Default::default()
        }
    }

    pub fn with_schema(
        mut self,
        definition: impl Into<String>,
        version: u32,
    ) -> Self {
        self.schema_definition = definition.into();
        self.schema_version = version;
        self
    }
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Регистрирует поток для типа сообщения `T`.
    pub fn set<T: 'static>(
        &self,
        metadata: StreamMetadata,
    ) {
        self.insert(StreamKey::of::<T>(), metadata);
    }

    /// Регистрирует поток для строкового ключа.
    pub fn set_by_string(
        &self,
        key: &str,
        metadata: StreamMetadata,
    ) {
        self.insert(StreamKey::named(key), metadata);
    }

    /// Возвращает метаданные для типа `T`.
    pub fn get<T: 'static>(&self) -> Result<Arc<StreamMetadata>, RegistryMissError> {
        self.get_key(&StreamKey::of::<T>())
    }

    /// Возвращает метаданные для строкового ключа.
    pub fn get_by_string(
        &self,
        key: &str,
    ) -> Result<Arc<StreamMetadata>, RegistryMissError> {
        self.get_key(&StreamKey::named(key))
    }

    pub fn get_key(
        &self,
        key: &StreamKey,
    ) -> Result<Arc<StreamMetadata>, RegistryMissError> {
        self.entries
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| RegistryMissError::new(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(
        &self,
        key: StreamKey,
        metadata: StreamMetadata,
    ) {
        tracing::debug!(key = %key, stream = %metadata.stream, "stream registered");
        self.entries.insert(key, Arc::new(metadata));
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl fmt::Display for StreamKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Type { name, .. } => f.write_str(name),
            Self::Name(key) => f.write_str(key),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    struct TxRegistered;
    struct TxReverted;

    #[test]
    fn test_set_and_get_by_type() {
        let registry = StreamRegistry::new();
        registry.set::<TxRegistered>(
            StreamMetadata::new("ncorp.wallet.tx.registered").with_schema("tx", 1),
        );

        let meta = registry.get::<TxRegistered>().unwrap();
        assert_eq!(meta.stream, "ncorp.wallet.tx.registered");
        assert_eq!(meta.schema_version, 1);

        let err = registry.get::<TxReverted>().unwrap_err();
        assert!(err.key.ends_with("TxReverted"));
    }

    #[test]
    fn test_set_and_get_by_string() {
        let registry = StreamRegistry::new();
        registry.set_by_string("tx-registered", StreamMetadata::new("wallet.tx"));

        assert_eq!(registry.get_by_string("tx-registered").unwrap().stream, "wallet.tx");
        assert_eq!(
            registry.get_by_string("missing").unwrap_err(),
            RegistryMissError::new("missing")
        );
    }

    /// Тест проверяет, что строковый ключ и тип не пересекаются даже при
    /// совпадении имени.
    #[test]
    fn test_type_and_string_keys_are_distinct() {
        let registry = StreamRegistry::new();
        registry.set::<TxRegistered>(StreamMetadata::new("by-type"));

        let type_name = std::any::type_name::<TxRegistered>();
        assert!(registry.get_by_string(type_name).is_err());
    }

    /// Тест проверяет, что повторная регистрация перезаписывает запись, а не
    /// объединяет её.
    #[test]
    fn test_reregistration_overwrites() {
        let registry = StreamRegistry::new();
        registry.set_by_string("k", StreamMetadata::new("a").with_schema("s", 1));
        registry.set_by_string("k", StreamMetadata::new("b"));

        let meta = registry.get_by_string("k").unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(*meta, StreamMetadata::new("b"));
    }

    #[test]
    fn test_concurrent_registration_and_lookup() {
        let registry = Arc::new(StreamRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let key = format!("key-{i}");
                    registry.set_by_string(&key, StreamMetadata::new(format!("stream-{i}")));
                    registry.get_by_string(&key).unwrap().stream.clone()
                })
            })
            .collect();

        for (i, h) in handles.into_iter().enumerate() {
            assert_eq!(h.join().unwrap(), format!("stream-{i}"));
        }
        assert_eq!(registry.len(), 8);
    }
}
