use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use streamhub_error::{DecodeError, PublishError, RegistryMissError};
use tracing::{debug, warn};

use super::HubBuilder;
use crate::{
    codec::{Marshaler, MarshalerExt, SchemaRegistry},
    driver::Writer,
    id::IdFactory,
    listener::{ListenerOptions, ListenerSupervisor, SupervisorHandle},
    message::{Message, NewMessageArgs},
    metrics::HubMetrics,
    shutdown::ShutdownToken,
    stream::{StreamKey, StreamMetadata, StreamRegistry},
};

/// Хаб публикации и подписки.
///
/// Публикация проходит строго упорядоченный конвейер: метаданные потока →
/// схема (если настроен реестр) → кодирование → ID → конверт → писатель.
/// Первая же ошибка прерывает конвейер и возвращается вызывающему коду;
/// хаб публикации не повторяет.
///
/// Регистрация потоков и узлов рассчитана на фазу запуска. Изменения после
/// [`Hub::start`] на уже запущенные воркеры не влияют.
pub struct Hub {
    pub(super) instance_name: String,
    pub(super) registry: StreamRegistry,
    pub(super) marshaler: Arc<dyn Marshaler>,
    pub(super) schema_registry: Option<Arc<dyn SchemaRegistry>>,
    pub(super) id_factory: Arc<dyn IdFactory>,
    pub(super) writer: Arc<dyn Writer>,
    pub(super) supervisor: ListenerSupervisor,
    pub(super) metrics: Arc<HubMetrics>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Hub {
    /// Хаб со всеми коллабораторами по умолчанию.
    pub fn new() -> Self {
        HubBuilder::new().build()
    }

    pub fn builder() -> HubBuilder {
        HubBuilder::new()
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    pub fn registry(&self) -> &StreamRegistry {
        &self.registry
    }

    pub fn supervisor(&self) -> &ListenerSupervisor {
        &self.supervisor
    }

    pub fn metrics(&self) -> &Arc<HubMetrics> {
        &self.metrics
    }

    pub fn marshaler(&self) -> &Arc<dyn Marshaler> {
        &self.marshaler
    }

    /// Связывает тип сообщения `T` с потоком.
    pub fn register_stream<T: 'static>(
        &self,
        metadata: StreamMetadata,
    ) {
        self.registry.set::<T>(metadata);
    }

    /// Связывает строковый ключ с потоком.
    pub fn register_stream_by_string(
        &self,
        key: &str,
        metadata: StreamMetadata,
    ) {
        self.registry.set_by_string(key, metadata);
    }

    /// Публикует значение в поток, зарегистрированный для его типа.
    ///
    /// Если тип не зарегистрирован, возвращает
    /// [`PublishError::RegistryMiss`], не трогая ни кодек, ни писатель.
    pub async fn publish<T>(
        &self,
        message: &T,
    ) -> Result<(), PublishError>
    where
        T: Serialize + Sync + 'static,
    {
        let result = match self.registry.get::<T>() {
            Ok(metadata) => self.publish_message(&metadata, message).await,
            Err(err) => Err(err.into()),
        };
        self.track_publish(result)
    }

    /// Публикует значение в поток, зарегистрированный под строковым ключом.
    pub async fn publish_by_key<T>(
        &self,
        key: &str,
        message: &T,
    ) -> Result<(), PublishError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let result = match self.registry.get_by_string(key) {
            Ok(metadata) => self.publish_message(&metadata, message).await,
            Err(err) => Err(err.into()),
        };
        self.track_publish(result)
    }

    /// Передаёт готовый конверт писателю, минуя реестр и кодек.
    pub async fn publish_raw(
        &self,
        message: Message,
    ) -> Result<(), PublishError> {
        let result = self.writer.write(message).await.map_err(PublishError::from);
        self.track_publish(result)
    }

    /// Декодирует полезную нагрузку конверта кодеком хаба.
    ///
    /// Если настроен реестр схем и конверт несёт `dataschema`, текст схемы
    /// берётся из реестра; иначе схема пустая.
    pub async fn decode<T: DeserializeOwned>(
        &self,
        message: &Message,
    ) -> Result<T, DecodeError> {
        let schema = match &self.schema_registry {
            Some(registry) if !message.data_schema().is_empty() => Some(
                registry
                    .get_schema_definition(message.data_schema(), message.data_schema_version())
                    .await?,
            ),
            _ => None,
        };

        let value = self
            .marshaler
            .decode(schema.as_deref().unwrap_or(""), message.data())?;
        Ok(value)
    }

    /// Регистрирует узел слушателя для потока типа `T`.
    pub fn listen<T: 'static>(
        &self,
        opts: ListenerOptions,
    ) -> Result<(), RegistryMissError> {
        self.listen_by_stream_key(&StreamKey::of::<T>(), opts)
    }

    /// Регистрирует узел слушателя для потока строкового ключа.
    pub fn listen_by_key(
        &self,
        key: &str,
        opts: ListenerOptions,
    ) -> Result<(), RegistryMissError> {
        self.listen_by_stream_key(&StreamKey::named(key), opts)
    }

    /// Регистрирует узел слушателя прямо по имени потока, без реестра.
    pub fn listen_stream(
        &self,
        stream: &str,
        opts: ListenerOptions,
    ) {
        self.supervisor.fork_node(stream, opts);
    }

    /// Запускает воркеры всех зарегистрированных узлов.
    pub fn start(
        &self,
        token: &ShutdownToken,
    ) -> SupervisorHandle {
        self.supervisor.start_nodes(token)
    }

    fn listen_by_stream_key(
        &self,
        key: &StreamKey,
        opts: ListenerOptions,
    ) -> Result<(), RegistryMissError> {
        let metadata = self.registry.get_key(key)?;
        self.supervisor.fork_node(&metadata.stream, opts);
        Ok(())
    }

    async fn publish_message<T>(
        &self,
        metadata: &StreamMetadata,
        message: &T,
    ) -> Result<(), PublishError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let schema = match &self.schema_registry {
            Some(registry) => Some(
                registry
                    .get_schema_definition(&metadata.schema_definition, metadata.schema_version)
                    .await?,
            ),
            None => None,
        };

        let data = self
            .marshaler
            .encode(schema.as_deref().unwrap_or(""), message)?;
        let id = self.id_factory.generate()?;

        let envelope = Message::new(NewMessageArgs {
            schema_version: metadata.schema_version,
            data,
            id,
            source: self.instance_name.clone(),
            stream: metadata.stream.clone(),
            schema_definition_name: metadata.schema_definition.clone(),
            content_type: self.marshaler.content_type().to_string(),
            ..Default::default()
        });

        debug!(
            stream = envelope.stream(),
            id = envelope.id(),
            message_type = envelope.message_type(),
            "publishing message"
        );
        self.writer.write(envelope).await?;
        Ok(())
    }

    fn track_publish(
        &self,
        result: Result<(), PublishError>,
    ) -> Result<(), PublishError> {
        match &result {
            Ok(()) => self.metrics.record_published(),
            Err(err) => {
                self.metrics.record_publish_failure();
                warn!(error = %err, "publish failed");
            }
        }
        result
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
