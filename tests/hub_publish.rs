use std::{
    collections::HashSet,
    io,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use streamhub::{
    Hub, IdFactoryError, InMemorySchemaRegistry, JsonMarshaler, MarshalError, Marshaler, Message,
    NewMessageArgs, PublishError, SchemaRegistry, StatusCode, StreamMetadata, Writer, WriterError,
};
use streamhub_error::ErrorExt;

#[derive(Debug, Serialize)]
struct TxRegistered {
    #[serde(rename = "TxID")]
    tx_id: String,
    #[serde(rename = "Amount")]
    amount: f64,
}

#[derive(Debug, Serialize)]
struct NeverRegistered {
    id: u32,
}

/// Писатель, запоминающий всё, что ему передали.
#[derive(Default)]
struct RecordingWriter {
    messages: Mutex<Vec<Message>>,
}

#[async_trait]
impl Writer for RecordingWriter {
    async fn write(
        &self,
        message: Message,
    ) -> Result<(), WriterError> {
        self.messages.lock().push(message);
        Ok(())
    }
}

struct FailingWriter;

#[async_trait]
impl Writer for FailingWriter {
    async fn write(
        &self,
        message: Message,
    ) -> Result<(), WriterError> {
        Err(WriterError::new(
            message.stream(),
            io::Error::new(io::ErrorKind::ConnectionReset, "broker connection reset"),
        ))
    }
}

/// JSON-кодек со счётчиком вызовов.
#[derive(Default)]
struct CountingMarshaler {
    calls: AtomicUsize,
}

impl Marshaler for CountingMarshaler {
    fn marshal(
        &self,
        schema: &str,
        value: &Value,
    ) -> Result<Bytes, MarshalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        JsonMarshaler.marshal(schema, value)
    }

    fn unmarshal(
        &self,
        schema: &str,
        data: &[u8],
    ) -> Result<Value, MarshalError> {
        JsonMarshaler.unmarshal(schema, data)
    }

    fn content_type(&self) -> &str {
        "application/json"
    }
}

fn tx() -> TxRegistered {
    TxRegistered {
        tx_id: "1".to_string(),
        amount: 99.99,
    }
}

/// Тест проверяет, что публикация незарегистрированного типа не трогает ни
/// кодек, ни писатель.
#[tokio::test]
async fn test_unregistered_publish_has_no_side_effects() {
    let writer = Arc::new(RecordingWriter::default());
    let marshaler = Arc::new(CountingMarshaler::default());
    let hub = Hub::builder()
        .writer(writer.clone())
        .marshaler(marshaler.clone())
        .build();

    let err = hub.publish(&NeverRegistered { id: 1 }).await.unwrap_err();

    assert!(matches!(err, PublishError::RegistryMiss(_)));
    assert_eq!(err.status_code(), StatusCode::StreamNotRegistered);
    assert_eq!(marshaler.calls.load(Ordering::SeqCst), 0);
    assert!(writer.messages.lock().is_empty());
}

#[tokio::test]
async fn test_unregistered_key_has_no_side_effects() {
    let writer = Arc::new(RecordingWriter::default());
    let hub = Hub::builder().writer(writer.clone()).build();

    let err = hub.publish_by_key("missing", &tx()).await.unwrap_err();
    assert!(matches!(err, PublishError::RegistryMiss(ref e) if e.key == "missing"));
    assert!(writer.messages.lock().is_empty());
}

/// Тест проверяет 1000 одновременных публикаций: у каждой свой непустой ID
/// и каждая доходит до писателя ровно один раз.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_publishes_get_distinct_ids() {
    let writer = Arc::new(RecordingWriter::default());
    let hub = Arc::new(Hub::builder().writer(writer.clone()).build());
    hub.register_stream::<TxRegistered>(StreamMetadata::new("ncorp.wallet.tx.registered"));

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..1000 {
        let hub = Arc::clone(&hub);
        tasks.spawn(async move {
            let msg = TxRegistered {
                tx_id: i.to_string(),
                amount: 1.0,
            };
            hub.publish(&msg).await
        });
    }
    while let Some(res) = tasks.join_next().await {
        res.unwrap().unwrap();
    }

    let messages = writer.messages.lock();
    assert_eq!(messages.len(), 1000);
    let ids: HashSet<&str> = messages.iter().map(Message::id).collect();
    assert_eq!(ids.len(), 1000);
    assert!(ids.iter().all(|id| !id.is_empty()));
    assert_eq!(hub.metrics().published(), 1000);
}

/// Тест проверяет поля конверта, которые проставляет конвейер.
#[tokio::test]
async fn test_envelope_fields() {
    let writer = Arc::new(RecordingWriter::default());
    let hub = Hub::builder()
        .instance_name("ncorp")
        .writer(writer.clone())
        .id_factory(Arc::new(|| -> Result<String, IdFactoryError> { Ok("fixed-id".to_string()) }))
        .build();
    hub.register_stream::<TxRegistered>(
        StreamMetadata::new("ncorp.wallet.tx.registered").with_schema("tx", 3),
    );

    hub.publish(&tx()).await.unwrap();

    let messages = writer.messages.lock();
    let msg = &messages[0];
    assert_eq!(msg.id(), "fixed-id");
    assert_eq!(msg.source(), "ncorp");
    assert_eq!(msg.stream(), "ncorp.wallet.tx.registered");
    assert_eq!(msg.message_type(), "ncorp.wallet.tx.registered.v3");
    assert_eq!(msg.data_content_type(), "application/json");
    assert_eq!(msg.data_schema(), "tx");
    assert_eq!(msg.data_schema_version(), 3);
    assert_eq!(msg.spec_version(), "1.0");
}

/// Тест проверяет, что отсутствие схемы останавливает конвейер до кодека.
#[tokio::test]
async fn test_missing_schema_short_circuits() {
    let writer = Arc::new(RecordingWriter::default());
    let marshaler = Arc::new(CountingMarshaler::default());
    let schemas = Arc::new(InMemorySchemaRegistry::new());
    schemas.register_definition("tx", "{}", 1).await;

    let hub = Hub::builder()
        .writer(writer.clone())
        .marshaler(marshaler.clone())
        .schema_registry(schemas)
        .build();
    hub.register_stream::<TxRegistered>(StreamMetadata::new("tx").with_schema("tx", 2));

    let err = hub.publish(&tx()).await.unwrap_err();
    assert!(matches!(err, PublishError::SchemaNotFound(ref e) if e.version == 2));
    assert_eq!(marshaler.calls.load(Ordering::SeqCst), 0);
    assert!(writer.messages.lock().is_empty());
}

#[tokio::test]
async fn test_id_factory_failure_short_circuits() {
    let writer = Arc::new(RecordingWriter::default());
    let hub = Hub::builder()
        .writer(writer.clone())
        .id_factory(Arc::new(|| -> Result<String, IdFactoryError> {
            Err(IdFactoryError::new("clock went backwards"))
        }))
        .build();
    hub.register_stream::<TxRegistered>(StreamMetadata::new("tx"));

    let err = hub.publish(&tx()).await.unwrap_err();
    assert!(matches!(err, PublishError::IdFactory(_)));
    assert!(writer.messages.lock().is_empty());
    assert_eq!(hub.metrics().snapshot().publish_failures, 1);
}

/// Тест проверяет, что ошибка писателя приходит вызывающему коду вместе с
/// исходной ошибкой транспорта.
#[tokio::test]
async fn test_writer_error_is_propagated_verbatim() {
    let hub = Hub::builder().writer(Arc::new(FailingWriter)).build();
    hub.register_stream_by_string("tx", StreamMetadata::new("ncorp.tx"));

    let err = hub.publish_by_key("tx", &tx()).await.unwrap_err();
    let PublishError::Writer(inner) = &err else {
        panic!("expected writer error, got {err:?}");
    };
    assert_eq!(inner.stream, "ncorp.tx");
    let source = inner.source.downcast_ref::<io::Error>().unwrap();
    assert_eq!(source.kind(), io::ErrorKind::ConnectionReset);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_publish_raw_bypasses_registry() {
    let writer = Arc::new(RecordingWriter::default());
    let marshaler = Arc::new(CountingMarshaler::default());
    let hub = Hub::builder()
        .writer(writer.clone())
        .marshaler(marshaler.clone())
        .build();

    let raw = Message::new(NewMessageArgs {
        id: "relay-1".to_string(),
        source: "upstream".to_string(),
        stream: "relay".to_string(),
        data: Bytes::from_static(b"opaque"),
        ..Default::default()
    });
    hub.publish_raw(raw.clone()).await.unwrap();

    assert_eq!(marshaler.calls.load(Ordering::SeqCst), 0);
    assert_eq!(writer.messages.lock().as_slice(), &[raw]);
}

/// Тест проверяет, что повторная регистрация перезаписывает запись.
#[tokio::test]
async fn test_reregistration_overwrites() {
    let writer = Arc::new(RecordingWriter::default());
    let hub = Hub::builder().writer(writer.clone()).build();
    hub.register_stream::<TxRegistered>(StreamMetadata::new("old"));
    hub.register_stream::<TxRegistered>(StreamMetadata::new("new"));

    hub.publish(&tx()).await.unwrap();
    assert_eq!(writer.messages.lock()[0].stream(), "new");
    assert_eq!(hub.registry().len(), 1);
}
