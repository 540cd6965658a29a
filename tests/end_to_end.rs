use std::{sync::Arc, time::Duration};

use rstest::rstest;
use serde::{Deserialize, Serialize};
use streamhub::{
    AvroMarshaler, BoxError, Hub, InMemoryBus, InMemorySchemaRegistry, JsonMarshaler,
    ListenerOptions, Marshaler, MarshalerExt, Message, MessagePackMarshaler, PublishError,
    SchemaRegistry, ShutdownToken, StreamMetadata,
};
use tokio::{sync::mpsc, time::timeout};

const STREAM: &str = "ncorp.wallet.tx.registered";
const TX_SCHEMA: &str = r#"{
    "type": "record",
    "name": "TxRegistered",
    "namespace": "org.ncorp.wallet",
    "fields": [
        {"name": "TxID", "type": "string"},
        {"name": "Amount", "type": "double"}
    ]
}"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TxRegistered {
    #[serde(rename = "TxID")]
    tx_id: String,
    #[serde(rename = "Amount")]
    amount: f64,
}

fn forward_to(
    tx: mpsc::UnboundedSender<Message>
) -> impl Fn(ShutdownToken, Message) -> std::future::Ready<Result<(), BoxError>> {
    move |_token: ShutdownToken, message: Message| {
        let _ = tx.send(message);
        std::future::ready(Ok(()))
    }
}

/// Тест проверяет полный путь сообщения: публикация → шина → слушатель →
/// декодирование тем же кодеком.
#[rstest]
#[case::json(Arc::new(JsonMarshaler) as Arc<dyn Marshaler>, "application/json")]
#[case::msgpack(Arc::new(MessagePackMarshaler) as Arc<dyn Marshaler>, "application/msgpack")]
#[case::avro(Arc::new(AvroMarshaler::new()) as Arc<dyn Marshaler>, "application/avro")]
#[tokio::test]
async fn test_wallet_tx_round_trip(
    #[case] marshaler: Arc<dyn Marshaler>,
    #[case] content_type: &str,
) {
    let bus = Arc::new(InMemoryBus::default());
    let schemas = Arc::new(InMemorySchemaRegistry::new());
    schemas
        .register_definition(STREAM, TX_SCHEMA, 1)
        .await;

    let hub = Hub::builder()
        .instance_name("ncorp")
        .marshaler(marshaler)
        .schema_registry(schemas)
        .writer(bus.clone())
        .driver(bus.clone())
        .build();
    hub.register_stream::<TxRegistered>(StreamMetadata::new(STREAM).with_schema(STREAM, 1));

    let (tx, mut rx) = mpsc::unbounded_channel();
    hub.listen::<TxRegistered>(ListenerOptions::new().group("ledger").listener(forward_to(tx)))
        .unwrap();

    let token = ShutdownToken::new();
    let handle = hub.start(&token);

    let sent = TxRegistered {
        tx_id: "1".to_string(),
        amount: 99.99,
    };
    hub.publish(&sent).await.unwrap();

    let received = timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(received.message_type(), "ncorp.wallet.tx.registered.v1");
    assert_eq!(received.spec_version(), "1.0");
    assert_eq!(received.data_schema_version(), 1);
    assert_eq!(received.data_content_type(), content_type);
    assert_eq!(received.source(), "ncorp");
    assert_eq!(received.group_name(), "ledger");

    let decoded: TxRegistered = hub.decode(&received).await.unwrap();
    assert_eq!(decoded, sent);

    handle.shutdown(&token).await;
    let snap = hub.metrics().snapshot();
    assert_eq!(snap.published, 1);
    assert_eq!(snap.received, 1);
    assert_eq!(snap.handled, 1);
}

/// Тест проверяет wire-представление конверта, прошедшего через хаб.
#[tokio::test]
async fn test_envelope_wire_shape_after_publish() {
    let bus = Arc::new(InMemoryBus::default());
    let hub = Hub::builder().writer(bus.clone()).driver(bus.clone()).build();
    hub.register_stream_by_string("tx", StreamMetadata::new(STREAM));

    let (tx, mut rx) = mpsc::unbounded_channel();
    hub.listen_by_key("tx", ListenerOptions::new().listener(forward_to(tx)))
        .unwrap();
    let token = ShutdownToken::new();
    let handle = hub.start(&token);

    hub.publish_by_key(
        "tx",
        &TxRegistered {
            tx_id: "2".to_string(),
            amount: 1.5,
        },
    )
    .await
    .unwrap();

    let received = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    let wire = serde_json::to_value(&received).unwrap();
    let obj = wire.as_object().unwrap();

    assert_eq!(obj["specversion"], "1.0");
    assert_eq!(obj["type"], "com.streamhub.ncorp.wallet.tx.registered.v0");
    assert_eq!(obj["source"], "com.streamhub");
    assert!(!obj.contains_key("dataschemaversion"));
    assert!(!obj.contains_key("dataschema"));
    assert!(!obj.contains_key("subject"));
    assert!(obj.contains_key("time"));

    let payload: TxRegistered = JsonMarshaler.decode("", received.data()).unwrap();
    assert_eq!(payload.tx_id, "2");

    handle.shutdown(&token).await;
}

/// Тест проверяет доставку одного сообщения в две группы одного потока.
#[tokio::test]
async fn test_fan_out_to_groups() {
    let bus = Arc::new(InMemoryBus::default());
    let hub = Hub::builder().writer(bus.clone()).driver(bus.clone()).build();
    hub.register_stream::<TxRegistered>(StreamMetadata::new(STREAM));

    let (tx, mut rx) = mpsc::unbounded_channel();
    hub.listen::<TxRegistered>(ListenerOptions::new().group("ledger").listener(forward_to(tx.clone())))
        .unwrap();
    hub.listen::<TxRegistered>(ListenerOptions::new().group("audit").listener(forward_to(tx)))
        .unwrap();

    let token = ShutdownToken::new();
    let handle = hub.start(&token);
    hub.publish(&TxRegistered {
        tx_id: "3".to_string(),
        amount: 10.0,
    })
    .await
    .unwrap();

    let mut groups = Vec::new();
    for _ in 0..2 {
        let msg = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        groups.push(msg.group_name().to_string());
    }
    groups.sort();
    assert_eq!(groups, vec!["audit", "ledger"]);

    handle.shutdown(&token).await;
}

/// Тест проверяет, что Avro-кодек берёт схему из реестра: значение другой
/// формы не кодируется, и писатель не вызывается.
#[tokio::test]
async fn test_avro_payload_must_match_registered_schema() {
    #[derive(Serialize)]
    struct TxDraft {
        #[serde(rename = "TxID")]
        tx_id: u64,
    }

    let bus = Arc::new(InMemoryBus::default());
    let schemas = Arc::new(InMemorySchemaRegistry::new());
    schemas.register_definition(STREAM, TX_SCHEMA, 1).await;

    let hub = Hub::builder()
        .marshaler(Arc::new(AvroMarshaler::new()))
        .schema_registry(schemas)
        .writer(bus.clone())
        .build();
    hub.register_stream_by_string("draft", StreamMetadata::new(STREAM).with_schema(STREAM, 1));

    let err = hub
        .publish_by_key("draft", &TxDraft { tx_id: 1 })
        .await
        .unwrap_err();

    match err {
        PublishError::Marshal(e) => assert_eq!(e.content_type, "application/avro"),
        other => panic!("expected marshal error, got {other:?}"),
    }
    assert_eq!(bus.undelivered(), 0);
    assert_eq!(hub.metrics().snapshot().publish_failures, 1);
}
