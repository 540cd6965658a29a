//! Нагрузочный стенд streamhub.
//!
//! Публикует N сообщений через шину в памяти, обрабатывает их слушателями
//! и печатает пропускную способность публикации и доставки.

use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use streamhub::{
    init_logging, AvroMarshaler, BoxError, Hub, InMemoryBus, InMemorySchemaRegistry, JsonMarshaler,
    ListenerOptions, Marshaler, Message, MessagePackMarshaler, SchemaRegistry, Settings,
    ShutdownToken, StreamMetadata,
};
use tokio::task::JoinSet;
use tracing::info;

const STREAM: &str = "ncorp.wallet.tx.registered";
const SCHEMA_NAME: &str = "ncorp.wallet.tx.registered";
const SCHEMA_DEFINITION: &str = r#"{"type":"record","name":"TxRegistered","fields":[{"name":"TxID","type":"string"},{"name":"Amount","type":"double"}]}"#;

#[derive(Parser)]
#[command(name = "streamhub-bench")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Throughput benchmark for the streamhub publish/listen pipeline", long_about = None)]
struct Cli {
    /// Общее число сообщений
    #[arg(short = 'n', long, default_value_t = 100_000)]
    messages: usize,
    /// Число параллельных публикаторов
    #[arg(short, long, default_value_t = 8)]
    publishers: usize,
    /// Число воркеров слушателя (перекрывает настройки)
    #[arg(short, long)]
    concurrency: Option<usize>,
    /// Кодек полезной нагрузки
    #[arg(long, value_enum, default_value_t = Codec::Json)]
    codec: Codec,
    /// Файл настроек (TOML/YAML/JSON)
    #[arg(long, env = "STREAMHUB_CONFIG")]
    config: Option<PathBuf>,
    /// Сколько ждать доставки всех сообщений, в секундах
    #[arg(long, default_value_t = 60)]
    timeout: u64,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum Codec {
    Json,
    Msgpack,
    Avro,
}

#[derive(Debug, Serialize, Deserialize)]
struct TxRegistered {
    #[serde(rename = "TxID")]
    tx_id: String,
    #[serde(rename = "Amount")]
    amount: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    if let Some(level) = cli.concurrency {
        settings.listener.concurrency_level = level;
    }
    settings.validate().context("invalid settings")?;
    let logging = init_logging(settings.logging.clone())
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    if cli.publishers == 0 {
        bail!("at least one publisher is required");
    }

    let marshaler: Arc<dyn Marshaler> = match cli.codec {
        Codec::Json => Arc::new(JsonMarshaler),
        Codec::Msgpack => Arc::new(MessagePackMarshaler),
        Codec::Avro => Arc::new(AvroMarshaler::new()),
    };
    let schemas = Arc::new(InMemorySchemaRegistry::new());
    schemas.register_definition(SCHEMA_NAME, SCHEMA_DEFINITION, 1).await;

    let bus = Arc::new(InMemoryBus::new(settings.memory_bus.capacity));
    let hub = Arc::new(
        Hub::builder()
            .with_settings(&settings)
            .marshaler(marshaler)
            .schema_registry(schemas)
            .writer(bus.clone())
            .driver(bus.clone())
            .build(),
    );

    hub.register_stream::<TxRegistered>(
        StreamMetadata::new(STREAM).with_schema(SCHEMA_NAME, 1),
    );
    hub.listen::<TxRegistered>(ListenerOptions::new().listener(
        |_token: ShutdownToken, _msg: Message| async move { Ok::<(), BoxError>(()) },
    ))?;

    let token = ShutdownToken::new();
    let supervisor = hub.start(&token);
    info!(workers = supervisor.worker_count(), codec = ?cli.codec, "benchmark started");

    let started = Instant::now();
    let mut publishers = JoinSet::new();
    for publisher in 0..cli.publishers {
        let hub = Arc::clone(&hub);
        let count = cli.messages / cli.publishers + usize::from(publisher < cli.messages % cli.publishers);
        publishers.spawn(async move {
            for i in 0..count {
                let tx = TxRegistered {
                    tx_id: format!("{publisher}-{i}"),
                    amount: 99.99,
                };
                hub.publish(&tx).await?;
            }
            Ok::<(), streamhub::PublishError>(())
        });
    }
    while let Some(res) = publishers.join_next().await {
        res.context("publisher task panicked")??;
    }
    let published_in = started.elapsed();

    let deadline = Instant::now() + Duration::from_secs(cli.timeout);
    while hub.metrics().handled() < cli.messages as u64 {
        if Instant::now() >= deadline {
            supervisor.shutdown(&token).await;
            bail!(
                "timed out: handled {} of {} messages",
                hub.metrics().handled(),
                cli.messages
            );
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let delivered_in = started.elapsed();

    bus.close();
    supervisor.shutdown(&token).await;

    let snapshot = hub.metrics().snapshot();
    println!(
        "streamhub-bench {} (commit {}, built {})",
        env!("CARGO_PKG_VERSION"),
        option_env!("STREAMHUB_GIT_COMMIT").unwrap_or("unknown"),
        option_env!("STREAMHUB_BUILD_TIME").unwrap_or("unknown"),
    );
    println!("messages:   {}", cli.messages);
    println!("codec:      {:?}", cli.codec);
    println!(
        "published:  {:.2?} ({:.0} msg/s)",
        published_in,
        cli.messages as f64 / published_in.as_secs_f64()
    );
    println!(
        "delivered:  {:.2?} ({:.0} msg/s)",
        delivered_in,
        cli.messages as f64 / delivered_in.as_secs_f64()
    );
    println!("metrics:    {snapshot:?}");

    logging.shutdown();
    Ok(())
}
