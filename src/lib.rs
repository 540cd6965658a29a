/// Codecs (JSON, MessagePack) and schema registries.
pub mod codec;
/// Process settings loading.
pub mod config;
/// Transport interfaces and the in-memory bus.
pub mod driver;
/// Hub: publish pipeline and listener registration.
pub mod hub;
/// Message ID factories.
pub mod id;
/// Consumer side: listener nodes, retry policy, supervisor.
pub mod listener;
/// Flexible logging (formatting, filters, sinks).
pub mod logging;
/// CloudEvents-style message envelope.
pub mod message;
/// Hub counters.
pub mod metrics;
/// Cooperative shutdown token.
pub mod shutdown;
/// Stream registry: message type or key to stream metadata.
pub mod stream;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Codecs and schema registries.
pub use codec::{
    AvroMarshaler, InMemorySchemaRegistry, JsonMarshaler, Marshaler, MarshalerExt, MessagePackMarshaler,
    SchemaRegistry,
};
/// Settings.
pub use config::Settings;
/// Transport interfaces.
pub use driver::{InMemoryBus, ListenerDriver, NoopListenerDriver, NoopWriter, Writer};
/// Hub API.
pub use hub::{Hub, HubBuilder};
pub use id::{IdFactory, UuidIdFactory};
/// Listener API.
pub use listener::{
    ErrorSink, Listener, ListenerNode, ListenerOptions, ListenerSupervisor, LogErrorSink,
    SupervisorConfig, SupervisorHandle,
};
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
pub use message::{Message, NewMessageArgs};
pub use metrics::{HubMetrics, MetricsSnapshot};
pub use shutdown::ShutdownToken;
pub use stream::{StreamKey, StreamMetadata, StreamRegistry};
/// Error types.
pub use streamhub_error::{
    BoxError, DecodeError, DriverError, HandlerError, IdFactoryError, MarshalError, PublishError,
    RegistryMissError, SchemaNotFoundError, StackError, StatusCode, WriterError,
};
