//! Кодеки и реестр схем.
//!
//! - `marshaler`: преобразование значений предметной области в байты
//!   конверта и обратно (JSON по умолчанию, MessagePack как альтернатива).
//! - `avro`: Avro-кодек, которому нужен текст схемы из реестра.
//! - `schema`: поиск текста схемы по имени и версии.

pub mod avro;
pub mod marshaler;
pub mod schema;

pub use avro::{AvroMarshaler, AVRO_CONTENT_TYPE};
pub use marshaler::{JsonMarshaler, Marshaler, MarshalerExt, MessagePackMarshaler};
pub use schema::{InMemorySchemaRegistry, SchemaRegistry};
