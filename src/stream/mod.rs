//! Реестр потоков: сопоставляет тип сообщения (или явный строковый ключ)
//! с метаданными потока: именем потока и ссылкой на схему.

pub mod registry;

pub use registry::{StreamKey, StreamMetadata, StreamRegistry};
