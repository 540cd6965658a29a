use std::sync::Arc;

use apache_avro::{from_avro_datum, to_avro_datum, types::Value as AvroValue, Schema};
use bytes::Bytes;
use dashmap::DashMap;
use serde_json::Value;
use streamhub_error::MarshalError;

use super::Marshaler;

pub const AVRO_CONTENT_TYPE: &str = "application/avro";

/// Avro-кодек (бинарный datum без контейнера), управляемый текстом схемы.
///
/// Схема приходит из реестра схем хаба, поэтому кодек работает только в
/// паре с [`SchemaRegistry`](super::SchemaRegistry). Разобранные схемы
/// кэшируются по их тексту.
#[derive(Debug, Default)]
pub struct AvroMarshaler {
    schemas: DashMap<String, Arc<Schema>>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl AvroMarshaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Число схем в кэше.
    pub fn cached_schemas(&self) -> usize {
        self.schemas.len()
    }

    fn schema(
        &self,
        text: &str,
    ) -> Result<Arc<Schema>, apache_avro::Error> {
        if let Some(schema) = self.schemas.get(text) {
            return Ok(Arc::clone(schema.value()));
        }

        let schema = Arc::new(Schema::parse_str(text)?);
        self.schemas.insert(text.to_string(), Arc::clone(&schema));
        Ok(schema)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl Marshaler for AvroMarshaler {
    fn marshal(
        &self,
        schema: &str,
        value: &Value,
    ) -> Result<Bytes, MarshalError> {
        let encode_err = |e: apache_avro::Error| MarshalError::encode(AVRO_CONTENT_TYPE, e);

        let schema = self.schema(schema).map_err(encode_err)?;
        let datum = AvroValue::from(value.clone())
            .resolve(&schema)
            .map_err(encode_err)?;
        to_avro_datum(&schema, datum)
            .map(Bytes::from)
            .map_err(encode_err)
    }

    fn unmarshal(
        &self,
        schema: &str,
        data: &[u8],
    ) -> Result<Value, MarshalError> {
        let decode_err = |e: apache_avro::Error| MarshalError::decode(AVRO_CONTENT_TYPE, e);

        let schema = self.schema(schema).map_err(decode_err)?;
        let mut reader = data;
        let datum = from_avro_datum(&schema, &mut reader, None).map_err(decode_err)?;
        Value::try_from(datum).map_err(decode_err)
    }

    fn content_type(&self) -> &str {
        AVRO_CONTENT_TYPE
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
