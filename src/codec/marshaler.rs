use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use streamhub_error::MarshalError;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const MESSAGE_PACK_CONTENT_TYPE: &str = "application/msgpack";

/// Кодек полезной нагрузки.
///
/// Трейт object-safe: значения проходят через промежуточное представление
/// [`serde_json::Value`], поэтому хаб хранит кодек как `Arc<dyn Marshaler>`.
/// Типизированные обёртки находятся в [`MarshalerExt`]. Текст схемы передаётся
/// кодекам, которые им пользуются; остальные его игнорируют.
pub trait Marshaler: Send + Sync {
    fn marshal(
        &self,
        schema: &str,
        value: &Value,
    ) -> Result<Bytes, MarshalError>;

    fn unmarshal(
        &self,
        schema: &str,
        data: &[u8],
    ) -> Result<Value, MarshalError>;

    /// MIME-тип, который попадает в `datacontenttype` конверта.
    fn content_type(&self) -> &str;
}

/// Типизированные методы поверх любого [`Marshaler`].
pub trait MarshalerExt: Marshaler {
    fn encode<T: Serialize + ?Sized>(
        &self,
        schema: &str,
        value: &T,
    ) -> Result<Bytes, MarshalError> {
        let value =
            serde_json::to_value(value).map_err(|e| MarshalError::encode(self.content_type(), e))?;
        self.marshal(schema, &value)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        schema: &str,
        data: &[u8],
    ) -> Result<T, MarshalError> {
        let value = self.unmarshal(schema, data)?;
        serde_json::from_value(value).map_err(|e| MarshalError::decode(self.content_type(), e))
    }
}

impl<M: Marshaler + ?Sized> MarshalerExt for M {}

/// JSON-кодек, игнорирующий схему. Используется по умолчанию.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonMarshaler;

/// MessagePack-кодек (`rmp-serde`), поля структур кодируются по именам.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessagePackMarshaler;

impl Marshaler for JsonMarshaler {
    fn marshal(
        &self,
        _schema: &str,
        value: &Value,
    ) -> Result<Bytes, MarshalError> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| MarshalError::encode(JSON_CONTENT_TYPE, e))
    }

    fn unmarshal(
        &self,
        _schema: &str,
        data: &[u8],
    ) -> Result<Value, MarshalError> {
        serde_json::from_slice(data).map_err(|e| MarshalError::decode(JSON_CONTENT_TYPE, e))
    }

    fn content_type(&self) -> &str {
        JSON_CONTENT_TYPE
    }
}

impl Marshaler for MessagePackMarshaler {
    fn marshal(
        &self,
        _schema: &str,
        value: &Value,
    ) -> Result<Bytes, MarshalError> {
        rmp_serde::to_vec_named(value)
            .map(Bytes::from)
            .map_err(|e| MarshalError::encode(MESSAGE_PACK_CONTENT_TYPE, e))
    }

    fn unmarshal(
        &self,
        _schema: &str,
        data: &[u8],
    ) -> Result<Value, MarshalError> {
        rmp_serde::from_slice(data).map_err(|e| MarshalError::decode(MESSAGE_PACK_CONTENT_TYPE, e))
    }

    fn content_type(&self) -> &str {
        MESSAGE_PACK_CONTENT_TYPE
    }
}
