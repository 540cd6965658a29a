use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Версия спецификации CloudEvents, которой следует конверт.
pub const CLOUD_EVENTS_SPEC_VERSION: &str = "1.0";

/// Единица передачи: закодированная полезная нагрузка (`data`) вместе с
/// метаданными, которые сохраняют схему по всему конвейеру потока.
///
/// Схема конверта основана на спецификации CloudEvents (CNCF).
///
/// Конверт неизменяем после создания: поля доступны только на чтение, а
/// поля стороны потребителя (`decoded_data`, `group_name`) задаются через
/// поглощающие `with_*` методы и не попадают в wire-представление.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: String,
    stream: String,
    source: String,
    #[serde(rename = "specversion")]
    spec_version: String,
    #[serde(rename = "type")]
    message_type: String,
    data: Bytes,

    // Необязательные поля
    #[serde(rename = "datacontenttype", default, skip_serializing_if = "String::is_empty")]
    data_content_type: String,
    #[serde(rename = "dataschema", default, skip_serializing_if = "String::is_empty")]
    data_schema: String,
    #[serde(rename = "dataschemaversion", default, skip_serializing_if = "is_zero")]
    data_schema_version: u32,
    #[serde(rename = "time", default, skip_serializing_if = "String::is_empty")]
    timestamp: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    subject: String,

    // Поля streamhub
    #[serde(default)]
    correlation_id: String,
    #[serde(default)]
    causation_id: String,

    // Поля только для потребителя
    #[serde(skip)]
    decoded_data: Option<serde_json::Value>,
    #[serde(skip)]
    group_name: String,
}

/// Аргументы для [`Message::new`].
#[derive(Debug, Default, Clone)]
pub struct NewMessageArgs {
    pub schema_version: u32,
    pub data: Bytes,
    pub id: String,
    pub source: String,
    pub stream: String,
    pub schema_definition_name: String,
    pub content_type: String,
    pub group_name: String,
    pub subject: String,
    pub correlation_id: String,
    pub causation_id: String,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Message {
    /// Создаёт неизменяемый конверт, готовый к передаче в поток.
    ///
    /// Время проставляется здесь же (UTC, RFC3339), поле `type` выводится из
    /// источника, имени потока и версии схемы. Версия всегда попадает в
    /// `type`, включая `0` (`.v0`).
    pub fn new(args: NewMessageArgs) -> Self {
        let version = args.schema_version.to_string();

        Self {
            message_type: message_type(&args.source, &args.stream, &version),
            id: args.id,
            stream: args.stream,
            source: args.source,
            spec_version: CLOUD_EVENTS_SPEC_VERSION.to_string(),
            data: args.data,
            data_content_type: args.content_type,
            data_schema: args.schema_definition_name,
            data_schema_version: args.schema_version,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            subject: args.subject,
            correlation_id: args.correlation_id,
            causation_id: args.causation_id,
            decoded_data: None,
            group_name: args.group_name,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn spec_version(&self) -> &str {
        &self.spec_version
    }

    /// Тип сообщения на проводе, например `ncorp.wallet.tx.registered.v1`.
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    /// Закодированная полезная нагрузка.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn data_content_type(&self) -> &str {
        &self.data_content_type
    }

    pub fn data_schema(&self) -> &str {
        &self.data_schema
    }

    pub fn data_schema_version(&self) -> u32 {
        self.data_schema_version
    }

    /// Время создания конверта в формате RFC3339 (UTC).
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn causation_id(&self) -> &str {
        &self.causation_id
    }

    /// Значение, декодированное драйвером или обработчиком.
    pub fn decoded_data(&self) -> Option<&serde_json::Value> {
        self.decoded_data.as_ref()
    }

    /// Группа потребителей, которой доставлено сообщение.
    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    /// Прикрепляет декодированное значение (сторона потребителя).
    pub fn with_decoded_data(
        mut self,
        value: serde_json::Value,
    ) -> Self {
        self.decoded_data = Some(value);
        self
    }

    /// Помечает сообщение группой потребителей, которая его получила.
    pub fn with_group_name(
        mut self,
        group: impl Into<String>,
    ) -> Self {
        self.group_name = group.into();
        self
    }
}

////////////////////////////////////////////////////////////////////////////////
// Внешние функции
////////////////////////////////////////////////////////////////////////////////

/// Выводит значение поля `type`.
///
/// Источник добавляется префиксом, только если он непуст и имя потока ещё
/// не начинается с него. Непустая версия добавляется как `.v<version>`.
pub fn message_type(
    source: &str,
    stream: &str,
    version: &str,
) -> String {
    let mut buf = String::with_capacity(source.len() + stream.len() + version.len() + 3);
    if !source.is_empty() && !stream.starts_with(source) {
        buf.push_str(source);
        buf.push('.');
    }
    buf.push_str(stream);
    if !version.is_empty() {
        buf.push_str(".v");
        buf.push_str(version);
    }
    buf
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
