use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use streamhub_error::SchemaNotFoundError;

/// Реестр определений схем.
///
/// Эталонная реализация хранит схемы в памяти; сетевые реестры
/// подключаются через этот же трейт.
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    async fn register_definition(
        &self,
        name: &str,
        definition: &str,
        version: u32,
    );

    async fn get_schema_definition(
        &self,
        name: &str,
        version: u32,
    ) -> Result<Arc<str>, SchemaNotFoundError>;
}

/// Реестр схем в памяти, ключом служит пара (имя, версия).
#[derive(Debug, Default)]
pub struct InMemorySchemaRegistry {
    definitions: DashMap<(String, u32), Arc<str>>,
}

impl InMemorySchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[async_trait]
impl SchemaRegistry for InMemorySchemaRegistry {
    async fn register_definition(
        &self,
        name: &str,
        definition: &str,
        version: u32,
    ) {
        self.definitions
            .insert((name.to_string(), version), Arc::from(definition));
    }

    async fn get_schema_definition(
        &self,
        name: &str,
        version: u32,
    ) -> Result<Arc<str>, SchemaNotFoundError> {
        self.definitions
            .get(&(name.to_string(), version))
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| SchemaNotFoundError::new(name, version))
    }
}
