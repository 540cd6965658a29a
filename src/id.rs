use streamhub_error::IdFactoryError;
use uuid::Uuid;

/// Источник уникальных идентификаторов сообщений.
///
/// Вызывается ровно один раз на каждую публикацию и должен быть безопасен
/// для одновременных вызовов. Замыкания `Fn() -> Result<String, _>`
/// реализуют трейт автоматически.
pub trait IdFactory: Send + Sync {
    fn generate(&self) -> Result<String, IdFactoryError>;
}

/// Фабрика по умолчанию: случайные UUID v4.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdFactory;

impl IdFactory for UuidIdFactory {
    fn generate(&self) -> Result<String, IdFactoryError> {
        Ok(Uuid::new_v4().to_string())
    }
}

impl<F> IdFactory for F
where
    F: Fn() -> Result<String, IdFactoryError> + Send + Sync,
{
    fn generate(&self) -> Result<String, IdFactoryError> {
        self()
    }
}
