//! Хаб: точка входа для публикации и подписки.
//!
//! [`Hub`] собирается через [`HubBuilder`] и после этого неизменяем; все
//! коллабораторы (кодек, реестр схем, фабрика ID, писатель, драйвер)
//! передаются явно.

pub mod builder;
pub mod hub;

pub use builder::{HubBuilder, DEFAULT_INSTANCE_NAME};
pub use hub::Hub;
