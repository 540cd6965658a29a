pub mod settings;

pub use settings::{HubSettings, ListenerSettings, MemoryBusSettings, Settings};
