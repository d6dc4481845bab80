//! Configuration management

pub mod app;

pub use app::{
    validate_config, AmqpSettings, AppConfig, MessagingSettings, ServiceSettings, StorageSettings,
};
