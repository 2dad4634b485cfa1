//! Configuration loading and raw file structures

mod file_config;
mod loader;

pub use file_config::{
    FileBackendConfig, FileBackendsConfig, FileConfig, FileEventsConfig, FileRoleConfig,
    FileRosterConfig, FileStorageConfig,
};
pub use loader::ConfigLoader;
