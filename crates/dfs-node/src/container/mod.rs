//! # Node Container
//!
//! Configuration and construction of the registry node's components.

pub mod config;
pub mod registry;

pub use config::{ConfigError, NodeConfig, DEFAULT_CHANNEL_CAPACITY};
pub use registry::{ContainerError, NodeService, RegistryContainer};
