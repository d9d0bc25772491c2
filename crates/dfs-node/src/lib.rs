//! # DFS Node
//!
//! Hosts the file registry behind a JSON-lines transport.
//!
//! ## Modules
//!
//! - `container/` - configuration and component wiring
//! - `adapters/` - journal backend selected at startup
//! - `handlers/` - background notification monitor
//! - `session` - request/response loop over any async byte stream
//! - `runtime` - lifecycle of a running node

#![warn(missing_docs)]

pub mod adapters;
pub mod container;
pub mod handlers;
pub mod runtime;
pub mod session;

pub use container::{ConfigError, ContainerError, NodeConfig, NodeService, RegistryContainer};
pub use runtime::NodeRuntime;
pub use session::{Session, SessionError, SessionSummary};
