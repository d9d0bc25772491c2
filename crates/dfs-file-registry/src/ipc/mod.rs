//! # IPC Layer
//!
//! Request/response surface used by the node transport.

pub mod handler;
pub mod payloads;

pub use handler::RegistryRequestHandler;
pub use payloads::{
    parse_address, ErrorBody, RawFileId, RegistryRequest, RegistryResponse, ResponseBody,
};
