//! Background handlers spawned by the node runtime.

pub mod monitor;

pub use monitor::NotificationMonitor;
