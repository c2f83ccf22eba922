//! IPC client for the external MDS service.

pub mod client;
pub mod types;

pub use client::IpcClient;
pub use types::ComputeRequest;
