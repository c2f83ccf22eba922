//! kb_Vegan service module.
//!
//! Multidimensional scaling on workspace matrices, delegated to an external MDS
//! service.

pub mod config;
pub mod delegate;
pub mod error;
pub mod ipc;
pub mod logging;
pub mod mds;
pub mod server;
pub mod service;

pub use error::Error;
pub use service::VeganService;
