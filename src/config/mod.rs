//! # Configuration Module
//!
//! This module provides the client configuration and the persisted session identity.

pub mod config;
pub mod session;

pub use config::ClientConfig;
pub use session::SessionIdentity;
