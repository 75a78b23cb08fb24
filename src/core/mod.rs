//! # Core Capture Model
//!
//! Records, position reconciliation against the remote list, and the row buffer
//! that holds a session's records.

pub mod position;
pub mod record;
pub mod row_buffer;
