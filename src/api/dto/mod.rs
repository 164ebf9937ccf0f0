//! Data Transfer Objects for REST request/response serialization.
//!
//! Persisted events and aggregates are returned as-is; these types only
//! add the envelope (`message`, counts) around them.

pub mod log_dto;
pub mod system_dto;

pub use log_dto::*;
pub use system_dto::*;
