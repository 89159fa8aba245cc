//! Data Transfer Objects for REST request/response serialization.

pub mod system_dto;
pub mod topic_dto;

pub use system_dto::*;
pub use topic_dto::*;
