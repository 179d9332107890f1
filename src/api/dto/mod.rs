//! Data Transfer Objects for REST response serialization.

pub mod catalog_dto;

pub use catalog_dto::*;
