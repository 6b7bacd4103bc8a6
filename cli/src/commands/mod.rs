//! Command implementations

pub mod config;
pub mod provision;
pub mod request;
pub mod status;
pub mod verify;
pub mod version;
