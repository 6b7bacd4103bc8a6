//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, host
//! filesystem and account access, systemd, HTTP, and config loading.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod accounts;
pub mod command_runner;
pub mod config;
pub mod fs;
pub mod http;
pub mod logging;
pub mod packages;
pub mod systemd;
