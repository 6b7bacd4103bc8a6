//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod exit;
pub mod plan;
pub mod probe;
pub mod supervisor;
pub mod unit;

pub use config::{OutpostConfig, validate};
pub use error::{ConfigError, ProvisionError};
pub use plan::{Action, Check, ExecutionContext, Outcome, Plan, ProvisionSummary, Step};
pub use probe::{Battery, FailureReason, ProbeResult, Report};
pub use supervisor::ServiceState;
