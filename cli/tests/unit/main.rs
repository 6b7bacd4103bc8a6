//! Unit tests for outpost CLI
//!
//! These tests use in-memory ports (and one local HTTP service) and run fast
//! without touching the host.

mod architecture;
mod fake_service;
mod helpers;
mod verify_service;
