//! Process exit codes. Usage errors exit 2 through clap.

use crate::domain::error::ProvisionError;
use crate::domain::probe::Report;

pub const OK: u8 = 0;
pub const GENERIC_FAILURE: u8 = 1;
pub const PERMISSION_DENIED: u8 = 10;
pub const SUPERVISOR_START_FAILED: u8 = 11;
/// Step `i` (zero-based) failing exits `STEP_FAILED_BASE + i`.
pub const STEP_FAILED_BASE: u8 = 20;
pub const STEP_FAILED_MAX: u8 = 59;
pub const VERIFY_UNREACHABLE: u8 = 60;
pub const VERIFY_FAILED: u8 = 61;
pub const REQUEST_FAILED: u8 = 62;
pub const SERVICE_NOT_ACTIVE: u8 = 63;

/// Exit code for a provisioning failure.
#[must_use]
pub fn for_provision_error(err: &ProvisionError) -> u8 {
    match err {
        ProvisionError::PermissionDenied { .. } => PERMISSION_DENIED,
        ProvisionError::SupervisorStartFailed { .. } => SUPERVISOR_START_FAILED,
        ProvisionError::StepFailed { index, .. } => u8::try_from(*index)
            .map_or(STEP_FAILED_MAX, |i| {
                STEP_FAILED_BASE.saturating_add(i).min(STEP_FAILED_MAX)
            }),
    }
}

/// Exit code for a finished verifier run.
#[must_use]
pub fn for_report(report: &Report) -> u8 {
    if !report.reachable {
        VERIFY_UNREACHABLE
    } else if report.passed() {
        OK
    } else {
        VERIFY_FAILED
    }
}
