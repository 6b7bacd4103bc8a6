//! `outpost status`: ask the supervisor how the service is doing.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::ports::{ConfigStore, ServiceSupervisor};
use crate::domain::exit;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::systemd::SystemdSupervisor;

/// Run the status command. Exits 0 only when the service is active.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or the supervisor
/// cannot be queried.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let cfg = app.config_store.load()?;
    let runner = TokioCommandRunner::default();
    let supervisor = SystemdSupervisor::new(&runner);
    let state = supervisor.state(&cfg.service.name).await?;
    tracing::debug!(service = %cfg.service.name, %state, "queried supervisor");

    app.renderer().render_status(&cfg.service.name, &state)?;
    if state.is_running() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(exit::SERVICE_NOT_ACTIVE))
    }
}
