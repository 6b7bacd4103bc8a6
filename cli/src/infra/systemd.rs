//! systemd implementation of the `ServiceSupervisor` port.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use outpost_common::ServiceDefinition;

use crate::application::ports::{CommandRunner, ServiceSupervisor};
use crate::domain::plan::Outcome;
use crate::domain::supervisor::ServiceState;
use crate::domain::unit::{UNIT_DIR, systemd_unit};

/// Drives services through `systemctl`, writing units under `unit_dir`.
pub struct SystemdSupervisor<'a, R> {
    runner: &'a R,
    unit_dir: PathBuf,
}

impl<'a, R: CommandRunner> SystemdSupervisor<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self::with_unit_dir(runner, PathBuf::from(UNIT_DIR))
    }

    pub fn with_unit_dir(runner: &'a R, unit_dir: PathBuf) -> Self {
        Self { runner, unit_dir }
    }

    async fn systemctl(&self, args: &[&str]) -> Result<()> {
        let output = self.runner.run("systemctl", args).await?;
        anyhow::ensure!(
            output.status.success(),
            "systemctl {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
        Ok(())
    }
}

fn restore(path: &Path, previous: Option<&str>) {
    let restored = match previous {
        Some(content) => std::fs::write(path, content),
        None => std::fs::remove_file(path),
    };
    if let Err(e) = restored {
        tracing::warn!(unit = %path.display(), error = %e, "could not roll back unit");
    }
}

impl<R: CommandRunner> ServiceSupervisor for SystemdSupervisor<'_, R> {
    async fn register(&self, def: &ServiceDefinition) -> Result<Outcome> {
        let path = self.unit_dir.join(format!("{}.service", def.name));
        let unit = systemd_unit(def);
        let current = match std::fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        if current.as_deref() == Some(unit.as_str()) {
            return Ok(Outcome::Unchanged);
        }
        std::fs::create_dir_all(&self.unit_dir)
            .with_context(|| format!("creating {}", self.unit_dir.display()))?;
        std::fs::write(&path, &unit).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(unit = %path.display(), "unit written");
        if let Err(e) = self.systemctl(&["daemon-reload"]).await {
            // Put the previous unit back so the next run sees a difference
            // and reloads again.
            restore(&path, current.as_deref());
            return Err(e);
        }
        Ok(Outcome::Changed)
    }

    async fn enable(&self, name: &str) -> Result<()> {
        self.systemctl(&["enable", name]).await
    }

    async fn start(&self, name: &str) -> Result<()> {
        self.systemctl(&["start", name]).await
    }

    async fn restart(&self, name: &str) -> Result<()> {
        self.systemctl(&["restart", name]).await
    }

    async fn state(&self, name: &str) -> Result<ServiceState> {
        // `is-active` exits non-zero for anything but active; stdout still
        // carries the state word.
        let output = self.runner.run("systemctl", &["is-active", name]).await?;
        Ok(ServiceState::parse(&String::from_utf8_lossy(&output.stdout)))
    }
}
