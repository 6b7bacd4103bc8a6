//! Host identity: privilege probing and system account creation.

use std::path::Path;

use anyhow::{Context, Result};
use nix::unistd::{User, geteuid};

use crate::application::ports::{AccountManager, CommandRunner};
use crate::domain::plan::Outcome;

/// Shell given to service accounts.
pub const NOLOGIN_SHELL: &str = "/usr/sbin/nologin";

/// Whether this process runs with an effective uid of 0.
#[must_use]
pub fn is_elevated() -> bool {
    geteuid().is_root()
}

/// Creates accounts with `useradd`.
pub struct SystemAccounts<'a, R> {
    runner: &'a R,
}

impl<'a, R: CommandRunner> SystemAccounts<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> AccountManager for SystemAccounts<'_, R> {
    async fn ensure_account(&self, name: &str, home: &Path) -> Result<Outcome> {
        let existing =
            User::from_name(name).with_context(|| format!("looking up account {name}"))?;
        if existing.is_some() {
            return Ok(Outcome::Unchanged);
        }
        let home = home.to_string_lossy();
        let output = self
            .runner
            .run(
                "useradd",
                &[
                    "--system",
                    "--user-group",
                    "--home-dir",
                    &home,
                    "--no-create-home",
                    "--shell",
                    NOLOGIN_SHELL,
                    name,
                ],
            )
            .await?;
        anyhow::ensure!(
            output.status.success(),
            "useradd {name} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
        tracing::info!(account = name, "created system account");
        Ok(Outcome::Changed)
    }
}
