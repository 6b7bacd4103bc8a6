//! Debian/Ubuntu implementation of the `PackageInstaller` port.

use std::process::Output;

use anyhow::Result;

use crate::application::ports::{CommandRunner, LONG_COMMAND_TIMEOUT, PackageInstaller};
use crate::domain::plan::Outcome;

/// Installs missing packages with `apt-get`.
pub struct AptInstaller<'a, R> {
    runner: &'a R,
}

impl<'a, R: CommandRunner> AptInstaller<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }

    async fn missing(&self, packages: &[String]) -> Result<Vec<String>> {
        let mut missing = Vec::new();
        for package in packages {
            let output = self
                .runner
                .run("dpkg-query", &["-W", "-f=${db:Status-Status}", package])
                .await?;
            if !is_installed(&output) {
                missing.push(package.clone());
            }
        }
        Ok(missing)
    }
}

/// `dpkg-query` exits non-zero for unknown packages and prints the status
/// word for known ones.
fn is_installed(output: &Output) -> bool {
    output.status.success() && String::from_utf8_lossy(&output.stdout).trim() == "installed"
}

impl<R: CommandRunner> PackageInstaller for AptInstaller<'_, R> {
    async fn install(&self, packages: &[String]) -> Result<Outcome> {
        let missing = self.missing(packages).await?;
        if missing.is_empty() {
            return Ok(Outcome::Unchanged);
        }
        tracing::info!(packages = ?missing, "installing packages");

        let update = self
            .runner
            .run_with_timeout(
                "env",
                &["DEBIAN_FRONTEND=noninteractive", "apt-get", "update", "-q"],
                LONG_COMMAND_TIMEOUT,
            )
            .await?;
        anyhow::ensure!(
            update.status.success(),
            "apt-get update failed: {}",
            String::from_utf8_lossy(&update.stderr).trim()
        );

        let mut args = vec![
            "DEBIAN_FRONTEND=noninteractive",
            "apt-get",
            "install",
            "-y",
            "-q",
            "--no-install-recommends",
        ];
        args.extend(missing.iter().map(String::as_str));
        let install = self
            .runner
            .run_with_timeout("env", &args, LONG_COMMAND_TIMEOUT)
            .await?;
        anyhow::ensure!(
            install.status.success(),
            "apt-get install {} failed: {}",
            missing.join(" "),
            String::from_utf8_lossy(&install.stderr).trim()
        );
        Ok(Outcome::Changed)
    }
}
