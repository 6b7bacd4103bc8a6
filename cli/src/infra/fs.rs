//! Filesystem infrastructure: implements `HostFs` on the real host.

use std::path::Path;

use anyhow::{Context, Result};
use nix::unistd::{User, chown};

use crate::application::ports::HostFs;

/// Production filesystem implementation of `HostFs`.
pub struct LocalFs;

impl HostFs for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> Result<Option<String>> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading file {}", path.display())),
        }
    }

    fn create_dir(&self, path: &Path, mode: u32) -> Result<bool> {
        if path.is_dir() {
            return Ok(false);
        }
        std::fs::create_dir_all(path)
            .with_context(|| format!("creating directory {}", path.display()))?;
        self.set_mode(path, mode)?;
        Ok(true)
    }

    fn write(&self, path: &Path, contents: &str, mode: u32) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        std::fs::write(path, contents)
            .with_context(|| format!("writing file {}", path.display()))?;
        self.set_mode(path, mode)
    }

    fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
            .with_context(|| format!("setting permissions on {}", path.display()))
    }

    fn chown(&self, path: &Path, account: &str) -> Result<()> {
        let user = User::from_name(account)
            .with_context(|| format!("looking up account {account}"))?
            .ok_or_else(|| anyhow::anyhow!("account '{account}' does not exist"))?;
        chown(path, Some(user.uid), Some(user.gid))
            .with_context(|| format!("chown {} to {account}", path.display()))
    }
}
