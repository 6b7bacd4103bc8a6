//! Shared test helpers: in-memory host ports, a scripted HTTP probe and
//! output constructors.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use outpost_cli::application::ports::{
    AccountManager, CommandRunner, HostFs, HttpProbe, PackageInstaller, ProgressReporter,
    ServiceSupervisor,
};
use outpost_cli::application::services::provision::Host;
use outpost_cli::domain::plan::{ExecutionContext, Outcome};
use outpost_cli::domain::probe::{HttpReply, HttpRequest, TransportError};
use outpost_cli::domain::supervisor::ServiceState;
use outpost_cli::domain::unit::systemd_unit;
use outpost_common::ServiceDefinition;

// ── Cross-platform ExitStatus construction ───────────────────────────────────

#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    #[allow(clippy::cast_sign_loss)]
    ExitStatus::from_raw(code as u32)
}

// ── Output constructors ──────────────────────────────────────────────────────

pub fn ok_output(stdout: &[u8]) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn err_output(code: i32, stderr: &[u8]) -> Output {
    Output {
        status: exit_status(code),
        stdout: Vec::new(),
        stderr: stderr.to_vec(),
    }
}

// ── Command runner ───────────────────────────────────────────────────────────

/// Records every command line; fails the ones containing `fail_on`.
#[derive(Default)]
pub struct RecordingRunner {
    pub calls: Mutex<Vec<String>>,
    pub fail_on: Option<String>,
}

impl RecordingRunner {
    pub fn failing_on(pattern: &str) -> Self {
        Self {
            fail_on: Some(pattern.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }

    fn record(&self, program: &str, args: &[&str]) -> Output {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().expect("lock").push(line.clone());
        match &self.fail_on {
            Some(pattern) if line.contains(pattern.as_str()) => err_output(1, b"boom"),
            _ if line.contains(" pull ") => ok_output(b"Already up to date.\n"),
            _ => ok_output(b""),
        }
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        Ok(self.record(program, args))
    }

    async fn run_with_timeout(&self, program: &str, args: &[&str], _: Duration) -> Result<Output> {
        Ok(self.record(program, args))
    }

    async fn run_in(&self, _: &Path, program: &str, args: &[&str], _: Duration) -> Result<Output> {
        Ok(self.record(program, args))
    }
}

// ── Filesystem ───────────────────────────────────────────────────────────────

/// In-memory filesystem that counts mutations and tracks mode and owner.
#[derive(Default)]
pub struct MemoryFs {
    pub files: Mutex<HashMap<PathBuf, String>>,
    pub dirs: Mutex<HashSet<PathBuf>>,
    pub modes: Mutex<HashMap<PathBuf, u32>>,
    pub owners: Mutex<HashMap<PathBuf, String>>,
    pub writes: Mutex<usize>,
    pub ops: Mutex<usize>,
}

/// Everything a path carries on the in-memory host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub contents: Option<String>,
    pub mode: Option<u32>,
    pub owner: Option<String>,
}

impl MemoryFs {
    pub fn with_dir(self, path: impl Into<PathBuf>) -> Self {
        self.dirs.lock().expect("lock").insert(path.into());
        self
    }

    pub fn file(&self, path: &Path) -> Option<String> {
        self.files.lock().expect("lock").get(path).cloned()
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock().expect("lock")
    }

    pub fn mode(&self, path: &Path) -> Option<u32> {
        self.modes.lock().expect("lock").get(path).copied()
    }

    pub fn owner(&self, path: &Path) -> Option<String> {
        self.owners.lock().expect("lock").get(path).cloned()
    }

    /// Every known path with its contents, mode and owner.
    pub fn entries(&self) -> BTreeMap<PathBuf, Entry> {
        let files = self.files.lock().expect("lock");
        let dirs = self.dirs.lock().expect("lock");
        dirs.iter()
            .chain(files.keys())
            .map(|path| {
                let entry = Entry {
                    contents: files.get(path).cloned(),
                    mode: self.mode(path),
                    owner: self.owner(path),
                };
                (path.clone(), entry)
            })
            .collect()
    }

    pub fn ops(&self) -> usize {
        *self.ops.lock().expect("lock")
    }

    fn touch(&self) {
        *self.ops.lock().expect("lock") += 1;
    }
}

impl HostFs for MemoryFs {
    fn exists(&self, path: &Path) -> bool {
        self.touch();
        self.files.lock().expect("lock").contains_key(path)
            || self.dirs.lock().expect("lock").contains(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<Option<String>> {
        self.touch();
        Ok(self.file(path))
    }

    fn create_dir(&self, path: &Path, mode: u32) -> Result<bool> {
        self.touch();
        let created = self.dirs.lock().expect("lock").insert(path.to_path_buf());
        if created {
            self.modes.lock().expect("lock").insert(path.to_path_buf(), mode);
        }
        Ok(created)
    }

    fn write(&self, path: &Path, contents: &str, mode: u32) -> Result<()> {
        self.touch();
        *self.writes.lock().expect("lock") += 1;
        self.modes.lock().expect("lock").insert(path.to_path_buf(), mode);
        self.files
            .lock()
            .expect("lock")
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        self.touch();
        self.modes.lock().expect("lock").insert(path.to_path_buf(), mode);
        Ok(())
    }

    fn chown(&self, path: &Path, account: &str) -> Result<()> {
        self.touch();
        self.owners
            .lock()
            .expect("lock")
            .insert(path.to_path_buf(), account.to_string());
        Ok(())
    }
}

// ── Accounts and packages ────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeAccounts {
    pub existing: Mutex<HashSet<String>>,
    pub calls: Mutex<usize>,
}

impl FakeAccounts {
    pub fn calls(&self) -> usize {
        *self.calls.lock().expect("lock")
    }
}

impl AccountManager for FakeAccounts {
    async fn ensure_account(&self, name: &str, _home: &Path) -> Result<Outcome> {
        *self.calls.lock().expect("lock") += 1;
        Ok(if self.existing.lock().expect("lock").insert(name.to_string()) {
            Outcome::Changed
        } else {
            Outcome::Unchanged
        })
    }
}

#[derive(Default)]
pub struct FakePackages {
    pub installed: Mutex<HashSet<String>>,
    pub calls: Mutex<usize>,
}

impl FakePackages {
    pub fn calls(&self) -> usize {
        *self.calls.lock().expect("lock")
    }
}

impl PackageInstaller for FakePackages {
    async fn install(&self, packages: &[String]) -> Result<Outcome> {
        *self.calls.lock().expect("lock") += 1;
        let mut installed = self.installed.lock().expect("lock");
        let missing: Vec<&String> = packages.iter().filter(|p| !installed.contains(*p)).collect();
        if missing.is_empty() {
            return Ok(Outcome::Unchanged);
        }
        installed.extend(missing.into_iter().cloned());
        Ok(Outcome::Changed)
    }
}

// ── Supervisor ───────────────────────────────────────────────────────────────

/// Supervisor that runs whatever it is told to start. `scripted` states
/// are returned first, in order, overriding the running flag.
#[derive(Default)]
pub struct FakeSupervisor {
    pub units: Mutex<HashMap<String, String>>,
    pub running: Mutex<bool>,
    pub scripted: Mutex<VecDeque<ServiceState>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeSupervisor {
    pub fn scripted(states: impl IntoIterator<Item = ServiceState>) -> Self {
        Self {
            scripted: Mutex::new(states.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }

    pub fn count(&self, verb: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(verb)).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("lock").push(call);
    }
}

impl ServiceSupervisor for FakeSupervisor {
    async fn register(&self, def: &ServiceDefinition) -> Result<Outcome> {
        self.record(format!("register {}", def.name));
        let unit = systemd_unit(def);
        let previous = self
            .units
            .lock()
            .expect("lock")
            .insert(def.name.clone(), unit.clone());
        Ok(if previous.as_deref() == Some(unit.as_str()) {
            Outcome::Unchanged
        } else {
            Outcome::Changed
        })
    }

    async fn enable(&self, name: &str) -> Result<()> {
        self.record(format!("enable {name}"));
        Ok(())
    }

    async fn start(&self, name: &str) -> Result<()> {
        self.record(format!("start {name}"));
        *self.running.lock().expect("lock") = true;
        Ok(())
    }

    async fn restart(&self, name: &str) -> Result<()> {
        self.record(format!("restart {name}"));
        *self.running.lock().expect("lock") = true;
        Ok(())
    }

    async fn state(&self, name: &str) -> Result<ServiceState> {
        self.record(format!("state {name}"));
        if let Some(state) = self.scripted.lock().expect("lock").pop_front() {
            return Ok(state);
        }
        Ok(if *self.running.lock().expect("lock") {
            ServiceState::Active
        } else {
            ServiceState::Inactive
        })
    }
}

// ── Whole host ───────────────────────────────────────────────────────────────

/// Owns every in-memory port so tests can inspect them after a run.
#[derive(Default)]
pub struct FakeHost {
    pub runner: RecordingRunner,
    pub fs: MemoryFs,
    pub accounts: FakeAccounts,
    pub packages: FakePackages,
    pub supervisor: FakeSupervisor,
}

impl FakeHost {
    pub fn host(
        &self,
    ) -> Host<'_, RecordingRunner, MemoryFs, FakeAccounts, FakePackages, FakeSupervisor> {
        Host {
            runner: &self.runner,
            fs: &self.fs,
            accounts: &self.accounts,
            packages: &self.packages,
            supervisor: &self.supervisor,
        }
    }

    /// Filesystem entries, accounts, packages and registered units.
    pub fn state(&self) -> HostState {
        HostState {
            entries: self.fs.entries(),
            accounts: self.accounts.existing.lock().expect("lock").iter().cloned().collect(),
            packages: self.packages.installed.lock().expect("lock").iter().cloned().collect(),
            units: self
                .supervisor
                .units
                .lock()
                .expect("lock")
                .iter()
                .map(|(name, unit)| (name.clone(), unit.clone()))
                .collect(),
        }
    }

    /// Number of calls any port has seen.
    pub fn port_calls(&self) -> usize {
        self.runner.calls().len()
            + self.fs.ops()
            + self.accounts.calls()
            + self.packages.calls()
            + self.supervisor.calls().len()
    }
}

/// Comparable snapshot of the in-memory host.
#[derive(Debug, PartialEq, Eq)]
pub struct HostState {
    pub entries: BTreeMap<PathBuf, Entry>,
    pub accounts: BTreeSet<String>,
    pub packages: BTreeSet<String>,
    pub units: BTreeMap<String, String>,
}

pub fn elevated_ctx(install_dir: &str) -> ExecutionContext {
    ExecutionContext {
        account: "outpost".to_string(),
        install_dir: PathBuf::from(install_dir),
        elevated: true,
        dry_run: false,
    }
}

// ── Reporter ─────────────────────────────────────────────────────────────────

/// Collects every progress event as `"<kind>: <message>"`.
#[derive(Default)]
pub struct CollectingReporter {
    pub events: Mutex<Vec<String>>,
}

impl CollectingReporter {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().expect("lock").clone()
    }

    fn push(&self, kind: &str, message: &str) {
        self.events
            .lock()
            .expect("lock")
            .push(format!("{kind}: {message}"));
    }
}

impl ProgressReporter for CollectingReporter {
    fn step(&self, message: &str) {
        self.push("step", message);
    }
    fn success(&self, message: &str) {
        self.push("success", message);
    }
    fn warn(&self, message: &str) {
        self.push("warn", message);
    }
    fn fail(&self, message: &str) {
        self.push("fail", message);
    }
    fn detail(&self, message: &str) {
        self.push("detail", message);
    }
}

// ── HTTP probe ───────────────────────────────────────────────────────────────

type Responder = Box<dyn Fn(&HttpRequest) -> Result<HttpReply, TransportError> + Send + Sync>;

/// Probe that answers from a closure and records each request line.
pub struct ScriptedProbe {
    base_url: String,
    respond: Responder,
    pub seen: Mutex<Vec<String>>,
}

impl ScriptedProbe {
    pub fn new(
        respond: impl Fn(&HttpRequest) -> Result<HttpReply, TransportError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            respond: Box::new(respond),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().expect("lock").clone()
    }
}

impl HttpProbe for ScriptedProbe {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, request: &HttpRequest) -> Result<HttpReply, TransportError> {
        self.seen
            .lock()
            .expect("lock")
            .push(format!("{} {}", request.method, request.path));
        (self.respond)(request)
    }
}

pub fn reply(status: u16, body: &str) -> Result<HttpReply, TransportError> {
    Ok(HttpReply {
        status,
        body: body.as_bytes().to_vec(),
    })
}
