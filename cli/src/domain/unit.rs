//! Supervisor unit generation. Pure functions.
//!
//! The caller is responsible for writing the returned content to disk.

#![allow(clippy::format_push_string)]

use std::path::PathBuf;

use outpost_common::{RestartPolicy, ServiceDefinition};

/// Directory systemd loads administrator units from.
pub const UNIT_DIR: &str = "/etc/systemd/system";

/// Full path of the unit file for a service name.
#[must_use]
pub fn unit_path(name: &str) -> PathBuf {
    PathBuf::from(UNIT_DIR).join(format!("{name}.service"))
}

/// Generate the systemd unit for a service definition.
///
/// Environment values are not inlined; the unit points at the env file so
/// the provisioner and the service agree on one source.
#[must_use]
pub fn systemd_unit(def: &ServiceDefinition) -> String {
    let mut out = String::new();
    out.push_str("# Generated by outpost provision - DO NOT EDIT\n");
    out.push_str("[Unit]\n");
    out.push_str(&format!("Description={}\n", def.description));
    out.push_str("After=network-online.target\n");
    out.push_str("Wants=network-online.target\n");
    out.push('\n');
    out.push_str("[Service]\n");
    out.push_str("Type=simple\n");
    out.push_str(&format!("User={}\n", def.account));
    out.push_str(&format!("WorkingDirectory={}\n", def.working_dir.display()));
    out.push_str(&format!(
        "EnvironmentFile={}\n",
        def.env_file_path().display()
    ));
    out.push_str(&format!("ExecStart={}\n", exec_line(&def.exec_start)));
    match def.restart {
        RestartPolicy::Always { backoff_secs } => {
            out.push_str("Restart=always\n");
            out.push_str(&format!("RestartSec={backoff_secs}\n"));
        }
        RestartPolicy::OnFailure { backoff_secs } => {
            out.push_str("Restart=on-failure\n");
            out.push_str(&format!("RestartSec={backoff_secs}\n"));
        }
        RestartPolicy::Never => out.push_str("Restart=no\n"),
    }
    out.push_str("NoNewPrivileges=true\n");
    out.push_str("PrivateTmp=true\n");
    out.push('\n');
    out.push_str("[Install]\n");
    out.push_str("WantedBy=multi-user.target\n");
    out
}

/// Join argv into an `ExecStart=` value.
///
/// `%` is doubled (systemd specifier escape); arguments with whitespace or
/// quotes are double-quoted.
fn exec_line(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| {
            let escaped = arg.replace('%', "%%");
            if escaped.is_empty()
                || escaped
                    .chars()
                    .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\'))
            {
                let inner = escaped.replace('\\', "\\\\").replace('"', "\\\"");
                format!("\"{inner}\"")
            } else {
                escaped
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
