pub mod conventions;
pub mod env_file;
pub mod service;

pub use env_file::{EnvFileError, parse as parse_env, render as render_env};
pub use service::{RestartPolicy, ServiceDefinition};
