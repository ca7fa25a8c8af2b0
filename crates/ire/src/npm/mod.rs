mod memory;

use std::{fmt, process::Stdio};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

pub use memory::{ConfigCall, MemoryNpmConfig};

/// Values `npm config get` prints for a key that has never been set.
const UNSET_PLACEHOLDERS: &[&str] = &["undefined", "null"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    Registry,
    DistUrl,
}

impl ConfigKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::Registry => "registry",
            ConfigKey::DistUrl => "disturl",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum NpmError {
    #[error("failed to spawn `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with status {code:?}: {stderr}")]
    Status {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("`{command}` printed non UTF-8 output")]
    InvalidOutput { command: String },
    #[error("injected failure for `{command}`")]
    Injected { command: String },
}

/// Persistent package-manager configuration, seen as a flat key/value store.
#[async_trait]
pub trait PackageManager: Send + Sync {
    async fn get(&self, key: ConfigKey) -> Result<String, NpmError>;
    async fn set(&self, key: ConfigKey, value: &str) -> Result<(), NpmError>;
    async fn delete(&self, key: ConfigKey) -> Result<(), NpmError>;
}

/// True when a value read back from npm means "no value configured".
pub fn is_unset(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || UNSET_PLACEHOLDERS.contains(&value)
}

/// Strips the trailing newlines npm appends to `config get` output.
pub fn trim_output(raw: &str) -> &str {
    raw.trim_end_matches(['\n', '\r'])
}

#[derive(Debug, Clone)]
pub struct NpmCli {
    program: String,
    leading_args: Vec<String>,
}

impl Default for NpmCli {
    fn default() -> Self {
        Self::new("npm", Vec::new())
    }
}

impl NpmCli {
    pub fn new(program: impl Into<String>, leading_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            leading_args,
        }
    }

    fn describe(&self, args: &[&str]) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.leading_args.iter().cloned());
        parts.extend(args.iter().map(|arg| arg.to_string()));
        parts.join(" ")
    }

    async fn run(&self, args: &[&str]) -> Result<String, NpmError> {
        let command = self.describe(args);
        debug!(command = %command, "running npm");

        let output = Command::new(&self.program)
            .args(&self.leading_args)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| NpmError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(NpmError::Status {
                command,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| NpmError::InvalidOutput { command })
    }
}

#[async_trait]
impl PackageManager for NpmCli {
    async fn get(&self, key: ConfigKey) -> Result<String, NpmError> {
        let stdout = self.run(&["config", "get", key.as_str()]).await?;
        Ok(trim_output(&stdout).to_string())
    }

    async fn set(&self, key: ConfigKey, value: &str) -> Result<(), NpmError> {
        self.run(&["config", "set", key.as_str(), value]).await?;
        Ok(())
    }

    async fn delete(&self, key: ConfigKey) -> Result<(), NpmError> {
        self.run(&["config", "delete", key.as_str()]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_count_as_unset() {
        assert!(is_unset(""));
        assert!(is_unset("undefined"));
        assert!(is_unset("null\n"));
        assert!(!is_unset("https://nodejs.org/dist"));
    }

    #[test]
    fn trim_output_only_strips_trailing_newlines() {
        assert_eq!(trim_output("https://registry.npmjs.org/\n\n"), "https://registry.npmjs.org/");
        assert_eq!(trim_output("value\r\n"), "value");
        assert_eq!(trim_output(" padded \n"), " padded ");
    }

    #[test]
    fn describe_includes_leading_args() {
        let npm = NpmCli::new("sh", vec!["fake-npm.sh".to_string()]);
        assert_eq!(
            npm.describe(&["config", "get", "registry"]),
            "sh fake-npm.sh config get registry"
        );
    }
}
