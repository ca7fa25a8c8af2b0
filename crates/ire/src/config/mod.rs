use std::{env, fs, path::PathBuf, time::Duration};

use anyhow::Context;
use serde::{Deserialize, de::DeserializeOwned};
use tracing_subscriber::{EnvFilter, fmt};

use crate::swap::ConfigPair;

pub const CONFIG_FILE_ENV: &str = "IRE_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub npm: NpmConfig,
    pub mirror: ConfigPair,
    pub init: InitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NpmConfig {
    #[serde(default = "default_npm_program")]
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitConfig {
    #[serde(default = "default_init_program")]
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            npm: NpmConfig::default(),
            mirror: ConfigPair::mirror(),
            init: InitConfig::default(),
        }
    }
}

impl Default for NpmConfig {
    fn default() -> Self {
        Self {
            program: default_npm_program(),
            args: Vec::new(),
        }
    }
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            program: default_init_program(),
            args: Vec::new(),
            timeout_secs: None,
        }
    }
}

impl InitConfig {
    /// A zero timeout means "no timeout".
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl AppConfig {
    /// Defaults, then the YAML file named by `IRE_CONFIG`, then `IRE_*`
    /// environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match env::var_os(CONFIG_FILE_ENV) {
            Some(path) => load_yaml(PathBuf::from(path))?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> anyhow::Result<()> {
        if let Ok(program) = env::var("IRE_NPM_BIN") {
            self.npm.program = program;
        }
        if let Ok(registry) = env::var("IRE_MIRROR_REGISTRY") {
            self.mirror.registry = registry;
        }
        if let Ok(dist_url) = env::var("IRE_MIRROR_DISTURL") {
            self.mirror.dist_url = dist_url;
        }
        if let Ok(script) = env::var("IRE_INIT_SCRIPT") {
            self.init.program = script;
        }
        if let Ok(raw) = env::var("IRE_INIT_TIMEOUT_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("parsing IRE_INIT_TIMEOUT_SECS={raw}"))?;
            self.init.timeout_secs = Some(secs);
        }
        Ok(())
    }
}

pub fn load_yaml<T: DeserializeOwned>(path: PathBuf) -> anyhow::Result<T> {
    let content = fs::read_to_string(&path).with_context(|| format!("reading yaml {:?}", path))?;
    let parsed =
        serde_yaml::from_str(&content).with_context(|| format!("parsing yaml {:?}", path))?;
    Ok(parsed)
}

fn default_npm_program() -> String {
    "npm".to_string()
}

fn default_init_program() -> String {
    "ire-init".to_string()
}

/// Logs go to stderr so the init script owns stdout.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ire=info,warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
