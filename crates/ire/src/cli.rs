use std::fmt::Write;

use clap::Parser;

use crate::config::AppConfig;

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

#[derive(Debug, Parser)]
#[command(name = "ire", version, about)]
pub struct Cli {
    /// Folder to create and initialize, relative to the current directory
    pub folder: Option<String>,

    /// Extra positionals are accepted and ignored
    #[arg(hide = true)]
    pub rest: Vec<String>,

    /// Mirror registry to use while initializing
    #[arg(long)]
    pub registry: Option<String>,

    /// Mirror dist-url to use while initializing
    #[arg(long)]
    pub disturl: Option<String>,

    /// Init script run inside the new folder
    #[arg(long)]
    pub init_script: Option<String>,

    /// Give up on the init script after this many seconds (0 disables)
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl Cli {
    /// Flags win over the file and environment layers.
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(registry) = &self.registry {
            config.mirror.registry = registry.clone();
        }
        if let Some(disturl) = &self.disturl {
            config.mirror.dist_url = disturl.clone();
        }
        if let Some(script) = &self.init_script {
            config.init.program = script.clone();
        }
        if let Some(secs) = self.timeout {
            config.init.timeout_secs = Some(secs);
        }
    }
}

/// Prefixes `msg` with `indent` spaces.
pub fn format_msg(msg: &str, indent: usize) -> String {
    format!("{}{msg}", " ".repeat(indent))
}

pub fn usage_text() -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "{NAME} v{VERSION}");
    let _ = writeln!(out, "{}", format_msg(DESCRIPTION, 0));
    let _ = writeln!(out);
    let _ = writeln!(out, "Usage");
    let _ = writeln!(out);
    let _ = writeln!(out, "Show default info");
    let _ = writeln!(out, "{}", format_msg(&format!("$ {NAME}"), 2));
    let _ = writeln!(out);
    let _ = writeln!(out, "Initialize react-native development environment in dirPath");
    let _ = writeln!(out, "{}", format_msg(&format!("$ {NAME} dirPath"), 2));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_msg_pads_with_spaces() {
        assert_eq!(format_msg("hi", 0), "hi");
        assert_eq!(format_msg("hi", 3), "   hi");
    }

    #[test]
    fn usage_lists_both_forms() {
        let usage = usage_text();
        assert!(usage.contains(&format!("ire v{VERSION}")));
        assert!(usage.contains("  $ ire\n"));
        assert!(usage.contains("  $ ire dirPath\n"));
    }

    #[test]
    fn no_arguments_means_no_folder() {
        let cli = Cli::try_parse_from(["ire"]).expect("parse");
        assert!(cli.folder.is_none());
    }

    #[test]
    fn only_first_positional_is_the_folder() {
        let cli = Cli::try_parse_from(["ire", "AwesomeProject", "ignored"]).expect("parse");
        assert_eq!(cli.folder.as_deref(), Some("AwesomeProject"));
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "ire",
            "app",
            "--registry",
            "https://registry.npmmirror.com",
            "--timeout",
            "30",
        ])
        .expect("parse");
        let mut config = AppConfig::default();

        cli.apply_to(&mut config);

        assert_eq!(config.mirror.registry, "https://registry.npmmirror.com");
        assert_eq!(config.init.timeout_secs, Some(30));
        assert_eq!(config.init.program, "ire-init");
    }
}
