use std::{env, process::ExitCode};

use anyhow::Context;
use clap::Parser;
use ire::{
    cli::{self, Cli},
    config,
    orchestrator::{self, Interrupt, Orchestrator},
};
use tracing::error;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    config::init_tracing();
    let cli = Cli::parse();

    let Some(folder) = cli.folder.as_deref() else {
        print!("{}", cli::usage_text());
        return Ok(ExitCode::SUCCESS);
    };

    let mut config = config::AppConfig::load()?;
    cli.apply_to(&mut config);
    let cwd = env::current_dir().context("resolving current directory")?;

    let interrupt = Interrupt::new();
    let listener = orchestrator::spawn_signal_listener(interrupt.clone());
    let orchestrator = Orchestrator::from_app_config(&config, interrupt);

    let result = orchestrator.run(folder, &cwd).await;
    listener.abort();

    match result {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            if err.touched_config() {
                error!(error = ?err, "scaffold did not complete");
            }
            eprintln!("{err}");
            let code = u8::try_from(err.exit_code()).unwrap_or(1);
            Ok(ExitCode::from(code))
        }
    }
}
