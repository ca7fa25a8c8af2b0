pub mod cli;
pub mod config;
pub mod error;
pub mod init_step;
pub mod npm;
pub mod orchestrator;
pub mod state;
pub mod swap;
pub mod target;
