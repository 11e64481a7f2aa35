//! Configuration module

pub mod cli;
pub mod run_config;

pub use cli::{CliArgs, QueryType};
pub use run_config::{RunConfig, Scheme, TargetAddress};
