use clap::Parser;
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not load configuration: {0}")]
    Load(#[from] figment::Error),
}

/// Command-line surface. Flags always win over file/env values — the usual
/// figment + clap layering (config file < environment < flags).
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "moor-server", about = "A small persistent, multi-user, programmable virtual world server")]
pub struct Args {
    /// Path to a YAML configuration file. If absent, built-in defaults apply.
    #[arg(short, long, value_name = "config")]
    pub config_file: Option<PathBuf>,

    /// Path to the world snapshot to load at startup, if it exists.
    #[arg(short = 'd', long, value_name = "world-db")]
    pub world_db: Option<PathBuf>,

    /// Reset to the seeded starter world even if a snapshot exists.
    #[arg(long)]
    pub fresh: bool,

    /// Per-verb/function execution timeout, in milliseconds.
    #[arg(long, value_name = "ms")]
    pub script_timeout_ms: Option<u64>,

    /// Maximum nested verb/function call depth.
    #[arg(long, value_name = "depth")]
    pub max_call_depth: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub world_db: PathBuf,
    pub fresh: bool,
    pub script_timeout_ms: u64,
    pub max_call_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            world_db: PathBuf::from("world.jsonl"),
            fresh: false,
            script_timeout_ms: 5_000,
            max_call_depth: 50,
        }
    }
}

impl ServerConfig {
    pub fn script_timeout(&self) -> Duration {
        Duration::from_millis(self.script_timeout_ms)
    }

    /// Merges defaults, an optional YAML file, `MOOR_`-prefixed environment
    /// variables, and CLI flags, in ascending precedence.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(ServerConfig::default()));
        if let Some(path) = &args.config_file {
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed("MOOR_"));
        let mut config: ServerConfig = figment.extract()?;

        if let Some(path) = &args.world_db {
            config.world_db = path.clone();
        }
        if args.fresh {
            config.fresh = true;
        }
        if let Some(ms) = args.script_timeout_ms {
            config.script_timeout_ms = ms;
        }
        if let Some(depth) = args.max_call_depth {
            config.max_call_depth = depth;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_with_no_overrides() {
        let args = Args::default();
        let config = ServerConfig::load(&args).unwrap();
        assert_eq!(config.world_db, PathBuf::from("world.jsonl"));
        assert_eq!(config.max_call_depth, 50);
    }

    #[test]
    fn cli_flags_override_defaults() {
        let args = Args { fresh: true, max_call_depth: Some(10), ..Args::default() };
        let config = ServerConfig::load(&args).unwrap();
        assert!(config.fresh);
        assert_eq!(config.max_call_depth, 10);
    }
}
