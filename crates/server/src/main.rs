use clap::Parser;
use moor_server::config::{Args, ServerConfig};

fn main() -> anyhow::Result<()> {
    moor_server::logging::init();
    let args = Args::parse();
    let config = ServerConfig::load(&args)?;
    moor_server::run_repl(&config)
}
