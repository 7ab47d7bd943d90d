pub mod config;
pub mod logging;
pub mod seed;

use anyhow::{Context, Result};
use config::ServerConfig;
use moor_dispatch::Dispatcher;
use moor_objgraph::ObjectGraph;
use moor_script::{RuntimeConfig, ScriptRuntime};
use moor_store::model::{Object, PlayerFlag};
use moor_store::WorldStore;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::info;

/// Loads the on-disk snapshot named by `config.world_db`, or seeds a fresh
/// starter world when it is absent or `--fresh` was passed (spec.md §6).
pub fn load_or_seed(config: &ServerConfig) -> (ObjectGraph, Object) {
    if !config.fresh && config.world_db.exists() {
        match moor_store::snapshot::load(&config.world_db) {
            Ok(store) => {
                let graph = ObjectGraph::new(Arc::new(store));
                let admin = graph
                    .store()
                    .objects
                    .find_one(|o| o.has_flag(PlayerFlag::Admin))
                    .unwrap_or_else(|| seed_and_unwrap_admin(&graph));
                info!(path = %config.world_db.display(), "loaded world snapshot");
                return (graph, admin);
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load world snapshot, seeding fresh world instead");
            }
        }
    }
    let seeded = seed::seed();
    (seeded.graph, seeded.admin)
}

fn seed_and_unwrap_admin(graph: &ObjectGraph) -> Object {
    graph
        .store()
        .all_players()
        .into_iter()
        .next()
        .expect("a loaded world snapshot must contain at least one player")
}

/// Persists the world back to `config.world_db` (spec.md §6, used by
/// `@dump` and at clean shutdown).
pub fn save(graph: &ObjectGraph, config: &ServerConfig) -> io::Result<()> {
    moor_store::snapshot::dump(graph.store(), &config.world_db)
}

/// A minimal single-player line-oriented front end: reads commands from
/// stdin, dispatches them as the admin player seeded/loaded at startup, and
/// prints the result plus any queued notifications to stdout. Network
/// transport, multi-session routing, and authentication are explicit
/// Non-goals (spec.md Non-goals) — this loop exists so the rest of the
/// stack is runnable end to end.
pub fn run_repl(config: &ServerConfig) -> Result<()> {
    let (graph, player) = load_or_seed(config);
    let runtime = ScriptRuntime::new(RuntimeConfig {
        timeout: config.script_timeout(),
        max_call_depth: config.max_call_depth,
    });
    let dispatcher = Dispatcher::new(&graph, &runtime);

    println!("Connected as {} ({}).", player.name, player.dbref);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut current_player = player;

    for line in stdin.lock().lines() {
        let line = line.context("reading command from stdin")?;
        if line.trim().eq_ignore_ascii_case("quit") {
            break;
        }
        // Re-fetch in case the verb just executed mutated the player object.
        if let Ok(refreshed) = graph.get_object(current_player.id.as_str()) {
            current_player = refreshed;
        }
        let outcome = dispatcher.dispatch(&current_player, &line);
        if !outcome.text.is_empty() {
            writeln!(stdout, "{}", outcome.text)?;
        }
        for note in outcome.notifications {
            writeln!(stdout, "[to {}] {}", note.recipient.name, note.message)?;
        }
        // Fire any `fork`/`delay` tasks whose deadline has passed since the
        // last command (spec.md §4.9).
        for pending in dispatcher.run_pending() {
            if !pending.text.is_empty() {
                writeln!(stdout, "{}", pending.text)?;
            }
            for note in pending.notifications {
                writeln!(stdout, "[to {}] {}", note.recipient.name, note.message)?;
            }
        }
        stdout.flush()?;
    }

    save(&graph, config).context("saving world snapshot on exit")?;
    Ok(())
}
