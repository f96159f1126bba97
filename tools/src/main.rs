//! railmap-runner: headless driver for the rail mapper.
//!
//! Usage:
//!   railmap-runner --seed 12345 --ticks 200 --db rails.db
//!   railmap-runner --world-file worlds.json --data-dir ./data
//!   railmap-runner --ipc-mode            (JSON lines on stdin/stdout)

mod demo;

use anyhow::Result;
use railmap_core::{
    audit::AuditService,
    command::AdminCommand,
    config::MapperConfig,
    engine::{MapperEngine, ScanReport},
    host::{MemoryHost, MemoryWorld, VoxelHost},
    model::NetworkStats,
    store::MapStore,
    types::{Tick, WorldName},
};
use std::collections::BTreeMap;
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetStats,
    Tick { count: u64 },
    Command { command: AdminCommand },
    Quit,
}

#[derive(serde::Serialize)]
struct RunnerState {
    tick:              Tick,
    stats:             NetworkStats,
    active_entities:   usize,
    occupied_entities: usize,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let ticks = parse_arg(&args, "--ticks", 100u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = string_arg(&args, "--db").unwrap_or(":memory:");
    let data_dir = string_arg(&args, "--data-dir").unwrap_or("./data");
    let world_file = string_arg(&args, "--world-file");

    if !ipc_mode {
        println!("railmap-runner");
        println!("  seed:       {seed}");
        println!("  ticks:      {ticks}");
        println!("  db:         {db}");
        println!("  data_dir:   {data_dir}");
        println!("  world_file: {}", world_file.unwrap_or("(generated)"));
        println!();
    }

    let config = MapperConfig::load(data_dir).unwrap_or_else(|e| {
        log::warn!("{e}; using default config");
        MapperConfig::default()
    });

    let store = if db == ":memory:" { MapStore::in_memory()? } else { MapStore::open(db)? };
    store.migrate()?;

    let (host, audit): (Arc<dyn VoxelHost>, Option<Arc<dyn AuditService>>) = match world_file {
        Some(path) => {
            let worlds: BTreeMap<WorldName, MemoryWorld> =
                serde_json::from_str(&std::fs::read_to_string(path)?)?;
            let host: Arc<dyn VoxelHost> = Arc::new(MemoryHost::from_worlds(worlds));
            (host, None)
        }
        None => {
            let demo = demo::generate(seed);
            let host: Arc<dyn VoxelHost> = Arc::new(demo.host);
            let audit: Arc<dyn AuditService> = Arc::new(demo.audit);
            (host, Some(audit))
        }
    };

    let mut engine = MapperEngine::build(host, audit, store, config)?;

    if ipc_mode {
        run_ipc_loop(&mut engine)?;
    } else {
        let report = engine.scan(None, true)?;
        engine.run_ticks(ticks)?;
        print_summary(&engine, &report, ticks)?;
    }

    Ok(())
}

fn run_ipc_loop(engine: &mut MapperEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Tick { count } => {
                engine.run_ticks(count)?;
                writeln!(stdout, "{}", serde_json::to_string(&runner_state(engine)?)?)?;
            }
            IpcCommand::GetStats => {
                writeln!(stdout, "{}", serde_json::to_string(&runner_state(engine)?)?)?;
            }
            IpcCommand::Command { command } => {
                let reply = match engine.execute(command) {
                    Ok(outcome) => serde_json::to_value(outcome)?,
                    Err(e) => serde_json::json!({ "error": e.to_string() }),
                };
                writeln!(stdout, "{reply}")?;
            }
        }
        stdout.flush()?;
    }
    engine.flush()?;
    Ok(())
}

fn runner_state(engine: &MapperEngine) -> Result<RunnerState> {
    let tracker = engine.tracker();
    Ok(RunnerState {
        tick:              engine.clock.current_tick,
        stats:             engine.stats()?,
        active_entities:   tracker.active_count(),
        occupied_entities: tracker.occupied_count(),
    })
}

fn print_summary(engine: &MapperEngine, report: &ScanReport, ticks: u64) -> Result<()> {
    let stats = engine.stats()?;
    let tracker = engine.tracker();

    println!("=== SCAN ===");
    for s in &report.summaries {
        println!(
            "  {:<12} chunks {:>4} (+{} skipped) | cells {:>5} | rejected {:>4} | lines {:>3}",
            s.world, s.chunks_scanned, s.chunks_failed, s.cells_accepted, s.cells_rejected, s.lines
        );
    }
    for (world, reason) in &report.failures {
        println!("  {world:<12} FAILED: {reason}");
    }

    println!();
    println!("=== RUN SUMMARY ===");
    println!("  ticks run:      {ticks}");
    println!("  final tick:     {}", engine.clock.current_tick);
    println!("  track cells:    {}", stats.track_cells);
    println!("  networks:       {}", stats.networks);
    println!("  placers:        {}", stats.placers);
    println!("  entities:       {} ({} occupied)", tracker.active_count(), tracker.occupied_count());
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}
