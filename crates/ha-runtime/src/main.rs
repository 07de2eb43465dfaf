//! hass-lang: load, check and run a home automation program

use anyhow::{Context as _, Result};
use clap::Parser;
use ha_action_registry::ActionRegistry;
use ha_config::RuntimeConfig;
use ha_core::{SharedClock, SystemClock};
use ha_event_bus::EventBus;
use ha_runtime::{compile, AutomationEngine, AutomationService, CompiledProgram, LoadError};
use ha_state_store::StateStore;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SAMPLE: &str = include_str!("sample.hl");

#[derive(Parser, Debug)]
#[command(name = "hass-lang", version)]
#[command(about = "Parse, validate and run home automation programs")]
struct Args {
    /// Program file; defaults to `program` from the config, then a built-in sample
    file: Option<PathBuf>,

    /// Runtime configuration (YAML)
    #[arg(long, env = "HASS_LANG_CONFIG")]
    config: Option<PathBuf>,

    /// Print the syntax tree as JSON
    #[arg(long)]
    dump_ast: bool,

    /// Keep running the automations until Ctrl-C
    #[arg(long)]
    run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => RuntimeConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RuntimeConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let (name, source) = match args.file.as_ref().or(config.program.as_ref()) {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("failed to read program {}", path.display()))?;
            (path.display().to_string(), source)
        }
        None => ("<built-in sample>".to_string(), SAMPLE.to_string()),
    };

    let compiled = match compile(&source) {
        Ok(compiled) => compiled,
        Err(LoadError::Validation(diagnostics)) => {
            for d in &diagnostics {
                let (line, column) = d.location(&source);
                eprintln!("{name}:{line}:{column}: {d}");
            }
            anyhow::bail!("{name}: {} validation error(s)", diagnostics.len());
        }
        Err(e) => return Err(e).with_context(|| format!("failed to load {name}")),
    };

    println!(
        "{name}: parsed and validated ({} sites, {} entities, {} automations)",
        compiled.program.sites.len(),
        compiled.symbols.entity_count(),
        compiled.program.automations.len()
    );
    for automation in &compiled.program.automations {
        let title = if automation.display_name.is_empty() {
            "(unnamed)"
        } else {
            automation.display_name.as_str()
        };
        println!("  automation {title}: {} when clause(s)", automation.when_clauses.len());
    }

    if args.dump_ast {
        println!("{}", serde_json::to_string_pretty(&compiled.program)?);
    }

    if args.run {
        run(compiled, &config).await?;
    }

    Ok(())
}

async fn run(compiled: CompiledProgram, config: &RuntimeConfig) -> Result<()> {
    let clock: SharedClock = Arc::new(SystemClock);
    let bus = Arc::new(EventBus::with_capacity(config.event_bus_capacity));
    let store = Arc::new(StateStore::with_clock(bus.clone(), clock.clone()));
    let actions = Arc::new(ActionRegistry::logging());

    let offset = config
        .utc_offset()
        .context("utc_offset_minutes out of range")?;
    let mut engine = AutomationEngine::new(store, actions, clock.clone()).with_utc_offset(offset);
    engine.load(compiled.program, compiled.symbols);

    let service = AutomationService::new(engine, bus, clock, config.tick_interval());
    let handle = service.start();
    info!("Running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");
    service.stop();
    if let Some(handle) = handle {
        handle.await?;
    }
    Ok(())
}
