mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::path::Path;
use std::process;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use cortex_sorter_core::config::load_configuration;
use cortex_sorter_core::storage::{FingerprintRecord, FingerprintStore};
use cortex_sorter_core::watch::spawn_watcher;
use cortex_sorter_core::{hasher, AppConfig, Orchestrator};
use dotenv::dotenv;
use progress::CliReporter;
use tracing::{error, info, warn};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    let Some(command) = args.command else {
        let _ = Cli::command().print_long_help();
        return Ok(());
    };

    let config = match load_configuration(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    match command {
        Commands::Watch => run_watch(&config)?,
        Commands::Sweep => run_sweep(&config)?,
        Commands::Lookup { file } => run_lookup(&config, &file)?,
        Commands::Find { name } => {
            let store = open_store(&config)?;
            let records = store.find_by_name(&name)?;
            if records.is_empty() {
                println!("No fingerprints named '{}'", name);
            }
            for record in &records {
                print_record(record);
            }
        }
        Commands::Count => {
            let store = open_store(&config)?;
            println!("{} fingerprints in store", store.count()?);
        }
        Commands::Forget { hash } => {
            let store = open_store(&config)?;
            match prompt_confirm(
                &format!("Forget fingerprint {}? Its content will be sorted again", hash),
                Some(false),
            ) {
                Ok(true) => {
                    if store.forget(&hash)? {
                        println!("Forgot {}", hash);
                    } else {
                        println!("No fingerprint {}", hash);
                    }
                }
                _ => process::exit(0),
            }
        }
        Commands::PrintConfig => {
            println!("Configuration: {:#?}", config);
        }
    }

    Ok(())
}

fn run_watch(config: &AppConfig) -> anyhow::Result<()> {
    let orchestrator =
        Orchestrator::from_config(config)?.with_reporter(Box::new(CliReporter::new()));

    let (events_tx, events_rx) = mpsc::sync_channel(config.watch.queue_capacity.max(1));
    let watcher = spawn_watcher(
        &config.source_folder,
        Duration::from_millis(config.watch.debounce_ms),
        events_tx,
    )?;

    let (stop_tx, stop_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .context("installing Ctrl-C handler")?;

    // The watcher is already live, so nothing created during the sweep is missed.
    if config.watch.sweep_on_start {
        if let Err(err) = orchestrator.sweep() {
            warn!("Startup sweep failed: {}", err);
        }
    }

    info!(
        "Watching {} with {} rules. Press Ctrl-C to stop.",
        watcher.path().display().to_string().cyan(),
        orchestrator.engine().rules().len()
    );

    let stats = thread::scope(|s| {
        let worker = s.spawn(|| orchestrator.run(events_rx));

        let _ = stop_rx.recv();
        info!("Shutting down; finishing files in flight...");
        // Dropping the watcher closes the event queue and ends `run`.
        drop(watcher);

        worker.join().map_err(|_| anyhow!("orchestrator thread panicked"))
    })?;

    println!();
    info!("Final: {}", stats.to_string().green());
    Ok(())
}

fn run_sweep(config: &AppConfig) -> anyhow::Result<()> {
    let orchestrator =
        Orchestrator::from_config(config)?.with_reporter(Box::new(CliReporter::new()));
    let stats = orchestrator.sweep()?;

    info!(
        "{} sorted, {} duplicates, {} unmatched, {} skipped, {} failed",
        format!("{}", stats.sorted).green(),
        format!("{}", stats.duplicate).yellow(),
        stats.unmatched,
        stats.skipped,
        format!("{}", stats.failed).red(),
    );
    Ok(())
}

fn run_lookup(config: &AppConfig, file: &Path) -> anyhow::Result<()> {
    let hash = hasher::hash_file(file)
        .with_context(|| format!("hashing '{}'", file.display()))?;
    let store = open_store(config)?;

    match store.lookup(&hash)? {
        Some(record) => print_record(&record),
        None => println!("{} {} (not seen before)", hash, "new".green()),
    }
    Ok(())
}

fn open_store(config: &AppConfig) -> anyhow::Result<FingerprintStore> {
    FingerprintStore::open(&config.database_path).with_context(|| {
        format!(
            "opening fingerprint store '{}'",
            config.database_path.display()
        )
    })
}

fn print_record(record: &FingerprintRecord) {
    println!(
        "{}  {}  {} bytes  first seen {}",
        record.hash.dimmed(),
        record.original_path,
        record.file_size,
        record.first_seen
    );
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
