mod commands;
mod interrupt;
mod logging;
mod progress;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use gallery_core::storage::{Catalog, Database};
use gallery_core::{AppConfig, Cataloger, Rearranger, RunSummary};
use progress::CliReporter;
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let guard = logging::init_logger();

    let config = match gallery_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            drop(guard);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    let result = match args.command {
        Some(Commands::Rearrange {
            source,
            destination,
        }) => run_rearrange(&config, &source, &destination),
        Some(Commands::Catalog { source, db }) => run_catalog(&config, &source, db),
        Some(Commands::Lookup { file, db }) => run_lookup(&config, &file, db),
        Some(Commands::CatalogStats { db }) => run_catalog_stats(&config, db),
        Some(Commands::PrintConfig) => print_config(&config),
        Some(Commands::TruncateCatalog { db }) => run_truncate(&config, db),
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        drop(guard);
        process::exit(1);
    }
}

fn catalog_path(config: &AppConfig, db: Option<PathBuf>) -> PathBuf {
    db.unwrap_or_else(|| PathBuf::from(&config.catalog_path))
}

fn run_rearrange(config: &AppConfig, source: &Path, destination: &Path) -> anyhow::Result<()> {
    let rearranger = Rearranger::new(config.clone());
    interrupt::cancel_on_interrupt(rearranger.cancel_token());
    let reporter = CliReporter::new();
    let summary = rearranger.run(source, destination, &reporter)?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    info!(
        "{} files in {}",
        summary.total,
        format!("{:.2}s", summary.duration.as_secs_f64()).green(),
    );
    info!(
        "{} copied ({} renamed), {} already present, {} useless",
        format!("{}", summary.copied).green(),
        format!("{}", summary.renamed).cyan(),
        format!("{}", summary.skipped_identical).cyan(),
        summary.useless,
    );
    info!(
        "{} deferred, {} unknown, {} failed",
        format!("{}", summary.deferred).yellow(),
        format!("{}", summary.unknown).yellow(),
        format!("{}", summary.failed).red(),
    );
    if summary.cancelled {
        info!(
            "Cancelled: {} media files not processed",
            format!("{}", summary.not_scheduled).red()
        );
    }

    if !summary.deferred_paths.is_empty() {
        println!("{}", "Deferred (handle manually):".yellow());
        for path in &summary.deferred_paths {
            println!("  {}", path.display());
        }
    }
    if !summary.unknown_paths.is_empty() {
        println!("{}", "Unknown extension:".yellow());
        for path in &summary.unknown_paths {
            println!("  {}", path.display());
        }
    }
    if !summary.failures.is_empty() {
        println!("{}", "Failed:".red());
        for failure in &summary.failures {
            println!(
                "  [{}] {}: {}",
                failure.stage,
                failure.path.display(),
                failure.message
            );
        }
    }
}

fn run_catalog(config: &AppConfig, source: &Path, db: Option<PathBuf>) -> anyhow::Result<()> {
    let db_path = catalog_path(config, db);
    let db = Database::open(&db_path)
        .with_context(|| format!("opening catalog {}", db_path.display()))?;
    let cataloger = Cataloger::new(config.clone());
    interrupt::cancel_on_interrupt(cataloger.cancel_token());
    let reporter = CliReporter::new();
    let summary = cataloger.run(source, &db, &reporter)?;

    println!();
    info!(
        "{} files: {} added, {} already present, {} failed in {}",
        summary.total,
        format!("{}", summary.added).green(),
        format!("{}", summary.already_present).cyan(),
        format!("{}", summary.failed).red(),
        format!("{:.2}s", summary.duration.as_secs_f64()).green(),
    );
    if summary.cancelled {
        info!(
            "Cancelled: {} files not catalogued",
            format!("{}", summary.not_scheduled).red()
        );
    }
    for failure in &summary.failures {
        println!(
            "  [{}] {}: {}",
            failure.stage,
            failure.path.display(),
            failure.message
        );
    }
    Ok(())
}

fn run_lookup(config: &AppConfig, file: &Path, db: Option<PathBuf>) -> anyhow::Result<()> {
    let db_path = catalog_path(config, db);
    let db = Database::open(&db_path)
        .with_context(|| format!("opening catalog {}", db_path.display()))?;
    let digest = gallery_core::hasher::fingerprint(file)?;

    match db.find_by_fingerprint(&digest)? {
        Some(record) => {
            println!("{} {}", "Found".green(), digest);
            println!("  #{} {}", record.id, record.path);
            println!("  created {}", record.creation_time);
        }
        None => println!("{} {}", "Not catalogued".yellow(), digest),
    }
    Ok(())
}

fn run_catalog_stats(config: &AppConfig, db: Option<PathBuf>) -> anyhow::Result<()> {
    let db_path = catalog_path(config, db);
    let db = Database::open(&db_path)
        .with_context(|| format!("opening catalog {}", db_path.display()))?;
    println!("Records: {}", format!("{}", db.count()?).cyan());
    if let Some(last) = db.find_last_media()? {
        println!("Latest: #{} {} ({})", last.id, last.path, last.record_creation_time);
    }
    Ok(())
}

fn print_config(config: &AppConfig) -> anyhow::Result<()> {
    let rendered = toml::to_string_pretty(config).context("rendering configuration")?;
    println!("{}", rendered);
    Ok(())
}

fn run_truncate(config: &AppConfig, db: Option<PathBuf>) -> anyhow::Result<()> {
    let db_path = catalog_path(config, db);
    let prompt = format!(
        "Are you SURE you want to delete every record in {}?",
        db_path.display()
    );
    if !prompt_confirm(&prompt, Some(false))? {
        return Ok(());
    }
    let db = Database::open(&db_path)
        .with_context(|| format!("opening catalog {}", db_path.display()))?;
    db.truncate_all()?;
    println!("All catalog records deleted");
    Ok(())
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
