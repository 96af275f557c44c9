//! Floodgate Migration CLI Tool
//!
//! Command-line interface for managing database migrations: bootstrap a
//! project (`init`), generate migration files (`create`), apply the next or
//! all pending migrations (`up`, `up-all`) and report state (`status`).
//! Every command exits non-zero on any surfaced error.

use clap::{Parser, Subcommand};
use floodgate::config::{self, MigrateConfig, DEFAULT_CONFIG_FILENAME, DEFAULT_MIGRATIONS_DIR};
use floodgate::migration::{create_migration_file, Migrator};
use floodgate::{connect, ClientExecutor};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "floodgate")]
#[command(about = "PostgreSQL migration management tool")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILENAME)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the migration environment (config file + migrations directory)
    Init {
        /// Path to the migrations directory
        #[arg(long, default_value = DEFAULT_MIGRATIONS_DIR)]
        dir: PathBuf,
    },

    /// Create a new migration file
    Create {
        /// Migration name; multiple words are joined with underscores
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },

    /// Apply the next pending migration
    Up,

    /// Apply all pending migrations
    UpAll,

    /// Show the status of migrations
    Status,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let result = match &cli.command {
        Commands::Init { dir } => handle_init(&cli.config, dir),
        Commands::Create { name } => handle_create(&cli.config, &name.join("_")),
        Commands::Up => handle_up(&cli.config),
        Commands::UpAll => handle_up_all(&cli.config),
        Commands::Status => handle_status(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {e}");
        process::exit(1);
    }
}

/// Connect and build the engine from the configuration file
fn open_migrator(config_path: &Path) -> Result<Migrator, Box<dyn Error>> {
    let cfg = MigrateConfig::load(config_path)?;
    let client = connect(&cfg.database.connection_string())?;
    let migrator = Migrator::new(ClientExecutor::new(client), &cfg.migrations.directory)?;
    Ok(migrator)
}

fn handle_init(config_path: &Path, dir: &Path) -> Result<(), Box<dyn Error>> {
    if !config_path.exists() {
        config::create_default(config_path)?;
        println!("Created configuration file: {}", config_path.display());
    }

    if !dir.exists() {
        fs::create_dir_all(dir)?;
        println!("Created migrations directory: {}", dir.display());

        // Seed a sample migration so the directory layout is obvious.
        let filename = create_migration_file(dir, "init")?;
        println!("Created sample migration: {filename}");
    }

    println!("✅ Migration environment initialized");
    Ok(())
}

fn handle_create(config_path: &Path, name: &str) -> Result<(), Box<dyn Error>> {
    let cfg = MigrateConfig::load(config_path)?;
    let filename = create_migration_file(&cfg.migrations.directory, name)?;
    println!("✅ Created migration: {filename}");
    Ok(())
}

fn handle_up(config_path: &Path) -> Result<(), Box<dyn Error>> {
    let mut migrator = open_migrator(config_path)?;
    let executed = migrator.execute_next()?;
    migrator.close();

    if executed {
        println!("✅ Migration up succeeded");
    } else {
        println!("No migrations to apply");
    }

    Ok(())
}

fn handle_up_all(config_path: &Path) -> Result<(), Box<dyn Error>> {
    let mut migrator = open_migrator(config_path)?;
    let count = migrator.execute_all()?;
    migrator.close();

    if count > 0 {
        println!("✅ Successfully applied {count} migration(s)");
    } else {
        println!("No migrations to apply");
    }

    Ok(())
}

fn handle_status(config_path: &Path) -> Result<(), Box<dyn Error>> {
    let mut migrator = open_migrator(config_path)?;
    let status = migrator.status()?;
    migrator.close();

    println!("\n📊 Migration Status\n");
    println!(
        "Total: {}, Applied: {}, Pending: {}\n",
        status.total, status.applied_count, status.pending_count
    );

    if status.migrations.is_empty() {
        println!("No migrations found");
        return Ok(());
    }

    println!("Migrations:");
    for migration in &status.migrations {
        match status.applied_at(&migration.id) {
            Some(applied_at) => {
                println!(
                    "  ✓ APPLIED  {}  {}",
                    applied_at.format("%Y-%m-%d %H:%M:%S"),
                    migration.id
                );
            }
            None => {
                println!("  ⏳ PENDING {:>20} {}", "", migration.id);
            }
        }
    }

    Ok(())
}
