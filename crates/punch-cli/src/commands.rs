use anyhow::{bail, Context};
use colored::Colorize;
use punch_db::seed::{seed_defaults, ADMINISTRATOR};
use punch_db::{schema, Database, DatabaseConfig};
use punch_persist::DiskCodec;
use punch_types::{Employee, Project, Record, Session, SystemConfiguration, TimeEntry, User};
use serde::Serialize;
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = database_config(&cli.store)?;
    match cli.command {
        Command::Init => cmd_init(config, cli.format),
        Command::Check => cmd_check(config, cli.format),
        Command::Stats => cmd_stats(config, cli.format),
        Command::Dump(args) => cmd_dump(config, &args.collection, cli.format),
    }
}

fn database_config(store: &StoreArgs) -> anyhow::Result<DatabaseConfig> {
    let config = match (&store.dir, &store.config) {
        (Some(dir), _) => DatabaseConfig::on_disk(dir),
        (None, Some(path)) => DatabaseConfig::load(path)?,
        (None, None) => bail!("no database given; pass --dir or --config"),
    };
    if !config.is_persistent() {
        bail!("configuration names no database directory");
    }
    Ok(config)
}

fn open(config: DatabaseConfig) -> anyhow::Result<Database> {
    let root = config.directory.clone().unwrap_or_default();
    Database::open_time_tracking(config)
        .with_context(|| format!("cannot open database at {}", root.display()))
}

/// Read-only commands must not create a database where none exists.
fn require_existing(config: &DatabaseConfig) -> anyhow::Result<()> {
    if let Some(dir) = &config.directory {
        if !dir.is_dir() {
            bail!("no database at {}", dir.display());
        }
    }
    Ok(())
}

fn cmd_init(config: DatabaseConfig, format: OutputFormat) -> anyhow::Result<()> {
    let db = open(config)?;
    let seeded = seed_defaults(&db)?;
    db.stop();

    let root = db.directory().map(|d| d.display().to_string()).unwrap_or_default();
    match format {
        OutputFormat::Json => println!("{}", json!({ "directory": root, "seeded": seeded })),
        OutputFormat::Text if seeded => {
            println!("{} Initialized punchclock database in {}", "✓".green().bold(), root.bold());
            println!("  Administrator: {}", ADMINISTRATOR.cyan());
        }
        OutputFormat::Text => println!(
            "Database in {} already holds {} records; left unchanged",
            root.bold(),
            db.total_records()
        ),
    }
    Ok(())
}

fn cmd_check(config: DatabaseConfig, format: OutputFormat) -> anyhow::Result<()> {
    require_existing(&config)?;
    let db = match Database::open_time_tracking(config) {
        Ok(db) => db,
        Err(e) if e.is_corruption() => {
            if format == OutputFormat::Text {
                println!("{} {}", "✗".red().bold(), e);
            }
            return Err(e.into());
        }
        Err(e) => return Err(e).context("cannot open database"),
    };
    db.stop();

    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({ "ok": true, "collections": db.collection_names().len(), "records": db.total_records() })
        ),
        OutputFormat::Text => println!(
            "{} {} records in {} collections, all readable",
            "✓".green().bold(),
            db.total_records(),
            db.collection_names().len()
        ),
    }
    Ok(())
}

fn cmd_stats(config: DatabaseConfig, format: OutputFormat) -> anyhow::Result<()> {
    require_existing(&config)?;
    let db = open(config)?;
    db.stop();

    let mut counts = serde_json::Map::new();
    for name in db.collection_names() {
        counts.insert(name.to_string(), json!(db.len_of(name)?));
    }
    match format {
        OutputFormat::Json => println!("{}", serde_json::Value::Object(counts)),
        OutputFormat::Text => {
            for (name, count) in &counts {
                println!("  {:<22} {}", name.bold(), count);
            }
            println!("  {:<22} {}", "total".dimmed(), db.total_records());
        }
    }
    Ok(())
}

fn cmd_dump(config: DatabaseConfig, collection: &str, format: OutputFormat) -> anyhow::Result<()> {
    require_existing(&config)?;
    let db = open(config)?;
    db.stop();

    match collection {
        schema::USERS => dump::<User>(&db, collection, format),
        schema::SESSIONS => dump::<Session>(&db, collection, format),
        schema::PROJECTS => dump::<Project>(&db, collection, format),
        schema::EMPLOYEES => dump::<Employee>(&db, collection, format),
        schema::TIME_ENTRIES => dump::<TimeEntry>(&db, collection, format),
        schema::SYSTEM_CONFIGURATION => dump::<SystemConfiguration>(&db, collection, format),
        other => bail!(
            "unknown collection `{other}`; expected one of: {}",
            schema::ALL.join(", ")
        ),
    }
}

fn dump<R: Record + Serialize>(
    db: &Database,
    collection: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let records = db
        .data_access::<R>(collection)?
        .read(|snapshot| snapshot.as_slice().to_vec());
    match format {
        OutputFormat::Json => {
            for record in &records {
                println!("{}", serde_json::to_string(record)?);
            }
        }
        OutputFormat::Text => {
            for record in &records {
                print!("{}", DiskCodec::serialize(record));
            }
        }
    }
    Ok(())
}
