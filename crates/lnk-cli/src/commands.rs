use std::path::Path;

use anyhow::{bail, Context};
use chrono::Utc;
use colored::Colorize;
use lnk_core::{find_record, scan_owner};
use lnk_server::{LnkServer, ServerConfig};
use lnk_store::{RecordStore, StoreConfig};
use lnk_types::{Link, LinkOwnerView};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::List(args) => cmd_list(args, &cli.format),
        Command::Show(args) => cmd_show(args, &cli.format),
        Command::Compact(args) => cmd_compact(args),
    }
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(db) = args.db {
        config.db_path = db;
    }
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(domain) = args.domain {
        config.domain = domain;
    }
    if let Some(dir) = args.static_dir {
        config.static_dir = Some(dir);
    }

    println!(
        "{} serving {} on {}",
        "lnk".green().bold(),
        config.db_path.display(),
        config.bind_addr.to_string().bold()
    );
    let runtime = tokio::runtime::Runtime::new().context("starting runtime")?;
    runtime.block_on(async move { LnkServer::open(config)?.serve().await })?;
    Ok(())
}

fn cmd_list(args: ListArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let records = open_existing(&args.db)?;
    let view = LinkOwnerView::new(&args.owner, scan_owner(&records, &args.owner)?);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
        OutputFormat::Text => {
            if view.is_empty() {
                println!("No links for {}.", args.owner.bold());
            }
            for link in &view.links {
                println!(
                    "{}  {}  {}  {}",
                    link.alias.yellow().bold(),
                    status(link),
                    link.updated_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
                    link.origin
                );
            }
        }
    }
    Ok(())
}

fn cmd_show(args: ShowArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let records = open_existing(&args.db)?;
    let Some(link) = find_record(&records, &args.origin)? else {
        bail!("no record for {}", args.origin);
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&link)?),
        OutputFormat::Text => {
            println!("{} {}", "Origin:".bold(), link.origin);
            println!("  Alias:   {}", link.alias.yellow());
            println!("  Id:      {}", link.id);
            println!("  Owner:   {}", link.owner);
            println!("  Status:  {}", status(&link));
            println!("  TTL:     {}s", link.ttl.as_secs());
            println!("  Created: {}", link.created_at);
            println!("  Updated: {}", link.updated_at);
        }
    }
    Ok(())
}

fn cmd_compact(args: CompactArgs) -> anyhow::Result<()> {
    let records = open_existing(&args.db)?;
    records.compact()?;
    println!(
        "{} Compacted {} ({} records).",
        "✓".green(),
        args.db.display(),
        records.len()?
    );
    Ok(())
}

fn open_existing(db: &Path) -> anyhow::Result<RecordStore> {
    if !db.exists() {
        bail!("no journal at {}", db.display());
    }
    RecordStore::open(db, StoreConfig::default())
        .with_context(|| format!("opening {}", db.display()))
}

fn status(link: &Link) -> colored::ColoredString {
    if link.expired {
        "expired".red()
    } else if link.is_alive_at(Utc::now()) {
        "active".green()
    } else {
        "lapsed".yellow()
    }
}
