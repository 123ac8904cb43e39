use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use posterarr::{
    catalog::CatalogSnapshot,
    config::Config,
    notify::DiscordNotifier,
    parser::SourceFile,
    placer::target_name,
    renamer::{Renamer, Resolution, source_files},
};
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled, settings::Style};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Match every file in the source directory and move it into the asset directory
    Rename {
        /// Log what would happen without touching any file
        #[arg(long)]
        dry_run: bool,
        /// Skip the confirmation prompt for a live run
        #[arg(long, short)]
        yes: bool,
    },
    /// Show what a single filename resolves to
    Match { filename: String },
    /// Show the title and year parsed from filenames
    Parse { filenames: Vec<String> },
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(long, short, env = "POSTERARR_CONFIG", default_value = "config.yml")]
    config: PathBuf,
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Tabled)]
struct ParsedRow {
    #[tabled(rename = "Filename")]
    filename: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Year")]
    year: String,
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "posterarr=debug"
    } else {
        "posterarr=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .init();
}

fn confirm(config: &Config) -> Result<bool> {
    inquire::Confirm::new(&format!(
        "Move matched files from {} to {}?",
        config.source_dir.display(),
        config.destination_dir.display()
    ))
    .with_default(false)
    .prompt()
    .context("Confirmation failed, pass --yes for unattended runs")
}

async fn rename(config_path: &Path, dry_run: bool, yes: bool) -> Result<()> {
    let config = Config::load(config_path)?;
    let dry_run = dry_run || config.dry_run;

    if dry_run {
        println!("{}", "DRY RUN: no files will be moved".yellow().bold());
    } else if !yes && !confirm(&config)? {
        bail!("Aborted");
    }

    let snapshot = CatalogSnapshot::fetch(&config).await?;
    let files = source_files(&config.source_dir)?;
    info!(
        "Processing {} files from {}",
        files.len(),
        config.source_dir.display()
    );

    let summary = Renamer::new(&config, &snapshot, dry_run).run(&files);

    println!("{}", summary.table());
    info!("{}", summary.headline());

    if let Some(webhook) = &config.discord_webhook {
        let notifier = DiscordNotifier::new(webhook)?;
        if let Err(err) = notifier.send(&summary).await {
            warn!("Failed to send notification: {err:#}");
        }
    }

    Ok(())
}

async fn resolve(config_path: &Path, filename: &str) -> Result<()> {
    let config = Config::load(config_path)?;
    let snapshot = CatalogSnapshot::fetch(&config).await?;
    let renamer = Renamer::new(&config, &snapshot, true);
    let file = SourceFile::parse(filename);

    match renamer.resolve(&file) {
        Resolution::Found { asset, source } => {
            let target = target_name(asset, &file)?;
            println!("{} {asset} from {source}", "Matched".green().bold());
            println!("{} -> {}", file.filename, target);
        }
        Resolution::Missing(reasons) if reasons.is_empty() => {
            println!("{} {}", "No match".red().bold(), file.filename);
        }
        Resolution::Missing(reasons) => {
            println!("{} {}", "Near miss".yellow().bold(), file.filename);
            for reason in reasons {
                println!("  {reason}");
            }
        }
    }
    Ok(())
}

fn parse(filenames: &[String]) {
    let rows = filenames.iter().map(|filename| {
        let file = SourceFile::parse(filename);
        ParsedRow {
            filename: file.filename,
            title: file.title,
            year: file.year.unwrap_or_default(),
        }
    });
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Commands::Rename { dry_run, yes } => rename(&args.config, dry_run, yes).await,
        Commands::Match { filename } => resolve(&args.config, &filename).await,
        Commands::Parse { filenames } => {
            parse(&filenames);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_rename_args() {
        let args = Args::try_parse_from(["posterarr", "-c", "renamer.yml", "rename", "--dry-run"]).unwrap();
        assert_eq!(args.config, PathBuf::from("renamer.yml"));
        assert!(matches!(
            args.command,
            Commands::Rename {
                dry_run: true,
                yes: false
            }
        ));
    }

    #[test]
    fn test_parse_verbose_after_subcommand() {
        let args = Args::try_parse_from(["posterarr", "match", "Inception (2010).jpg", "-v"]).unwrap();
        assert!(args.verbose);
        assert!(matches!(args.command, Commands::Match { ref filename } if filename == "Inception (2010).jpg"));
    }
}
