use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use tabled::{Table, Tabled, settings::Style};
use tracing::{debug, error};
use walkdir::WalkDir;

use crate::{
    catalog::{CatalogSnapshot, EntityKind},
    config::Config,
    matcher::{MatchResult, match_collection, match_entity},
    parser::SourceFile,
    placer::{Asset, Placement, place},
};

/// Regular, non-hidden files directly inside `dir`, sorted by name.
pub fn source_files(dir: &Path) -> Result<Vec<SourceFile>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            debug!("Skipping non UTF-8 filename {:?}", entry.file_name());
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        files.push(SourceFile::parse(name));
    }
    Ok(files)
}

/// Where a file resolved to, or why it didn't.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    Found { asset: Asset<'a>, source: &'a str },
    Missing(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Placed {
        kind: &'static str,
        source: String,
        placement: Placement,
    },
    NearMiss(Vec<String>),
    Unmatched,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub filename: String,
    pub outcome: Outcome,
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub dry_run: bool,
    pub reports: Vec<FileReport>,
}

impl RunSummary {
    pub fn placed(&self, kind: &str) -> usize {
        self.reports
            .iter()
            .filter(|report| matches!(&report.outcome, Outcome::Placed { kind: k, .. } if *k == kind))
            .count()
    }

    pub fn near_misses(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::NearMiss(_)))
    }

    pub fn unmatched(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Unmatched))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Failed(_)))
    }

    fn count(&self, predicate: impl Fn(&Outcome) -> bool) -> usize {
        self.reports
            .iter()
            .filter(|report| predicate(&report.outcome))
            .count()
    }

    pub fn headline(&self) -> String {
        format!(
            "{} movies, {} series, {} collections, {} near misses, {} unmatched, {} errors",
            self.placed("Movie"),
            self.placed("Series"),
            self.placed("Collection"),
            self.near_misses(),
            self.unmatched(),
            self.failed()
        )
    }

    /// Table of every file that was placed, nearly matched or failed.
    pub fn table(&self) -> String {
        let rows: Vec<SummaryRow> = self
            .reports
            .iter()
            .filter_map(|report| {
                let (result, detail) = match &report.outcome {
                    Outcome::Placed {
                        kind, placement, ..
                    } => (
                        kind.green().to_string(),
                        placement
                            .to
                            .file_name()
                            .map(|name| name.to_string_lossy().to_string())
                            .unwrap_or_default(),
                    ),
                    Outcome::NearMiss(reasons) => ("Near miss".yellow().to_string(), reasons.join("\n")),
                    Outcome::Failed(reason) => ("Error".red().to_string(), reason.clone()),
                    Outcome::Unmatched => return None,
                };
                Some(SummaryRow {
                    file: report.filename.clone(),
                    result,
                    detail,
                })
            })
            .collect();

        let mut table = Table::new(rows);
        table.with(Style::rounded());
        table.to_string()
    }
}

/// Matches source files against a catalog snapshot and places them.
pub struct Renamer<'a> {
    config: &'a Config,
    snapshot: &'a CatalogSnapshot,
    dry_run: bool,
}

impl<'a> Renamer<'a> {
    pub fn new(config: &'a Config, snapshot: &'a CatalogSnapshot, dry_run: bool) -> Self {
        Self {
            config,
            snapshot,
            dry_run,
        }
    }

    /// Movie sources first, then series sources, then collections. The first match wins.
    pub fn resolve(&self, file: &SourceFile) -> Resolution<'a> {
        let snapshot = self.snapshot;
        let thresholds = self.config.thresholds;
        let mut reasons = Vec::new();

        for (kind, threshold) in [
            (EntityKind::Movie, thresholds.movies),
            (EntityKind::Series, thresholds.series),
        ] {
            if kind == EntityKind::Movie && file.is_season_asset() {
                debug!("{} is a season poster, skipping movie sources", file.filename);
                continue;
            }
            for source in snapshot.sources_of(kind) {
                match match_entity(&source.entities, file, kind, threshold) {
                    MatchResult::Matched(entity) => {
                        let asset = match kind {
                            EntityKind::Movie => Asset::Movie(entity),
                            EntityKind::Series => Asset::Series(entity),
                        };
                        return Resolution::Found {
                            asset,
                            source: &source.name,
                        };
                    }
                    MatchResult::NoMatch(Some(reason)) => {
                        debug!("{}: {reason}", source.name);
                        reasons.push(reason);
                    }
                    MatchResult::NoMatch(None) => {}
                }
            }
        }

        if let Some(collections) = &snapshot.collections {
            match match_collection(&collections.names, file, thresholds.collections) {
                MatchResult::Matched(name) => {
                    return Resolution::Found {
                        asset: Asset::Collection(name),
                        source: &collections.name,
                    };
                }
                MatchResult::NoMatch(Some(reason)) => {
                    debug!("{}: {reason}", collections.name);
                    reasons.push(reason);
                }
                MatchResult::NoMatch(None) => {}
            }
        }

        Resolution::Missing(reasons)
    }

    pub fn process(&self, file: &SourceFile) -> Outcome {
        match self.resolve(file) {
            Resolution::Found { asset, source } => match place(
                asset,
                file,
                &self.config.source_dir,
                &self.config.destination_dir,
                self.dry_run,
            ) {
                Ok(placement) => Outcome::Placed {
                    kind: asset.kind(),
                    source: source.to_string(),
                    placement,
                },
                Err(err) => {
                    error!("{}: {err}", file.filename);
                    Outcome::Failed(err.to_string())
                }
            },
            Resolution::Missing(reasons) if reasons.is_empty() => {
                debug!("No match for {}", file.filename);
                Outcome::Unmatched
            }
            Resolution::Missing(reasons) => Outcome::NearMiss(reasons),
        }
    }

    pub fn run(&self, files: &[SourceFile]) -> RunSummary {
        RunSummary {
            dry_run: self.dry_run,
            reports: files
                .iter()
                .map(|file| FileReport {
                    filename: file.filename.clone(),
                    outcome: self.process(file),
                })
                .collect(),
        }
    }
}
