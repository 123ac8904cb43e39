use core::fmt;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use crate::{
    catalog::CatalogEntity,
    parser::{SourceFile, remove_illegal_chars},
};

/// What a source file was matched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Asset<'a> {
    Movie(&'a CatalogEntity),
    Series(&'a CatalogEntity),
    Collection(&'a str),
}

impl Asset<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Asset::Movie(_) => "Movie",
            Asset::Series(_) => "Series",
            Asset::Collection(_) => "Collection",
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Asset::Movie(entity) | Asset::Series(entity) => &entity.title,
            Asset::Collection(name) => name,
        }
    }
}

impl fmt::Display for Asset<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.title())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlaceError {
    #[error("{0} has no file extension")]
    NoExtension(String),

    #[error("{0} has no folder path in the catalog")]
    NoFolder(String),

    #[error("Unable to parse season number {token:?} from {filename}")]
    InvalidSeason { filename: String, token: String },

    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub from: PathBuf,
    pub to: PathBuf,
    /// The target name differs from the original one.
    pub renamed: bool,
}

fn folder_name<'a>(entity: &'a CatalogEntity) -> Result<&'a str, PlaceError> {
    entity
        .folder_name()
        .ok_or_else(|| PlaceError::NoFolder(entity.title.clone()))
}

fn season_name(folder: &str, file: &SourceFile, ext: &str) -> Result<String, PlaceError> {
    let name = &file.filename;

    if let Some((_, suffix)) = name.split_once("_Season") {
        return Ok(format!("{folder}_Season{suffix}"));
    }

    if name.contains("Season") {
        let token = name
            .split_once("Season ")
            .and_then(|(_, rest)| rest.split('.').next())
            .unwrap_or_default();
        let season: u32 = token
            .trim()
            .parse()
            .map_err(|_| PlaceError::InvalidSeason {
                filename: name.clone(),
                token: token.to_string(),
            })?;
        return Ok(format!("{folder}_Season{season:02}.{ext}"));
    }

    if name.contains("Specials") {
        return Ok(format!("{folder}_Season00.{ext}"));
    }

    Ok(format!("{folder}.{ext}"))
}

/// The name the file should have in the asset directory.
pub fn target_name(asset: Asset<'_>, file: &SourceFile) -> Result<String, PlaceError> {
    let ext = file
        .extension()
        .ok_or_else(|| PlaceError::NoExtension(file.filename.clone()))?;

    match asset {
        Asset::Movie(entity) => Ok(format!("{}.{ext}", folder_name(entity)?)),
        Asset::Series(entity) => season_name(folder_name(entity)?, file, ext),
        Asset::Collection(name) => Ok(format!("{}.{ext}", remove_illegal_chars(name))),
    }
}

fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        result => result,
    }
}

/// Move `file` from `source_dir` into `destination_dir` under its target name.
///
/// The move happens even when the name is already correct. With `dry_run`
/// the decision is logged and nothing on disk changes.
pub fn place(
    asset: Asset<'_>,
    file: &SourceFile,
    source_dir: &Path,
    destination_dir: &Path,
    dry_run: bool,
) -> Result<Placement, PlaceError> {
    let target = target_name(asset, file)?;
    let from = source_dir.join(&file.filename);
    let to = destination_dir.join(&target);
    let renamed = target != file.filename;

    if to != from && to.exists() {
        warn!("{} already exists and will be replaced", to.display());
    }

    let verb = match (dry_run, renamed) {
        (true, true) => "Would rename",
        (true, false) => "Would move",
        (false, true) => "Renamed",
        (false, false) => "Moved",
    };

    if !dry_run {
        move_file(&from, &to).map_err(|source| PlaceError::Move {
            from: from.clone(),
            to: to.clone(),
            source,
        })?;
    }

    if renamed {
        info!("{verb} {} -> {} ({asset})", file.filename, to.display());
    } else {
        info!("{verb} {} -> {}", file.filename, to.display());
    }

    Ok(Placement { from, to, renamed })
}
