use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_ENTITY_THRESHOLD: u8 = 87;
pub const DEFAULT_COLLECTION_THRESHOLD: u8 = 99;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_yml::Error),

    #[error("{name} is not set")]
    MissingDirectory { name: &'static str },

    #[error("{name} {} is not a directory", path.display())]
    NotADirectory { name: &'static str, path: PathBuf },

    #[error("{name} must be between 0 and 100, got {value}")]
    Threshold { name: &'static str, value: i64 },

    #[error("No {kind} instance named {name}")]
    UnknownInstance { kind: &'static str, name: String },

    #[error("{kind} instance {name} is missing {field}")]
    MissingField {
        kind: &'static str,
        name: String,
        field: &'static str,
    },

    #[error("plex is set but library_names is empty")]
    NoLibraries,

    #[error("No radarr, sonarr or plex instance is configured for the renamer")]
    NoSources,
}

#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    instances: Instances,
    #[serde(default)]
    renamer: RenamerConfig,
}

#[derive(Debug, Default, Deserialize)]
struct Instances {
    #[serde(default)]
    radarr: BTreeMap<String, InstanceConfig>,
    #[serde(default)]
    sonarr: BTreeMap<String, InstanceConfig>,
    #[serde(default)]
    plex: BTreeMap<String, InstanceConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct InstanceConfig {
    url: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RenamerConfig {
    source_dir: Option<PathBuf>,
    destination_dir: Option<PathBuf>,
    #[serde(default)]
    dry_run: bool,
    movies_threshold: Option<i64>,
    series_threshold: Option<i64>,
    collection_threshold: Option<i64>,
    #[serde(default)]
    radarr: Vec<String>,
    #[serde(default)]
    sonarr: Vec<String>,
    plex: Option<String>,
    #[serde(default)]
    library_names: Vec<String>,
    discord_webhook: Option<String>,
}

/// A named Radarr, Sonarr or Plex server. For Plex the key is the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub name: String,
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlexSource {
    pub instance: Instance,
    pub library_names: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub movies: u8,
    pub series: u8,
    pub collections: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            movies: DEFAULT_ENTITY_THRESHOLD,
            series: DEFAULT_ENTITY_THRESHOLD,
            collections: DEFAULT_COLLECTION_THRESHOLD,
        }
    }
}

/// Validated renamer settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub source_dir: PathBuf,
    pub destination_dir: PathBuf,
    pub dry_run: bool,
    pub thresholds: Thresholds,
    pub radarr: Vec<Instance>,
    pub sonarr: Vec<Instance>,
    pub plex: Option<PlexSource>,
    pub discord_webhook: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let user_config: UserConfig = serde_yml::from_str(yaml)?;
        Self::validate(user_config)
    }

    fn validate(user_config: UserConfig) -> Result<Self, ConfigError> {
        let UserConfig {
            instances,
            renamer,
        } = user_config;

        let source_dir = directory("source_dir", renamer.source_dir)?;
        let destination_dir = directory("destination_dir", renamer.destination_dir)?;

        let thresholds = Thresholds {
            movies: threshold(
                "movies_threshold",
                renamer.movies_threshold,
                DEFAULT_ENTITY_THRESHOLD,
            )?,
            series: threshold(
                "series_threshold",
                renamer.series_threshold,
                DEFAULT_ENTITY_THRESHOLD,
            )?,
            collections: threshold(
                "collection_threshold",
                renamer.collection_threshold,
                DEFAULT_COLLECTION_THRESHOLD,
            )?,
        };

        let radarr = renamer
            .radarr
            .iter()
            .map(|name| instance("radarr", &instances.radarr, name))
            .collect::<Result<Vec<_>, _>>()?;
        let sonarr = renamer
            .sonarr
            .iter()
            .map(|name| instance("sonarr", &instances.sonarr, name))
            .collect::<Result<Vec<_>, _>>()?;
        let plex = match renamer.plex {
            Some(name) => {
                if renamer.library_names.is_empty() {
                    return Err(ConfigError::NoLibraries);
                }
                Some(PlexSource {
                    instance: instance("plex", &instances.plex, &name)?,
                    library_names: renamer.library_names,
                })
            }
            None => None,
        };

        if radarr.is_empty() && sonarr.is_empty() && plex.is_none() {
            return Err(ConfigError::NoSources);
        }

        Ok(Self {
            source_dir,
            destination_dir,
            dry_run: renamer.dry_run,
            thresholds,
            radarr,
            sonarr,
            plex,
            discord_webhook: renamer.discord_webhook.filter(|url| !url.is_empty()),
        })
    }
}

fn directory(name: &'static str, path: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    let path = path.ok_or(ConfigError::MissingDirectory { name })?;
    if !path.is_dir() {
        return Err(ConfigError::NotADirectory { name, path });
    }
    Ok(path)
}

fn threshold(name: &'static str, value: Option<i64>, default: u8) -> Result<u8, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => u8::try_from(value)
            .ok()
            .filter(|threshold| *threshold <= 100)
            .ok_or(ConfigError::Threshold { name, value }),
    }
}

fn instance(
    kind: &'static str,
    instances: &BTreeMap<String, InstanceConfig>,
    name: &str,
) -> Result<Instance, ConfigError> {
    let config = instances
        .get(name)
        .ok_or_else(|| ConfigError::UnknownInstance {
            kind,
            name: name.to_string(),
        })?;
    let missing = |field| ConfigError::MissingField {
        kind,
        name: name.to_string(),
        field,
    };
    Ok(Instance {
        name: name.to_string(),
        url: config.url.clone().ok_or_else(|| missing("url"))?,
        api_key: config.api_key.clone().ok_or_else(|| missing("api_key"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dirs() -> (TempDir, String) {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("source")).unwrap();
        fs::create_dir_all(temp_dir.path().join("assets")).unwrap();
        let header = format!(
            "renamer:\n  source_dir: {}\n  destination_dir: {}\n",
            temp_dir.path().join("source").display(),
            temp_dir.path().join("assets").display()
        );
        (temp_dir, header)
    }

    const INSTANCES: &str = r#"
instances:
  radarr:
    radarr_1:
      url: http://localhost:7878
      api_key: radarr-key
  sonarr:
    sonarr_1:
      url: http://localhost:8989
      api_key: sonarr-key
    sonarr_anime:
      url: http://localhost:8990
      api_key: anime-key
  plex:
    plex_1:
      url: http://localhost:32400
      api_key: plex-token
"#;

    #[test]
    fn test_full_config() {
        let (temp_dir, header) = dirs();
        let yaml = format!(
            "{INSTANCES}{header}  dry_run: true
  movies_threshold: 90
  series_threshold: 85
  collection_threshold: 100
  radarr: [radarr_1]
  sonarr: [sonarr_anime, sonarr_1]
  plex: plex_1
  library_names: [Movies, Anime Movies]
  discord_webhook: https://discord.example/hook
"
        );

        let config = Config::from_yaml_str(&yaml).unwrap();

        assert_eq!(config.source_dir, temp_dir.path().join("source"));
        assert_eq!(config.destination_dir, temp_dir.path().join("assets"));
        assert!(config.dry_run);
        assert_eq!(
            config.thresholds,
            Thresholds {
                movies: 90,
                series: 85,
                collections: 100
            }
        );
        assert_eq!(config.radarr[0].url, "http://localhost:7878");
        assert_eq!(
            config
                .sonarr
                .iter()
                .map(|instance| instance.name.as_str())
                .collect::<Vec<_>>(),
            vec!["sonarr_anime", "sonarr_1"]
        );
        let plex = config.plex.unwrap();
        assert_eq!(plex.instance.api_key, "plex-token");
        assert_eq!(plex.library_names, vec!["Movies", "Anime Movies"]);
        assert_eq!(
            config.discord_webhook.as_deref(),
            Some("https://discord.example/hook")
        );
    }

    #[test]
    fn test_defaults() {
        let (_temp_dir, header) = dirs();
        let yaml = format!("{INSTANCES}{header}  radarr: [radarr_1]\n");

        let config = Config::from_yaml_str(&yaml).unwrap();

        assert!(!config.dry_run);
        assert_eq!(config.thresholds, Thresholds::default());
        assert_eq!(config.thresholds.collections, 99);
        assert!(config.sonarr.is_empty());
        assert!(config.plex.is_none());
        assert!(config.discord_webhook.is_none());
    }

    #[test]
    fn test_threshold_out_of_range() {
        let (_temp_dir, header) = dirs();
        for value in ["101", "-1"] {
            let yaml =
                format!("{INSTANCES}{header}  radarr: [radarr_1]\n  series_threshold: {value}\n");
            let err = Config::from_yaml_str(&yaml).unwrap_err();
            assert!(
                matches!(err, ConfigError::Threshold { name: "series_threshold", .. }),
                "unexpected error: {err}"
            );
        }
    }

    #[test]
    fn test_threshold_bounds_accepted() {
        let (_temp_dir, header) = dirs();
        let yaml = format!(
            "{INSTANCES}{header}  radarr: [radarr_1]\n  movies_threshold: 0\n  collection_threshold: 100\n"
        );
        let config = Config::from_yaml_str(&yaml).unwrap();
        assert_eq!(config.thresholds.movies, 0);
        assert_eq!(config.thresholds.collections, 100);
    }

    #[test]
    fn test_non_boolean_dry_run() {
        let (_temp_dir, header) = dirs();
        let yaml = format!("{INSTANCES}{header}  radarr: [radarr_1]\n  dry_run: maybe\n");
        assert!(matches!(
            Config::from_yaml_str(&yaml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_source_dir() {
        let yaml = format!("{INSTANCES}renamer:\n  destination_dir: /tmp\n  radarr: [radarr_1]\n");
        assert!(matches!(
            Config::from_yaml_str(&yaml),
            Err(ConfigError::MissingDirectory { name: "source_dir" })
        ));
    }

    #[test]
    fn test_destination_not_a_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.txt");
        fs::write(&file, "").unwrap();
        let yaml = format!(
            "{INSTANCES}renamer:\n  source_dir: {}\n  destination_dir: {}\n  radarr: [radarr_1]\n",
            temp_dir.path().display(),
            file.display()
        );
        assert!(matches!(
            Config::from_yaml_str(&yaml),
            Err(ConfigError::NotADirectory {
                name: "destination_dir",
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_instance() {
        let (_temp_dir, header) = dirs();
        let yaml = format!("{INSTANCES}{header}  sonarr: [sonarr_4k]\n");
        assert!(matches!(
            Config::from_yaml_str(&yaml),
            Err(ConfigError::UnknownInstance { kind: "sonarr", .. })
        ));
    }

    #[test]
    fn test_instance_missing_url() {
        let (_temp_dir, header) = dirs();
        let yaml = format!(
            "instances:\n  radarr:\n    radarr_1:\n      api_key: key\n{header}  radarr: [radarr_1]\n"
        );
        assert!(matches!(
            Config::from_yaml_str(&yaml),
            Err(ConfigError::MissingField { field: "url", .. })
        ));
    }

    #[test]
    fn test_plex_requires_libraries() {
        let (_temp_dir, header) = dirs();
        let yaml = format!("{INSTANCES}{header}  plex: plex_1\n");
        assert!(matches!(
            Config::from_yaml_str(&yaml),
            Err(ConfigError::NoLibraries)
        ));
    }

    #[test]
    fn test_no_sources() {
        let (_temp_dir, header) = dirs();
        let yaml = format!("{INSTANCES}{header}");
        assert!(matches!(
            Config::from_yaml_str(&yaml),
            Err(ConfigError::NoSources)
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(&temp_dir.path().join("config.yml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
