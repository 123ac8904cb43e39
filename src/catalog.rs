use anyhow::{Context, Result, bail};
use core::fmt;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, time::Duration};
use tracing::{debug, info, warn};

use crate::config::{Config, Instance};

/// Bounds every catalog request. An expired request counts as the source being unavailable.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Movie,
    Series,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Movie => "Movie",
            EntityKind::Series => "Series",
        }
    }

    fn endpoint(&self) -> &'static str {
        match self {
            EntityKind::Movie => "movie",
            EntityKind::Series => "series",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CatalogEntity {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(rename = "path", default)]
    pub folder_path: String,
}

impl CatalogEntity {
    pub fn year_text(&self) -> Option<String> {
        self.year.map(|year| year.to_string())
    }

    /// Last component of the folder path. Handles both separators since the
    /// catalog host may not be the one running this.
    pub fn folder_name(&self) -> Option<&str> {
        self.folder_path
            .trim_end_matches(['/', '\\'])
            .rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.is_empty())
    }
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

/// Client for the Radarr or Sonarr v3 API.
pub struct ArrClient {
    client: reqwest::Client,
    name: String,
    base_url: String,
    api_key: String,
    kind: EntityKind,
}

impl ArrClient {
    pub fn new(instance: &Instance, kind: EntityKind) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            name: instance.name.clone(),
            base_url: instance.url.trim_end_matches('/').to_string(),
            api_key: instance.api_key.clone(),
            kind,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub async fn entities(&self) -> Result<Vec<CatalogEntity>> {
        let url = format!("{}/api/v3/{}", self.base_url, self.kind.endpoint());
        let entities: Vec<CatalogEntity> = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .with_context(|| format!("Failed to GET {url}"))?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("Malformed {} list from {}", self.kind, self.name))?;
        debug!("{} returned {} entries", self.name, entities.len());
        Ok(entities)
    }
}

#[derive(Debug, Default, Deserialize)]
struct MediaContainer {
    #[serde(rename = "Directory", default)]
    directories: Vec<Directory>,
}

#[derive(Debug, Deserialize)]
struct Directory {
    #[serde(rename = "@key", default)]
    key: Option<String>,
    #[serde(rename = "@title")]
    title: String,
    #[serde(rename = "@smart", default)]
    smart: Option<String>,
}

impl Directory {
    fn is_smart(&self) -> bool {
        self.smart.as_deref() == Some("1")
    }
}

pub struct PlexClient {
    client: reqwest::Client,
    name: String,
    base_url: String,
    token: String,
}

impl PlexClient {
    pub fn new(instance: &Instance) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            name: instance.name.clone(),
            base_url: instance.url.trim_end_matches('/').to_string(),
            token: instance.api_key.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, path: &str) -> Result<MediaContainer> {
        let url = format!("{}{}", self.base_url, path);
        let body = self
            .client
            .get(&url)
            .header("X-Plex-Token", &self.token)
            .header("Accept", "application/xml")
            .send()
            .await
            .with_context(|| format!("Failed to GET {url}"))?
            .error_for_status()?
            .text()
            .await?;
        quick_xml::de::from_str(&body).with_context(|| format!("Malformed XML from {url}"))
    }

    /// Names of the non-smart collections in the given libraries.
    pub async fn collection_names(&self, libraries: &[String]) -> Result<BTreeSet<String>> {
        let sections = self.get("/library/sections").await?;
        let mut names = BTreeSet::new();

        for library in libraries {
            let Some(key) = sections
                .directories
                .iter()
                .find(|section| &section.title == library)
                .and_then(|section| section.key.as_deref())
            else {
                warn!("Library {library} not found on {}", self.name);
                continue;
            };

            let collections = self
                .get(&format!("/library/sections/{key}/collections"))
                .await?;
            names.extend(
                collections
                    .directories
                    .into_iter()
                    .filter(|collection| !collection.is_smart())
                    .map(|collection| collection.title),
            );
        }

        Ok(names)
    }
}

/// Entities fetched from one Radarr or Sonarr instance.
#[derive(Debug, Clone)]
pub struct EntitySource {
    pub name: String,
    pub kind: EntityKind,
    pub entities: Vec<CatalogEntity>,
}

/// Collection names fetched from one Plex instance.
#[derive(Debug, Clone)]
pub struct CollectionSource {
    pub name: String,
    pub names: BTreeSet<String>,
}

/// Everything the matcher is allowed to look at during a run. Fetched once, never mutated.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub sources: Vec<EntitySource>,
    pub collections: Option<CollectionSource>,
}

impl CatalogSnapshot {
    /// Sources in the order they were configured, movies before series.
    pub fn sources_of(&self, kind: EntityKind) -> impl Iterator<Item = &EntitySource> {
        self.sources.iter().filter(move |source| source.kind == kind)
    }

    /// Fetches every configured source. A failing source is skipped; the snapshot
    /// is only an error when nothing could be fetched.
    pub async fn fetch(config: &Config) -> Result<Self> {
        let mut clients = Vec::new();
        for instance in &config.radarr {
            clients.push(ArrClient::new(instance, EntityKind::Movie)?);
        }
        for instance in &config.sonarr {
            clients.push(ArrClient::new(instance, EntityKind::Series)?);
        }

        let results = join_all(clients.iter().map(|client| client.entities())).await;

        let mut snapshot = Self::default();
        let mut attempted = clients.len();
        for (client, result) in clients.iter().zip(results) {
            match result {
                Ok(entities) => {
                    info!(
                        "Fetched {} {} entries from {}",
                        entities.len(),
                        client.kind().as_str().to_lowercase(),
                        client.name()
                    );
                    snapshot.sources.push(EntitySource {
                        name: client.name().to_string(),
                        kind: client.kind(),
                        entities,
                    });
                }
                Err(err) => warn!("Skipping {}: {err:#}", client.name()),
            }
        }

        if let Some(plex) = &config.plex {
            attempted += 1;
            let client = PlexClient::new(&plex.instance)?;
            match client.collection_names(&plex.library_names).await {
                Ok(names) => {
                    info!("Fetched {} collections from {}", names.len(), client.name());
                    snapshot.collections = Some(CollectionSource {
                        name: client.name().to_string(),
                        names,
                    });
                }
                Err(err) => warn!("Skipping {}: {err:#}", client.name()),
            }
        }

        if attempted > 0 && snapshot.sources.is_empty() && snapshot.collections.is_none() {
            bail!("None of the {attempted} configured catalog sources could be reached");
        }

        Ok(snapshot)
    }
}
