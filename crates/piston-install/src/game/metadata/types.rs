use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Remote version catalog (`version_manifest_v2.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionCatalog {
    pub latest: LatestVersions,
    pub versions: Vec<VersionDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestVersions {
    pub release: String,
    pub snapshot: String,
}

/// One entry of the catalog. Immutable once published.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: VersionType,
    /// URL of the version JSON
    pub url: String,
    /// SHA1 of the version JSON
    pub sha1: String,
    pub release_time: DateTime<Utc>,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionType {
    Release,
    Snapshot,
    OldBeta,
    OldAlpha,
    Loader,
    #[serde(other)]
    Other,
}

impl VersionCatalog {
    pub fn find(&self, id: &str) -> Option<&VersionDescriptor> {
        self.versions.iter().find(|v| v.id == id)
    }

    pub fn latest_release(&self) -> &str {
        &self.latest.release
    }

    pub fn latest_snapshot(&self) -> &str {
        &self.latest.snapshot
    }

    /// Versions of the given type, newest first as published.
    pub fn versions_of(&self, version_type: VersionType) -> impl Iterator<Item = &VersionDescriptor> {
        self.versions
            .iter()
            .filter(move |v| v.version_type == version_type)
    }
}

/// Modloader type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModloaderType {
    Vanilla,
    Fabric,
    Quilt,
    Forge,
}

impl ModloaderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModloaderType::Vanilla => "vanilla",
            ModloaderType::Fabric => "fabric",
            ModloaderType::Quilt => "quilt",
            ModloaderType::Forge => "forge",
        }
    }
}

impl std::fmt::Display for ModloaderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ModloaderType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vanilla" => Ok(ModloaderType::Vanilla),
            "fabric" => Ok(ModloaderType::Fabric),
            "quilt" => Ok(ModloaderType::Quilt),
            "forge" => Ok(ModloaderType::Forge),
            _ => Err(anyhow::anyhow!("Unknown modloader type: {}", s)),
        }
    }
}

/// Information about a specific loader version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderVersionInfo {
    pub version: String,
    pub stable: bool,
}
