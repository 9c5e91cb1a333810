use super::types::*;
use crate::error::{InstallError, InstallResult, TransferError};
use crate::game::installer::config::InstallerConfig;
use crate::game::installer::core::downloader::fetch_bytes;
use crate::utils::fs::write_atomic;
use anyhow::Context;
use std::path::Path;

#[derive(Debug, serde::Deserialize)]
struct FabricGameMetaVersionInfo {
    loader: FabricLoaderMeta,
}

#[derive(Debug, serde::Deserialize)]
struct FabricLoaderMeta {
    version: String,
    stable: Option<bool>,
}

#[derive(Debug, serde::Deserialize)]
struct ForgeVersionsXml {
    versioning: ForgeVersioning,
}

#[derive(Debug, serde::Deserialize)]
struct ForgeVersioning {
    versions: ForgeVersionList,
}

#[derive(Debug, serde::Deserialize)]
struct ForgeVersionList {
    version: Vec<String>,
}

fn network(url: &str, e: impl std::fmt::Display) -> InstallError {
    InstallError::Network {
        url: url.to_string(),
        reason: e.to_string(),
    }
}

/// Fetch the Mojang version catalog, refreshing the local copy at
/// `cache_path`. When the network is unreachable the cached copy is used.
pub async fn fetch_catalog(
    client: &reqwest::Client,
    config: &InstallerConfig,
    cache_path: &Path,
) -> InstallResult<VersionCatalog> {
    let url = &config.endpoints.version_manifest;
    log::info!("Fetching version catalog from {}", url);

    let fetched = match fetch_bytes(client, url, config).await {
        Ok(bytes) => match serde_json::from_slice::<VersionCatalog>(&bytes) {
            Ok(catalog) => {
                if let Err(e) = write_atomic(cache_path, bytes).await {
                    log::warn!("Failed to cache version catalog at {:?}: {}", cache_path, e);
                }
                return Ok(catalog);
            }
            Err(e) => InstallError::corrupt("version_manifest", e),
        },
        Err(e) => network(url, e),
    };

    log::warn!("{}; falling back to cached catalog", fetched);
    match tokio::fs::read(cache_path).await {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .with_context(|| format!("Cached catalog {:?} is unreadable", cache_path))
            .map_err(|e| {
                log::warn!("{:#}", e);
                fetched
            }),
        Err(_) => Err(fetched),
    }
}

/// Loader builds published for `minecraft_version` by a Fabric-compatible
/// meta service, newest first. An unknown game version yields an empty list.
pub async fn fetch_loader_versions(
    client: &reqwest::Client,
    config: &InstallerConfig,
    meta_base: &str,
    minecraft_version: &str,
) -> InstallResult<Vec<LoaderVersionInfo>> {
    let url = format!(
        "{}/versions/loader/{}",
        meta_base.trim_end_matches('/'),
        minecraft_version
    );
    let bytes = match fetch_bytes(client, &url, config).await {
        Ok(bytes) => bytes,
        Err(TransferError::Status { status: 400 | 404, .. }) => return Ok(Vec::new()),
        Err(e) => return Err(network(&url, e)),
    };
    let entries: Vec<FabricGameMetaVersionInfo> =
        serde_json::from_slice(&bytes).map_err(|e| network(&url, e))?;
    Ok(entries
        .into_iter()
        .map(|e| LoaderVersionInfo {
            version: e.loader.version,
            stable: e.loader.stable.unwrap_or(false),
        })
        .collect())
}

/// First stable build, or the newest one when none is marked stable.
pub fn pick_latest_stable(versions: &[LoaderVersionInfo]) -> Option<&LoaderVersionInfo> {
    versions.iter().find(|v| v.stable).or_else(|| versions.first())
}

/// Forge builds for `minecraft_version` from the maven metadata, oldest
/// first. Returned values are the bare Forge version (`47.2.0`).
pub async fn fetch_forge_versions(
    client: &reqwest::Client,
    config: &InstallerConfig,
    minecraft_version: &str,
) -> InstallResult<Vec<String>> {
    let url = format!(
        "{}net/minecraftforge/forge/maven-metadata.xml",
        config.endpoints.forge_maven
    );
    let bytes = fetch_bytes(client, &url, config)
        .await
        .map_err(|e| network(&url, e))?;
    let xml = String::from_utf8_lossy(&bytes);
    let forge_xml: ForgeVersionsXml = serde_xml_rs::from_str(&xml).map_err(|e| network(&url, e))?;
    log::debug!(
        "Forge: {} total versions in maven metadata",
        forge_xml.versioning.versions.version.len()
    );
    Ok(forge_versions_for(&forge_xml, minecraft_version))
}

fn forge_versions_for(forge_xml: &ForgeVersionsXml, minecraft_version: &str) -> Vec<String> {
    let prefix = format!("{}-", minecraft_version);
    forge_xml
        .versioning
        .versions
        .version
        .iter()
        .filter_map(|v| v.strip_prefix(&prefix))
        // Old builds carry a trailing "-<mc>" branch suffix (1.7.10-10.13.4.1614-1.7.10).
        .map(|v| v.split('-').next().unwrap_or(v).to_string())
        .collect()
}
