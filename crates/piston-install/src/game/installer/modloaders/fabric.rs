use crate::error::{InstallError, InstallResult, TransferError};
use crate::game::installer::core::downloader::fetch_bytes;
use crate::game::installer::core::traits::LoaderAdapter;
use crate::game::installer::types::{InstallContext, ModloaderType};
use crate::game::metadata::{fetch_loader_versions, pick_latest_stable};
use crate::game::profile::version_parser::VersionJson;
use crate::utils::fs::write_atomic;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};

/// Fabric: the meta service publishes a ready-made child profile.
pub struct FabricAdapter;

impl LoaderAdapter for FabricAdapter {
    fn kind(&self) -> ModloaderType {
        ModloaderType::Fabric
    }

    fn build_profile<'a>(
        &'a self,
        ctx: &'a InstallContext,
        minecraft_version: &'a str,
        loader_version: Option<&'a str>,
    ) -> BoxFuture<'a, InstallResult<VersionJson>> {
        let endpoints = &ctx.config().endpoints;
        Box::pin(build_loader_profile(
            ctx,
            LoaderMeta {
                kind: ModloaderType::Fabric,
                meta_url: &endpoints.fabric_meta,
                maven_url: &endpoints.fabric_maven,
            },
            minecraft_version,
            loader_version,
        ))
    }
}

/// Where a Fabric-compatible loader publishes its builds.
pub struct LoaderMeta<'a> {
    pub kind: ModloaderType,
    pub meta_url: &'a str,
    pub maven_url: &'a str,
}

impl LoaderMeta<'_> {
    fn unsupported(&self, minecraft_version: &str, loader_version: &str, reason: impl Into<String>) -> InstallError {
        InstallError::UnsupportedVersion {
            loader: self.kind.to_string(),
            minecraft_version: minecraft_version.to_string(),
            loader_version: loader_version.to_string(),
            reason: reason.into(),
        }
    }
}

/// Generic profile lookup for Fabric/Quilt-compatible loaders.
///
/// The profile is cached under `cache/loader_profiles/` and reused on later
/// installs of the same build.
pub async fn build_loader_profile(
    ctx: &InstallContext,
    meta: LoaderMeta<'_>,
    minecraft_version: &str,
    loader_version: Option<&str>,
) -> InstallResult<VersionJson> {
    let loader_version = match loader_version {
        Some(v) => v.to_string(),
        None => {
            let versions = fetch_loader_versions(&ctx.client, ctx.config(), meta.meta_url, minecraft_version).await?;
            pick_latest_stable(&versions)
                .map(|v| v.version.clone())
                .ok_or_else(|| meta.unsupported(minecraft_version, "latest", "no loader builds published"))?
        }
    };
    log::info!(
        "Using {} loader {} for Minecraft {}",
        meta.kind,
        loader_version,
        minecraft_version
    );

    let path = loader_profile_path(ctx, meta.kind, minecraft_version, &loader_version);
    let mut profile = match read_cached_profile(&path).await {
        Some(profile) => profile,
        None => fetch_profile(ctx, &meta, minecraft_version, &loader_version, &path).await?,
    };

    match profile.inherits_from.as_deref() {
        Some(parent) if parent == minecraft_version => {}
        other => {
            return Err(meta.unsupported(
                minecraft_version,
                &loader_version,
                format!("profile inherits from {:?}", other),
            ))
        }
    }
    if profile.main_class.as_deref().map_or(true, str::is_empty) {
        return Err(meta.unsupported(minecraft_version, &loader_version, "profile has no main class"));
    }

    // Libraries without a repository come from the loader's own maven.
    for lib in &mut profile.libraries {
        if lib.downloads.is_none() && lib.url.as_deref().map_or(true, str::is_empty) {
            lib.url = Some(meta.maven_url.to_string());
        }
    }
    Ok(profile)
}

fn loader_profile_path(
    ctx: &InstallContext,
    kind: ModloaderType,
    minecraft_version: &str,
    loader_version: &str,
) -> PathBuf {
    ctx.spec
        .cache_dir()
        .join("loader_profiles")
        .join(kind.as_str())
        .join(minecraft_version)
        .join(format!("{}.json", loader_version))
}

async fn read_cached_profile(path: &Path) -> Option<VersionJson> {
    let bytes = tokio::fs::read(path).await.ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(profile) => {
            log::debug!("Using cached loader profile {:?}", path);
            Some(profile)
        }
        Err(e) => {
            log::warn!("Ignoring unreadable loader profile {:?}: {}", path, e);
            None
        }
    }
}

async fn fetch_profile(
    ctx: &InstallContext,
    meta: &LoaderMeta<'_>,
    minecraft_version: &str,
    loader_version: &str,
    path: &Path,
) -> InstallResult<VersionJson> {
    let url = format!(
        "{}/versions/loader/{}/{}/profile/json",
        meta.meta_url.trim_end_matches('/'),
        minecraft_version,
        loader_version
    );
    log::info!("Fetching {} profile from {}", meta.kind, url);

    let bytes = match fetch_bytes(&ctx.client, &url, ctx.config()).await {
        Ok(bytes) => bytes,
        Err(TransferError::Status { status: 400 | 404, .. }) => {
            return Err(meta.unsupported(minecraft_version, loader_version, "no such loader build"))
        }
        Err(e) => {
            return Err(InstallError::Network {
                url,
                reason: e.to_string(),
            })
        }
    };
    let profile: VersionJson = serde_json::from_slice(&bytes)
        .map_err(|e| meta.unsupported(minecraft_version, loader_version, format!("unreadable profile: {}", e)))?;
    write_atomic(path, bytes)
        .await
        .map_err(|e| InstallError::io(path, e))?;
    Ok(profile)
}
