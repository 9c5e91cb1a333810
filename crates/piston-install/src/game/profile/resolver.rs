//! Loads version documents and folds `inheritsFrom` chains into a single
//! [`ResolvedProfile`].

use crate::error::{InstallError, InstallResult};
use crate::game::installer::core::downloader::fetch_bytes;
use crate::game::installer::types::InstallContext;
use crate::game::metadata::{fetch_catalog, VersionCatalog};
use crate::game::profile::resolved::ResolvedProfile;
use crate::game::profile::version_parser::{merge_version_json, VersionJson};
use crate::utils::fs::{file_matches, hash_eq, is_safe_segment, sha1_hex, write_atomic};
use std::collections::HashSet;
use std::path::Path;
use tokio::sync::OnceCell;

pub struct ManifestResolver<'a> {
    ctx: &'a InstallContext,
    catalog: OnceCell<VersionCatalog>,
}

impl<'a> ManifestResolver<'a> {
    pub fn new(ctx: &'a InstallContext) -> Self {
        Self {
            ctx,
            catalog: OnceCell::new(),
        }
    }

    /// The version catalog, fetched at most once per resolver.
    pub async fn catalog(&self) -> InstallResult<&VersionCatalog> {
        self.catalog
            .get_or_try_init(|| async {
                let cache = self.ctx.spec.catalog_cache_path();
                fetch_catalog(&self.ctx.client, self.ctx.config(), &cache).await
            })
            .await
    }

    /// Resolve `id` and every ancestor it inherits from into one profile.
    pub async fn resolve(&self, id: &str) -> InstallResult<ResolvedProfile> {
        let mut chain: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        let mut documents = Vec::new();
        let mut next = Some(id.to_string());

        while let Some(current) = next {
            if !seen.insert(current.clone()) {
                chain.push(current);
                log::error!("Inheritance cycle: {}", chain.join(" -> "));
                return Err(InstallError::InheritanceCycle { chain });
            }
            let json = self.load_version_json(&current).await?;
            if json.id != current {
                log::warn!("Version document {} declares id {}", current, json.id);
            }
            next = json.inherits_from.clone();
            chain.push(current);
            documents.push(json);
        }

        let mut from_root = documents.into_iter().rev();
        let root = from_root
            .next()
            .ok_or_else(|| InstallError::VersionNotFound(id.to_string()))?;
        let merged = from_root.fold(root, merge_version_json);
        log::info!("Resolved {} ({})", id, chain.join(" -> "));

        ResolvedProfile::from_version_json(merged, chain, &self.ctx.config().endpoints.libraries)
    }

    /// Load one version document without following `inheritsFrom`.
    ///
    /// Catalog versions are served from disk when the stored copy matches the
    /// catalog hash and fetched (then verified and stored) otherwise. Ids the
    /// catalog does not know, such as loader profiles, must already exist on
    /// disk.
    pub async fn load_version_json(&self, id: &str) -> InstallResult<VersionJson> {
        if !is_safe_segment(id) {
            return Err(InstallError::corrupt(id, "version id is not a plain file name"));
        }
        let path = self.ctx.spec.version_json_path(id);
        let catalog = self.catalog().await;
        let descriptor = catalog.as_ref().ok().and_then(|c| c.find(id));

        let Some(descriptor) = descriptor else {
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                log::debug!("Using local version document {:?}", path);
                return read_version_json(id, &path).await;
            }
            return match catalog {
                Err(e) => Err(e),
                Ok(_) => Err(InstallError::VersionNotFound(id.to_string())),
            };
        };

        if file_matches(&path, Some(&descriptor.sha1), None).await {
            log::debug!("Version document {} is up to date", id);
            return read_version_json(id, &path).await;
        }

        log::info!("Fetching version document {} from {}", id, descriptor.url);
        let bytes = fetch_bytes(&self.ctx.client, &descriptor.url, self.ctx.config())
            .await
            .map_err(|e| InstallError::Network {
                url: descriptor.url.clone(),
                reason: e.to_string(),
            })?;
        let actual = sha1_hex(&bytes);
        if !descriptor.sha1.is_empty() && !hash_eq(&actual, &descriptor.sha1) {
            return Err(InstallError::corrupt(
                id,
                format!("SHA1 mismatch: expected {}, got {}", descriptor.sha1, actual),
            ));
        }
        let json: VersionJson = serde_json::from_slice(&bytes).map_err(|e| InstallError::corrupt(id, e))?;
        write_atomic(&path, bytes)
            .await
            .map_err(|e| InstallError::io(&path, e))?;
        Ok(json)
    }
}

async fn read_version_json(id: &str, path: &Path) -> InstallResult<VersionJson> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| InstallError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| InstallError::corrupt(id, e))
}
