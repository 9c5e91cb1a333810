//! Dependency resolution: turn a resolved profile into the list of files an
//! install has to fetch, plus the work that runs once they are on disk.

use crate::error::{InstallError, InstallResult};
use crate::game::installer::core::downloader::fetch_bytes;
use crate::game::installer::core::jre_manager::RuntimeSetup;
use crate::game::installer::core::traits::LoaderAdapter;
use crate::game::installer::types::InstallContext;
use crate::game::profile::resolved::ResolvedProfile;
use crate::game::profile::rules::Platform;
use crate::game::profile::version_parser::AssetIndexRef;
use crate::utils::fs::{file_matches, hash_eq, is_safe_segment, sha1_hex, write_atomic};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    ClientJar,
    Library,
    Native,
    LoggingConfig,
    Asset,
    LoaderArtifact,
    /// A file of a provisioned Java runtime
    Runtime,
}

/// Per-task lifecycle: `Pending -> InFlight -> Verified | Pending (retry) | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Pending,
    InFlight,
    Verified,
    Failed,
}

/// One file to fetch and verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// Destination relative to the data directory, `/`-separated
    pub id: String,
    pub kind: TaskKind,
    pub url: String,
    pub destination: PathBuf,
    pub sha1: Option<String>,
    pub size: Option<u64>,
    pub requires_auth: bool,
    /// Attempts made so far
    pub attempt: u32,
    pub state: TaskState,
}

impl DownloadTask {
    pub fn new(kind: TaskKind, url: impl Into<String>, destination: PathBuf, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            url: url.into(),
            destination,
            sha1: None,
            size: None,
            requires_auth: false,
            attempt: 0,
            state: TaskState::Pending,
        }
    }

    pub fn with_sha1(mut self, sha1: Option<String>) -> Self {
        self.sha1 = sha1.filter(|s| !s.is_empty());
        self
    }

    /// A size of zero is treated as unknown; some loader metadata publishes it
    /// for artifacts it does not describe.
    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size.filter(|s| *s > 0);
        self
    }

    pub fn requiring_auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }
}

/// A downloaded native archive and how to unpack it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeArchive {
    pub task_id: String,
    pub archive: PathBuf,
    pub exclude: Vec<String>,
}

/// Legacy asset layouts that need objects copied under their virtual names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualAssets {
    pub index_path: PathBuf,
    pub target_dir: PathBuf,
}

/// An entry (or, when `source` ends with `/`, a directory prefix) to copy
/// out of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub source: String,
    pub destination: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedOutput {
    pub path: PathBuf,
    pub sha1: Option<String>,
}

/// An external Java program run after downloads settle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorInvocation {
    /// Jar whose manifest names the main class
    pub jar: PathBuf,
    pub classpath: Vec<PathBuf>,
    pub args: Vec<String>,
    pub outputs: Vec<ExpectedOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcessKind {
    ExtractArchive {
        archive: PathBuf,
        entries: Vec<ArchiveEntry>,
    },
    RunProcessor(ProcessorInvocation),
}

/// Loader work that needs the downloaded files. Runs in declared order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostProcessTask {
    pub id: String,
    pub kind: PostProcessKind,
    pub attempt: u32,
    pub state: TaskState,
}

impl PostProcessTask {
    pub fn new(id: impl Into<String>, kind: PostProcessKind) -> Self {
        Self {
            id: id.into(),
            kind,
            attempt: 0,
            state: TaskState::Pending,
        }
    }
}

/// Extra work a loader adds on top of the profile's own files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderTasks {
    pub downloads: Vec<DownloadTask>,
    pub post_process: Vec<PostProcessTask>,
}

/// Ordered, de-duplicated list of everything an install needs.
#[derive(Debug, Clone, Default)]
pub struct FetchPlan {
    pub tasks: Vec<DownloadTask>,
    pub natives: Vec<NativeArchive>,
    pub post_process: Vec<PostProcessTask>,
    pub virtual_assets: Option<VirtualAssets>,
    pub asset_index_path: Option<PathBuf>,
    /// Asset paths in the index; can exceed the number of asset tasks
    pub asset_references: usize,
    /// Runtime whose files are among `tasks` and need finishing afterwards
    pub java_runtime: Option<RuntimeSetup>,
    /// Java used for post-processing
    pub java_executable: Option<PathBuf>,
    destinations: HashSet<PathBuf>,
}

impl FetchPlan {
    /// Add a task unless another one already targets the same destination.
    pub fn push(&mut self, task: DownloadTask) -> bool {
        if !self.destinations.insert(task.destination.clone()) {
            log::debug!("Skipping duplicate download target {}", task.id);
            return false;
        }
        self.tasks.push(task);
        true
    }

    pub fn extend_loader_tasks(&mut self, extra: LoaderTasks) {
        for task in extra.downloads {
            self.push(task);
        }
        self.post_process.extend(extra.post_process);
    }

    pub fn count_of(&self, kind: TaskKind) -> usize {
        self.tasks.iter().filter(|t| t.kind == kind).count()
    }

    pub fn task(&self, id: &str) -> Option<&DownloadTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Keep only the given download tasks, e.g. to retry the ids reported in
    /// an incomplete install. Native archives, post-processing and the Java
    /// runtime setup are kept: the natives directory is always rebuilt from
    /// every archive.
    /// Retained tasks start over as `Pending` with a fresh attempt budget.
    pub fn retain_ids(&mut self, ids: &[String]) {
        let keep: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.tasks.retain(|t| keep.contains(t.id.as_str()));
        for task in &mut self.tasks {
            task.state = TaskState::Pending;
            task.attempt = 0;
        }
        self.destinations = self.tasks.iter().map(|t| t.destination.clone()).collect();
    }

    pub fn total_expected_bytes(&self) -> Option<u64> {
        self.tasks.iter().map(|t| t.size).sum()
    }
}

/// Asset index document (`assets/indexes/<id>.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetIndexFile {
    /// Virtual path -> object; sorted so plans are stable
    pub objects: BTreeMap<String, AssetObject>,
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,
    #[serde(default)]
    pub map_to_resources: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

/// Expands profiles into fetch plans.
pub struct DependencyResolver<'a> {
    ctx: &'a InstallContext,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(ctx: &'a InstallContext) -> Self {
        Self { ctx }
    }

    /// Build the plan for `profile` on `platform`.
    ///
    /// Order: client jar, libraries, native archives, logging config, asset
    /// objects, then whatever `adapter` contributes.
    pub async fn expand(
        &self,
        profile: &ResolvedProfile,
        platform: &Platform,
        adapter: Option<&dyn LoaderAdapter>,
    ) -> InstallResult<FetchPlan> {
        let spec = &self.ctx.spec;
        let mut plan = FetchPlan::default();

        let client = profile.client_download.as_ref().ok_or_else(|| {
            InstallError::corrupt(&profile.id, "missing required field downloads.client")
        })?;
        let jar = spec.client_jar_path(&profile.minecraft_version);
        plan.push(
            DownloadTask::new(TaskKind::ClientJar, &client.url, jar.clone(), spec.task_id_for(&jar))
                .with_sha1(Some(client.sha1.clone()))
                .with_size(client.size),
        );

        let mut natives = Vec::new();
        for lib in profile.libraries_for(platform) {
            if let Some(artifact) = &lib.artifact {
                match &artifact.url {
                    Some(url) => {
                        let dest = spec.libraries_dir().join(&artifact.path);
                        plan.push(
                            DownloadTask::new(TaskKind::Library, url, dest.clone(), spec.task_id_for(&dest))
                                .with_sha1(artifact.sha1.clone())
                                .with_size(artifact.size),
                        );
                    }
                    None => log::debug!(
                        "{} has no download URL; expecting it to be produced locally",
                        lib.coordinate
                    ),
                }
            }

            if let Some(native) = lib.native_artifact(platform) {
                let Some(url) = native.url.clone() else {
                    log::warn!("Native archive for {} has no download URL", lib.coordinate);
                    continue;
                };
                let dest = spec.libraries_dir().join(&native.path);
                let exclude = lib
                    .natives
                    .as_ref()
                    .map(|n| n.exclude.clone())
                    .unwrap_or_default();
                natives.push((
                    DownloadTask::new(TaskKind::Native, url, dest.clone(), spec.task_id_for(&dest))
                        .with_sha1(native.sha1.clone())
                        .with_size(native.size),
                    exclude,
                ));
            }
        }
        for (task, exclude) in natives {
            let record = NativeArchive {
                task_id: task.id.clone(),
                archive: task.destination.clone(),
                exclude,
            };
            // A native archive shared by two libraries is extracted once.
            if plan.push(task) {
                plan.natives.push(record);
            }
        }

        if let Some(logging) = &profile.logging {
            if !is_safe_segment(&logging.file.id) {
                return Err(InstallError::corrupt(&profile.id, "logging config id is not a plain file name"));
            }
            let dest = spec.log_config_path(&logging.file.id);
            plan.push(
                DownloadTask::new(TaskKind::LoggingConfig, &logging.file.url, dest.clone(), spec.task_id_for(&dest))
                    .with_sha1(Some(logging.file.sha1.clone()))
                    .with_size(logging.file.size),
            );
        }

        if let Some(index_ref) = &profile.asset_index {
            let index = self.load_asset_index(index_ref).await?;
            let resources = self.ctx.config().endpoints.resources.trim_end_matches('/');
            for object in index.objects.values() {
                plan.asset_references += 1;
                let dest = spec.asset_object_path(&object.hash);
                let url = format!(
                    "{}/{}/{}",
                    resources,
                    object.hash.get(..2).unwrap_or(&object.hash),
                    object.hash
                );
                plan.push(
                    DownloadTask::new(TaskKind::Asset, url, dest.clone(), spec.task_id_for(&dest))
                        .with_sha1(Some(object.hash.clone()))
                        .with_size(Some(object.size)),
                );
            }
            let index_path = spec.asset_index_path(&index_ref.id);
            if index.map_to_resources {
                plan.virtual_assets = Some(VirtualAssets {
                    index_path: index_path.clone(),
                    target_dir: spec.game_dir.join("resources"),
                });
            } else if index.is_virtual {
                plan.virtual_assets = Some(VirtualAssets {
                    index_path: index_path.clone(),
                    target_dir: spec.assets_dir().join("virtual").join(&index_ref.id),
                });
            }
            plan.asset_index_path = Some(index_path);
        }

        if let Some(adapter) = adapter {
            let extra = adapter.extra_tasks(self.ctx, profile).await?;
            log::debug!(
                "{} adapter added {} download(s) and {} post-processing step(s)",
                adapter.kind(),
                extra.downloads.len(),
                extra.post_process.len()
            );
            plan.extend_loader_tasks(extra);
        }

        log::info!(
            "Planned {} download(s) for {} ({} asset object(s) for {} asset path(s), {} native archive(s))",
            plan.tasks.len(),
            profile.id,
            plan.count_of(TaskKind::Asset),
            plan.asset_references,
            plan.natives.len()
        );
        Ok(plan)
    }

    /// Load the asset index from disk when its hash matches, otherwise fetch,
    /// verify and cache it.
    pub async fn load_asset_index(&self, index_ref: &AssetIndexRef) -> InstallResult<AssetIndexFile> {
        let corrupt_id = format!("asset index {}", index_ref.id);
        if !is_safe_segment(&index_ref.id) {
            return Err(InstallError::corrupt(&corrupt_id, "index id is not a plain file name"));
        }
        let path = self.ctx.spec.asset_index_path(&index_ref.id);

        if file_matches(&path, Some(&index_ref.sha1), None).await {
            log::debug!("Using cached asset index {:?}", path);
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| InstallError::io(&path, e))?;
            return serde_json::from_slice(&bytes).map_err(|e| InstallError::corrupt(&corrupt_id, e));
        }

        log::info!("Fetching asset index {} from {}", index_ref.id, index_ref.url);
        let bytes = fetch_bytes(&self.ctx.client, &index_ref.url, self.ctx.config())
            .await
            .map_err(|e| InstallError::Network {
                url: index_ref.url.clone(),
                reason: e.to_string(),
            })?;
        let actual = sha1_hex(&bytes);
        if !hash_eq(&actual, &index_ref.sha1) {
            return Err(InstallError::corrupt(
                corrupt_id,
                format!("SHA1 mismatch: expected {}, got {}", index_ref.sha1, actual),
            ));
        }
        let index: AssetIndexFile =
            serde_json::from_slice(&bytes).map_err(|e| InstallError::corrupt(&corrupt_id, e))?;
        write_atomic(&path, bytes)
            .await
            .map_err(|e| InstallError::io(&path, e))?;
        Ok(index)
    }
}
