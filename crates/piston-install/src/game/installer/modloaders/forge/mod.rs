pub mod parser;
pub mod processors;

use self::parser::{read_installer, InstallProfile, InstallerContents, LegacyInstallSection};
use crate::error::{InstallError, InstallResult, TransferError};
use crate::game::installer::core::downloader::{fetch_bytes, transfer_with_retry};
use crate::game::installer::core::traits::LoaderAdapter;
use crate::game::installer::plan::{
    ArchiveEntry, DownloadTask, ExpectedOutput, LoaderTasks, PostProcessKind, PostProcessTask, ProcessorInvocation,
    TaskKind,
};
use crate::game::installer::types::{InstallContext, ModloaderType};
use crate::game::metadata::fetch_forge_versions;
use crate::game::profile::maven::MavenCoordinate;
use crate::game::profile::resolved::{LoaderKind, ResolvedProfile};
use crate::game::profile::version_parser::{Artifact, LibraryDownloads, VersionJson};
use crate::utils::fs::file_matches;
use crate::utils::version::newest;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Forge: the child profile and the extra work both come from the installer
/// jar published on the Forge maven.
#[derive(Default)]
pub struct ForgeAdapter {
    /// Installer located by the last `build_profile` call
    installer: Mutex<Option<PathBuf>>,
}

impl ForgeAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn remember(&self, installer: &Path) {
        if let Ok(mut slot) = self.installer.lock() {
            *slot = Some(installer.to_path_buf());
        }
    }

    fn remembered(&self) -> Option<PathBuf> {
        self.installer.lock().ok().and_then(|slot| slot.clone())
    }
}

impl LoaderAdapter for ForgeAdapter {
    fn kind(&self) -> ModloaderType {
        ModloaderType::Forge
    }

    fn build_profile<'a>(
        &'a self,
        ctx: &'a InstallContext,
        minecraft_version: &'a str,
        loader_version: Option<&'a str>,
    ) -> BoxFuture<'a, InstallResult<VersionJson>> {
        Box::pin(async move {
            let forge_version = match loader_version {
                Some(v) => v
                    .strip_prefix(&format!("{}-", minecraft_version))
                    .unwrap_or(v)
                    .to_string(),
                None => {
                    let versions = fetch_forge_versions(&ctx.client, ctx.config(), minecraft_version).await?;
                    newest(versions.iter().map(String::as_str))
                        .map(str::to_string)
                        .ok_or_else(|| unsupported(minecraft_version, "latest", "no Forge builds published"))?
                }
            };
            log::info!("Using Forge {} for Minecraft {}", forge_version, minecraft_version);

            let installer = ensure_installer(ctx, minecraft_version, &forge_version).await?;
            let contents = read_contents(&installer)
                .await
                .map_err(|e| unsupported(minecraft_version, &forge_version, format!("unreadable installer: {:#}", e)))?;
            self.remember(&installer);

            let legacy_universal = match &contents {
                InstallerContents::Legacy { install, .. } => install.path.clone(),
                InstallerContents::Modern { .. } => None,
            };
            let mut version = match contents {
                InstallerContents::Modern { version, .. } | InstallerContents::Legacy { version, .. } => version,
            };

            if version.inherits_from.as_deref() != Some(minecraft_version) {
                return Err(unsupported(
                    minecraft_version,
                    &forge_version,
                    format!("installer profile inherits from {:?}", version.inherits_from),
                ));
            }
            if version.main_class.as_deref().map_or(true, str::is_empty) {
                return Err(unsupported(minecraft_version, &forge_version, "installer profile has no main class"));
            }

            let forge_maven = &ctx.config().endpoints.forge_maven;
            for lib in &mut version.libraries {
                // The universal jar ships inside legacy installers.
                if legacy_universal.as_deref() == Some(lib.name.as_str()) {
                    let path = lib.coordinate().map(|c| c.path());
                    lib.url = None;
                    lib.downloads = Some(LibraryDownloads {
                        artifact: Some(Artifact {
                            path,
                            url: Some(String::new()),
                            sha1: None,
                            size: None,
                        }),
                        classifiers: None,
                    });
                    continue;
                }
                // Legacy profiles still point at the retired files.minecraftforge.net maven.
                if lib.url.as_deref().is_some_and(|u| u.contains("files.minecraftforge.net")) {
                    lib.url = Some(forge_maven.clone());
                }
            }
            Ok(version)
        })
    }

    fn extra_tasks<'a>(
        &'a self,
        ctx: &'a InstallContext,
        profile: &'a ResolvedProfile,
    ) -> BoxFuture<'a, InstallResult<LoaderTasks>> {
        Box::pin(async move {
            let installer = match self.remembered() {
                Some(path) => path,
                None => {
                    let LoaderKind::Forge { loader_version } = &profile.loader else {
                        return Ok(LoaderTasks::default());
                    };
                    ensure_installer(ctx, &profile.minecraft_version, loader_version).await?
                }
            };
            let contents = read_contents(&installer)
                .await
                .map_err(|e| InstallError::corrupt(installer.display().to_string(), format!("{:#}", e)))?;
            match contents {
                InstallerContents::Modern { profile: install, .. } => modern_tasks(ctx, profile, &installer, &install),
                InstallerContents::Legacy { install, .. } => legacy_tasks(ctx, profile, &installer, &install),
            }
        })
    }
}

fn unsupported(minecraft_version: &str, forge_version: &str, reason: impl Into<String>) -> InstallError {
    InstallError::UnsupportedVersion {
        loader: ModloaderType::Forge.to_string(),
        minecraft_version: minecraft_version.to_string(),
        loader_version: forge_version.to_string(),
        reason: reason.into(),
    }
}

async fn read_contents(installer: &Path) -> anyhow::Result<InstallerContents> {
    let path = installer.to_path_buf();
    tokio::task::spawn_blocking(move || read_installer(&path)).await?
}

/// Locate or download `forge-<mc>-<forge>-installer.jar`, verified against
/// the maven `.sha1` sidecar when one is published.
async fn ensure_installer(ctx: &InstallContext, minecraft_version: &str, forge_version: &str) -> InstallResult<PathBuf> {
    let cache_dir = ctx.spec.cache_dir().join("forge_installers");
    // Old builds carry the game version twice: 1.7.10-10.13.4.1614-1.7.10
    let candidates = [
        format!("{}-{}", minecraft_version, forge_version),
        format!("{}-{}-{}", minecraft_version, forge_version, minecraft_version),
    ];

    for full in &candidates {
        let file_name = format!("forge-{}-installer.jar", full);
        let path = cache_dir.join(&file_name);
        let url = format!(
            "{}net/minecraftforge/forge/{}/{}",
            ctx.config().endpoints.forge_maven,
            full,
            file_name
        );

        let sha1 = match fetch_bytes(&ctx.client, &format!("{}.sha1", url), ctx.config()).await {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).trim().to_string()).filter(|s| s.len() == 40),
            Err(e) => {
                log::debug!("No checksum for {}: {}", file_name, e);
                None
            }
        };
        if file_matches(&path, sha1.as_deref(), None).await {
            log::info!("Using cached Forge installer {:?}", path);
            return Ok(path);
        }

        log::info!("Downloading Forge installer from {}", url);
        let task = DownloadTask::new(TaskKind::LoaderArtifact, &url, path.clone(), ctx.spec.task_id_for(&path))
            .with_sha1(sha1);
        match transfer_with_retry(&ctx.client, &task, ctx.config()).await {
            Ok(_) => return Ok(path),
            Err(TransferError::Status { status: 404, .. }) => continue,
            Err(e) => {
                return Err(InstallError::Network {
                    url,
                    reason: e.to_string(),
                })
            }
        }
    }
    Err(unsupported(minecraft_version, forge_version, "no installer published"))
}

fn library_path(profile_id: &str, libraries_dir: &Path, coordinate: &str) -> InstallResult<PathBuf> {
    let coordinate: MavenCoordinate = coordinate
        .parse()
        .map_err(|e| InstallError::corrupt(profile_id, e))?;
    Ok(libraries_dir.join(coordinate.path()))
}

fn bracketed(value: &str) -> Option<&str> {
    value.strip_prefix('[')?.strip_suffix(']')
}

fn unquoted(value: &str) -> &str {
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .unwrap_or(value)
}

fn substitute(text: &str, vars: &HashMap<String, String>) -> String {
    vars.iter()
        .fold(text.to_string(), |acc, (key, value)| acc.replace(&format!("{{{}}}", key), value))
}

/// Substitute `{VAR}` placeholders, then map a bracketed coordinate to its
/// library path.
fn resolve_arg(
    profile_id: &str,
    arg: &str,
    vars: &HashMap<String, String>,
    libraries_dir: &Path,
) -> InstallResult<String> {
    let substituted = substitute(arg, vars);
    match bracketed(&substituted) {
        Some(coordinate) => Ok(library_path(profile_id, libraries_dir, coordinate)?
            .to_string_lossy()
            .into_owned()),
        None => Ok(substituted),
    }
}

fn modern_tasks(
    ctx: &InstallContext,
    profile: &ResolvedProfile,
    installer: &Path,
    install: &InstallProfile,
) -> InstallResult<LoaderTasks> {
    let spec = &ctx.spec;
    let libraries_dir = spec.libraries_dir();
    let forge_maven = &ctx.config().endpoints.forge_maven;
    let mut tasks = LoaderTasks::default();

    // Processor tools and their classpath.
    for lib in &install.libraries {
        let coordinate = lib
            .coordinate()
            .ok_or_else(|| InstallError::corrupt(&profile.id, format!("invalid library name {}", lib.name)))?;
        let artifact = lib.downloads.as_ref().and_then(|d| d.artifact.as_ref());
        let url = match artifact {
            Some(a) => match a.url.as_deref().filter(|u| !u.is_empty()) {
                Some(url) => url.to_string(),
                // Shipped in the installer's maven/ tree
                None => continue,
            },
            None => coordinate.url_in(lib.url.as_deref().unwrap_or(forge_maven)),
        };
        let path = artifact
            .and_then(|a| a.path.clone())
            .unwrap_or_else(|| coordinate.path());
        let dest = libraries_dir.join(path);
        tasks.downloads.push(
            DownloadTask::new(TaskKind::LoaderArtifact, url, dest.clone(), spec.task_id_for(&dest))
                .with_sha1(artifact.and_then(|a| a.sha1.clone()))
                .with_size(artifact.and_then(|a| a.size)),
        );
    }

    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert("SIDE".into(), "client".into());
    vars.insert("MINECRAFT_VERSION".into(), profile.minecraft_version.clone());
    vars.insert(
        "MINECRAFT_JAR".into(),
        spec.client_jar_path(&profile.minecraft_version).to_string_lossy().into_owned(),
    );
    vars.insert("ROOT".into(), spec.data_dir.to_string_lossy().into_owned());
    vars.insert("LIBRARY_DIR".into(), libraries_dir.to_string_lossy().into_owned());
    vars.insert("INSTALLER".into(), installer.to_string_lossy().into_owned());

    let data_dir = spec.cache_dir().join("forge_data").join(&profile.id);
    let mut entries = vec![ArchiveEntry {
        source: "maven/".into(),
        destination: libraries_dir.clone(),
    }];
    for (key, entry) in &install.data {
        let value = entry.client.as_str();
        let resolved = if let Some(inner) = value.strip_prefix('/') {
            let dest = data_dir.join(inner);
            entries.push(ArchiveEntry {
                source: inner.to_string(),
                destination: dest.clone(),
            });
            dest.to_string_lossy().into_owned()
        } else if let Some(coordinate) = bracketed(value) {
            library_path(&profile.id, &libraries_dir, coordinate)?
                .to_string_lossy()
                .into_owned()
        } else {
            value.to_string()
        };
        vars.insert(key.clone(), resolved);
    }
    tasks.post_process.push(PostProcessTask::new(
        "forge:extract-installer",
        PostProcessKind::ExtractArchive {
            archive: installer.to_path_buf(),
            entries,
        },
    ));

    for (i, processor) in install.processors.iter().filter(|p| p.runs_on_client()).enumerate() {
        let jar = library_path(&profile.id, &libraries_dir, &processor.jar)?;
        let classpath = processor
            .classpath
            .iter()
            .map(|c| library_path(&profile.id, &libraries_dir, c))
            .collect::<InstallResult<Vec<_>>>()?;
        let args = processor
            .args
            .iter()
            .map(|a| resolve_arg(&profile.id, a, &vars, &libraries_dir))
            .collect::<InstallResult<Vec<_>>>()?;
        let mut outputs = processor
            .outputs
            .iter()
            .flatten()
            .map(|(key, value)| {
                Ok(ExpectedOutput {
                    path: PathBuf::from(resolve_arg(&profile.id, key, &vars, &libraries_dir)?),
                    sha1: Some(unquoted(&substitute(value, &vars)).to_string()).filter(|s| !s.is_empty()),
                })
            })
            .collect::<InstallResult<Vec<_>>>()?;
        outputs.sort_by(|a, b| a.path.cmp(&b.path));

        tasks.post_process.push(PostProcessTask::new(
            format!("forge:processor-{}:{}", i + 1, processor.jar),
            PostProcessKind::RunProcessor(ProcessorInvocation {
                jar,
                classpath,
                args,
                outputs,
            }),
        ));
    }

    log::info!(
        "Forge installer adds {} download(s) and {} processor(s)",
        tasks.downloads.len(),
        tasks.post_process.len() - 1
    );
    Ok(tasks)
}

fn legacy_tasks(
    ctx: &InstallContext,
    profile: &ResolvedProfile,
    installer: &Path,
    install: &LegacyInstallSection,
) -> InstallResult<LoaderTasks> {
    let mut tasks = LoaderTasks::default();
    if let (Some(file_path), Some(coordinate)) = (&install.file_path, &install.path) {
        let dest = library_path(&profile.id, &ctx.spec.libraries_dir(), coordinate)?;
        tasks.post_process.push(PostProcessTask::new(
            "forge:extract-universal",
            PostProcessKind::ExtractArchive {
                archive: installer.to_path_buf(),
                entries: vec![ArchiveEntry {
                    source: file_path.clone(),
                    destination: dest,
                }],
            },
        ));
    }
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::parser::tests::make_jar;
    use super::*;
    use crate::game::installer::types::InstallSpec;
    use crate::utils::fs::sha1_hex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const INSTALL_PROFILE: &str = r#"{
        "spec": 1,
        "version": "1.20.1-forge-47.2.0",
        "json": "/version.json",
        "data": {
            "MAPPINGS": {"client": "[de.oceanlabs.mcp:mcp_config:1.20.1:mappings@txt]", "server": ""},
            "BINPATCH": {"client": "/data/client.lzma", "server": "/data/server.lzma"},
            "PATCHED": {"client": "[net.minecraftforge:forge:1.20.1-47.2.0:client]", "server": ""},
            "PATCHED_SHA": {"client": "'3f1c2a0000000000000000000000000000000000'", "server": ""}
        },
        "processors": [
            {"jar": "net.minecraftforge:binarypatcher:1.1.1:fatjar",
             "classpath": ["net.sf.jopt-simple:jopt-simple:5.0.4"],
             "args": ["--clean", "{MINECRAFT_JAR}", "--output", "{PATCHED}", "--apply", "{BINPATCH}", "--map", "{MAPPINGS}"],
             "outputs": {"{PATCHED}": "{PATCHED_SHA}"}},
            {"sides": ["server"], "jar": "net.minecraftforge:installertools:1.3.0", "args": []}
        ],
        "libraries": [
            {"name": "net.minecraftforge:binarypatcher:1.1.1:fatjar",
             "downloads": {"artifact": {"path": "net/minecraftforge/binarypatcher/1.1.1/binarypatcher-1.1.1-fatjar.jar",
                 "url": "https://maven.minecraftforge.net/net/minecraftforge/binarypatcher/1.1.1/binarypatcher-1.1.1-fatjar.jar",
                 "sha1": "2fc9b9f7ad2bbd8fd09b0b9a8b6d7b1f1c2d3e4f", "size": 1}}},
            {"name": "net.minecraftforge:forge:1.20.1-47.2.0:universal",
             "downloads": {"artifact": {"path": "net/minecraftforge/forge/1.20.1-47.2.0/forge-1.20.1-47.2.0-universal.jar",
                 "url": "", "sha1": "aa", "size": 1}}}
        ]
    }"#;

    const VERSION: &str = r#"{
        "id": "1.20.1-forge-47.2.0",
        "inheritsFrom": "1.20.1",
        "mainClass": "cpw.mods.bootstraplauncher.BootstrapLauncher",
        "libraries": [{"name": "net.minecraftforge:fmlloader:1.20.1-47.2.0",
            "downloads": {"artifact": {"path": "net/minecraftforge/fmlloader/1.20.1-47.2.0/fmlloader-1.20.1-47.2.0.jar",
                "url": "https://maven.minecraftforge.net/net/minecraftforge/fmlloader/1.20.1-47.2.0/fmlloader-1.20.1-47.2.0.jar",
                "sha1": "bb", "size": 1}}}]
    }"#;

    async fn serve_installer(server: &MockServer, dir: &Path, full: &str, files: &[(&str, &[u8])]) {
        let jar = dir.join("upload.jar");
        make_jar(&jar, files);
        let body = std::fs::read(&jar).unwrap();
        let base = format!("/net/minecraftforge/forge/{0}/forge-{0}-installer.jar", full);
        Mock::given(method("GET"))
            .and(path(format!("{}.sha1", base)))
            .respond_with(ResponseTemplate::new(200).set_body_string(sha1_hex(&body)))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(base))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(server)
            .await;
    }

    fn ctx(server: &MockServer, dir: &Path) -> InstallContext {
        let mut spec = InstallSpec::new("1.20.1", dir.join("data"), dir.join("game"));
        spec.config.endpoints.forge_maven = format!("{}/", server.uri());
        spec.config.backoff_base_ms = 1;
        InstallContext::new(spec).unwrap()
    }

    #[tokio::test]
    async fn modern_installer_yields_profile_and_processor_tasks() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        serve_installer(
            &server,
            dir.path(),
            "1.20.1-47.2.0",
            &[
                ("install_profile.json", INSTALL_PROFILE.as_bytes()),
                ("version.json", VERSION.as_bytes()),
                ("data/client.lzma", b"patch"),
            ],
        )
        .await;
        let ctx = ctx(&server, dir.path());
        let adapter = ForgeAdapter::new();

        let version = adapter.build_profile(&ctx, "1.20.1", Some("47.2.0")).await.unwrap();
        assert_eq!(version.id, "1.20.1-forge-47.2.0");

        let profile = ResolvedProfile::from_version_json(
            version,
            vec!["1.20.1-forge-47.2.0".into(), "1.20.1".into()],
            "https://libraries.minecraft.net/",
        )
        .unwrap();
        let tasks = adapter.extra_tasks(&ctx, &profile).await.unwrap();

        // the universal jar has no URL and ships in maven/
        assert_eq!(tasks.downloads.len(), 1);
        assert!(tasks.downloads[0].id.ends_with("binarypatcher-1.1.1-fatjar.jar"));
        assert_eq!(tasks.post_process.len(), 2);

        let libs = ctx.spec.libraries_dir();
        match &tasks.post_process[0].kind {
            PostProcessKind::ExtractArchive { entries, .. } => {
                assert_eq!(entries[0].source, "maven/");
                assert!(entries.iter().any(|e| e.source == "data/client.lzma"));
            }
            other => panic!("unexpected first step {:?}", other),
        }
        match &tasks.post_process[1].kind {
            PostProcessKind::RunProcessor(inv) => {
                assert_eq!(
                    inv.jar,
                    libs.join("net/minecraftforge/binarypatcher/1.1.1/binarypatcher-1.1.1-fatjar.jar")
                );
                assert_eq!(inv.classpath, vec![libs.join("net/sf/jopt-simple/jopt-simple/5.0.4/jopt-simple-5.0.4.jar")]);
                let client_jar = ctx.spec.client_jar_path("1.20.1").to_string_lossy().into_owned();
                assert_eq!(inv.args[1], client_jar);
                let patched = libs.join("net/minecraftforge/forge/1.20.1-47.2.0/forge-1.20.1-47.2.0-client.jar");
                assert_eq!(inv.args[3], patched.to_string_lossy());
                assert!(inv.args[5].ends_with("client.lzma"));
                assert!(inv.args[7].ends_with("mcp_config-1.20.1-mappings.txt"));
                assert_eq!(inv.outputs.len(), 1);
                assert_eq!(inv.outputs[0].path, patched);
                assert_eq!(inv.outputs[0].sha1.as_deref(), Some("3f1c2a0000000000000000000000000000000000"));
            }
            other => panic!("unexpected second step {:?}", other),
        }
    }

    #[tokio::test]
    async fn legacy_installer_extracts_universal_jar() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        serve_installer(
            &server,
            dir.path(),
            "1.7.10-10.13.4.1614-1.7.10",
            &[(
                "install_profile.json",
                br#"{"install": {"path": "net.minecraftforge:forge:1.7.10-10.13.4.1614-1.7.10",
                                 "filePath": "forge-1.7.10-10.13.4.1614-1.7.10-universal.jar"},
                     "versionInfo": {"id": "1.7.10-Forge10.13.4.1614-1.7.10", "inheritsFrom": "1.7.10",
                                     "mainClass": "net.minecraft.launchwrapper.Launch",
                                     "libraries": [
                                        {"name": "net.minecraftforge:forge:1.7.10-10.13.4.1614-1.7.10",
                                         "url": "http://files.minecraftforge.net/maven/"},
                                        {"name": "com.typesafe:config:1.2.1",
                                         "url": "http://files.minecraftforge.net/maven/"}]}}"#,
            )],
        )
        .await;
        let mut spec = ctx(&server, dir.path()).spec;
        spec.version_id = "1.7.10".into();
        let ctx = InstallContext::new(spec).unwrap();
        let adapter = ForgeAdapter::new();

        // the short form 404s, the doubled form exists
        let version = adapter.build_profile(&ctx, "1.7.10", Some("10.13.4.1614")).await.unwrap();
        assert_eq!(version.libraries[0].url, None);
        assert_eq!(
            version.libraries[1].url.as_deref(),
            Some(ctx.config().endpoints.forge_maven.as_str())
        );

        let profile = ResolvedProfile::from_version_json(
            version,
            vec!["1.7.10-Forge10.13.4.1614-1.7.10".into(), "1.7.10".into()],
            "https://libraries.minecraft.net/",
        )
        .unwrap();
        // nothing to download for the universal jar
        assert!(profile.libraries[0].artifact.as_ref().unwrap().url.is_none());

        let tasks = adapter.extra_tasks(&ctx, &profile).await.unwrap();
        assert!(tasks.downloads.is_empty());
        match &tasks.post_process[0].kind {
            PostProcessKind::ExtractArchive { entries, .. } => {
                assert_eq!(entries[0].source, "forge-1.7.10-10.13.4.1614-1.7.10-universal.jar");
                assert!(entries[0]
                    .destination
                    .ends_with("net/minecraftforge/forge/1.7.10-10.13.4.1614-1.7.10/forge-1.7.10-10.13.4.1614-1.7.10.jar"));
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_installer_is_unsupported() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let err = ForgeAdapter::new()
            .build_profile(&ctx(&server, dir.path()), "1.20.1", Some("0.0.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::UnsupportedVersion { .. }));
    }

    #[test]
    fn argument_resolution() {
        let mut vars = HashMap::new();
        vars.insert("SIDE".to_string(), "client".to_string());
        vars.insert("OUT".to_string(), "[a.b:c:1]".to_string());
        let libs = Path::new("/libs");
        assert_eq!(resolve_arg("p", "--side={SIDE}", &vars, libs).unwrap(), "--side=client");
        assert_eq!(
            PathBuf::from(resolve_arg("p", "{OUT}", &vars, libs).unwrap()),
            libs.join("a/b/c/1/c-1.jar")
        );
        assert!(resolve_arg("p", "[bad]", &vars, libs).is_err());
        assert_eq!(unquoted("'abc'"), "abc");
        assert_eq!(unquoted("abc"), "abc");
    }
}
