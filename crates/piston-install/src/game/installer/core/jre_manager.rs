//! Java runtimes for installed profiles.
//!
//! Mojang publishes JVM builds per platform as a catalog (`all.json`) of
//! components, each with a manifest of individual files. A provisioned
//! runtime is planned as ordinary download tasks, so the engine verifies and
//! retries them like any other file. Installations already on the
//! machine can be discovered and used instead.

use crate::error::{InstallError, InstallResult};
use crate::game::installer::config::JavaRuntimePolicy;
use crate::game::installer::core::downloader::fetch_bytes;
use crate::game::installer::plan::{DownloadTask, FetchPlan, TaskKind};
use crate::game::installer::types::InstallContext;
use crate::game::profile::resolved::ResolvedProfile;
use crate::game::profile::rules::{OsName, Platform};
use crate::game::profile::version_parser::JavaVersion;
use crate::utils::fs::{file_matches, hash_eq, is_safe_relative, is_safe_segment, sha1_hex, write_atomic};
use crate::utils::process::QuietCommandExt;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Mojang component names and the Java major version each one ships.
const COMPONENTS: &[(&str, u32)] = &[
    ("jre-legacy", 8),
    ("java-runtime-alpha", 16),
    ("java-runtime-beta", 17),
    ("java-runtime-gamma", 17),
    ("java-runtime-delta", 21),
    ("java-runtime-epsilon", 25),
];

/// `all.json`: platform -> component -> published builds, newest first.
pub type RuntimeCatalog = HashMap<String, HashMap<String, Vec<RuntimeRelease>>>;

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeRelease {
    pub manifest: RemoteFile,
    pub version: RuntimeVersion,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteFile {
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

/// Name and release date of a published runtime build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeVersion {
    pub name: String,
    pub released: DateTime<Utc>,
}

/// Per-component file list.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeManifest {
    pub files: BTreeMap<String, RuntimeEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RuntimeEntry {
    File {
        #[serde(default)]
        executable: bool,
        downloads: RuntimeDownloads,
    },
    Directory,
    Link {
        target: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeDownloads {
    pub raw: RemoteFile,
}

/// A provisioned runtime and what has to happen once its files are on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSetup {
    pub component: String,
    pub version: RuntimeVersion,
    pub home: PathBuf,
    pub java: PathBuf,
    /// Files that must carry the executable bit
    pub executables: Vec<PathBuf>,
    /// Symlink path and its target, relative to the link's directory
    pub links: Vec<(PathBuf, String)>,
}

/// Mojang's component for a profile's Java requirement.
pub fn component_for(requirement: &JavaVersion) -> Option<String> {
    if let Some(component) = requirement.component.as_ref().filter(|c| !c.is_empty()) {
        return Some(component.clone());
    }
    COMPONENTS
        .iter()
        .rev()
        .find(|(_, major)| *major == requirement.major_version)
        .map(|(name, _)| name.to_string())
}

/// Platform key used by `all.json`, if Mojang publishes runtimes for it.
pub fn runtime_platform(platform: &Platform) -> Option<&'static str> {
    match (platform.os, platform.arch.as_str()) {
        (OsName::Linux, "x86_64") => Some("linux"),
        (OsName::Linux, "x86") => Some("linux-i386"),
        (OsName::Osx, "x86_64") => Some("mac-os"),
        (OsName::Osx, "aarch64") => Some("mac-os-arm64"),
        (OsName::Windows, "x86_64") => Some("windows-x64"),
        (OsName::Windows, "x86") => Some("windows-x86"),
        (OsName::Windows, "aarch64") => Some("windows-arm64"),
        _ => None,
    }
}

/// Pick the Java for this install and, when the policy asks for it, add
/// Mojang's runtime to `plan`.
///
/// An explicit `InstallSpec::java_path` always wins. Profiles without a
/// `javaVersion` leave the choice to the host.
pub async fn prepare_java(
    ctx: &InstallContext,
    profile: &ResolvedProfile,
    platform: &Platform,
    plan: &mut FetchPlan,
) -> InstallResult<()> {
    if let Some(path) = &ctx.spec.java_path {
        plan.java_executable = Some(path.clone());
        return Ok(());
    }
    let Some(requirement) = &profile.java_version else {
        log::debug!("{} declares no Java requirement", profile.id);
        return Ok(());
    };

    match ctx.config().java_runtime {
        JavaRuntimePolicy::Disabled => return Ok(()),
        JavaRuntimePolicy::System => {}
        JavaRuntimePolicy::Provision => {
            if let Some((tasks, setup)) = plan_runtime(ctx, requirement, platform).await? {
                log::info!(
                    "Planned Java runtime {} {} ({} files)",
                    setup.component,
                    setup.version.name,
                    tasks.len()
                );
                for task in tasks {
                    plan.push(task);
                }
                plan.java_executable = Some(setup.java.clone());
                plan.java_runtime = Some(setup);
                return Ok(());
            }
        }
    }

    match find_system_java(requirement.major_version, &[]).await {
        Some(found) => {
            log::info!("Using installed Java {} at {:?}", found.version, found.java_path);
            plan.java_executable = Some(found.java_path);
        }
        None => log::warn!(
            "No Java {} found; post-processing falls back to java on PATH",
            requirement.major_version
        ),
    }
    Ok(())
}

/// Plan Mojang's runtime for `requirement` on `platform`.
///
/// Returns `None` when no build of the component is published for the
/// platform. Every regular file of the component becomes a
/// [`TaskKind::Runtime`] task below `runtimes/<component>/`.
pub async fn plan_runtime(
    ctx: &InstallContext,
    requirement: &JavaVersion,
    platform: &Platform,
) -> InstallResult<Option<(Vec<DownloadTask>, RuntimeSetup)>> {
    let Some(component) = component_for(requirement) else {
        log::warn!("No runtime component known for Java {}", requirement.major_version);
        return Ok(None);
    };
    if !is_safe_segment(&component) {
        return Err(InstallError::corrupt(&component, "runtime component is not a plain file name"));
    }
    let Some(platform_key) = runtime_platform(platform) else {
        log::warn!(
            "No Java runtimes are published for {} {}",
            platform.os.as_str(),
            platform.arch
        );
        return Ok(None);
    };

    let url = &ctx.config().endpoints.java_runtimes;
    let bytes = fetch_bytes(&ctx.client, url, ctx.config())
        .await
        .map_err(|e| InstallError::Network {
            url: url.clone(),
            reason: e.to_string(),
        })?;
    let catalog: RuntimeCatalog =
        serde_json::from_slice(&bytes).map_err(|e| InstallError::corrupt("java runtime catalog", e))?;
    let Some(release) = catalog
        .get(platform_key)
        .and_then(|components| components.get(&component))
        .and_then(|builds| builds.first())
    else {
        log::warn!("Runtime {} is not published for {}", component, platform_key);
        return Ok(None);
    };

    let manifest = load_manifest(ctx, &component, &release.manifest).await?;
    let home = ctx.spec.runtime_dir(&component);
    let mut tasks = Vec::new();
    let mut executables = Vec::new();
    let mut links = Vec::new();
    for (name, entry) in &manifest.files {
        let relative = Path::new(name);
        if !is_safe_relative(relative) {
            return Err(InstallError::corrupt(&component, format!("unsafe runtime path {:?}", name)));
        }
        let dest = home.join(relative);
        match entry {
            RuntimeEntry::File { executable, downloads } => {
                if *executable {
                    executables.push(dest.clone());
                }
                tasks.push(
                    DownloadTask::new(TaskKind::Runtime, &downloads.raw.url, dest.clone(), ctx.spec.task_id_for(&dest))
                        .with_sha1(Some(downloads.raw.sha1.clone()))
                        .with_size(Some(downloads.raw.size)),
                );
            }
            RuntimeEntry::Link { target } => {
                if !link_stays_inside(relative, target) {
                    return Err(InstallError::corrupt(
                        &component,
                        format!("link {:?} points outside the runtime", name),
                    ));
                }
                links.push((dest, target.clone()));
            }
            RuntimeEntry::Directory => {}
        }
    }

    let java = java_in_manifest(&manifest, platform.os)
        .map(|rel| home.join(rel))
        .ok_or_else(|| InstallError::corrupt(&component, "runtime has no java executable"))?;

    Ok(Some((
        tasks,
        RuntimeSetup {
            component,
            version: release.version.clone(),
            home,
            java,
            executables,
            links,
        },
    )))
}

/// The component manifest, reused from `cache/runtime_manifests/` while its
/// hash matches the catalog.
async fn load_manifest(ctx: &InstallContext, component: &str, remote: &RemoteFile) -> InstallResult<RuntimeManifest> {
    let path = ctx
        .spec
        .cache_dir()
        .join("runtime_manifests")
        .join(format!("{}.json", component));
    let bytes = if file_matches(&path, Some(&remote.sha1), None).await {
        log::debug!("Using cached runtime manifest {:?}", path);
        tokio::fs::read(&path)
            .await
            .map_err(|e| InstallError::io(&path, e))?
    } else {
        log::info!("Fetching runtime manifest {} from {}", component, remote.url);
        let bytes = fetch_bytes(&ctx.client, &remote.url, ctx.config())
            .await
            .map_err(|e| InstallError::Network {
                url: remote.url.clone(),
                reason: e.to_string(),
            })?;
        let actual = sha1_hex(&bytes);
        if !hash_eq(&actual, &remote.sha1) {
            return Err(InstallError::corrupt(
                component,
                format!("SHA1 mismatch: expected {}, got {}", remote.sha1, actual),
            ));
        }
        write_atomic(&path, bytes.clone())
            .await
            .map_err(|e| InstallError::io(&path, e))?;
        bytes
    };
    serde_json::from_slice(&bytes).map_err(|e| InstallError::corrupt(component, e))
}

fn java_executable_name(os: OsName) -> &'static str {
    match os {
        OsName::Windows => "java.exe",
        _ => "java",
    }
}

/// Shortest `.../bin/java` among the manifest's files. macOS builds nest the
/// home inside `jre.bundle/Contents/Home`.
fn java_in_manifest(manifest: &RuntimeManifest, os: OsName) -> Option<&str> {
    let suffix = format!("bin/{}", java_executable_name(os));
    manifest
        .files
        .iter()
        .filter(|(name, entry)| {
            matches!(entry, RuntimeEntry::File { .. })
                && (*name == &suffix || name.ends_with(&format!("/{}", suffix)))
        })
        .map(|(name, _)| name.as_str())
        .min_by_key(|name| name.len())
}

/// Lexically resolve `target` against the directory of `link` and check the
/// result stays below the runtime home.
fn link_stays_inside(link: &Path, target: &str) -> bool {
    let mut depth: Vec<&std::ffi::OsStr> = link
        .parent()
        .map(|p| {
            p.components()
                .filter_map(|c| match c {
                    Component::Normal(name) => Some(name),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();
    for component in Path::new(target).components() {
        match component {
            Component::Normal(name) => depth.push(name),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth.pop().is_none() {
                    return false;
                }
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

/// Mark executables and create the links of a downloaded runtime.
pub async fn finalize_runtime(setup: &RuntimeSetup) -> Result<()> {
    let setup = setup.clone();
    tokio::task::spawn_blocking(move || finalize_runtime_sync(&setup)).await?
}

fn finalize_runtime_sync(setup: &RuntimeSetup) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        for file in &setup.executables {
            let mut perms = std::fs::metadata(file)
                .with_context(|| format!("Missing runtime file {:?}", file))?
                .permissions();
            if perms.mode() & 0o111 != 0o111 {
                perms.set_mode(perms.mode() | 0o755);
                std::fs::set_permissions(file, perms)
                    .with_context(|| format!("Failed to mark {:?} executable", file))?;
            }
        }
        for (link, target) in &setup.links {
            if std::fs::read_link(link).is_ok_and(|current| current == Path::new(target)) {
                continue;
            }
            let parent = link
                .parent()
                .with_context(|| format!("Link {:?} has no parent", link))?;
            std::fs::create_dir_all(parent)?;
            let staging = parent.join(format!(
                ".{}.link",
                link.file_name().unwrap_or_default().to_string_lossy()
            ));
            let _ = std::fs::remove_file(&staging);
            std::os::unix::fs::symlink(target, &staging)
                .with_context(|| format!("Failed to link {:?} -> {}", link, target))?;
            std::fs::rename(&staging, link).with_context(|| format!("Failed to place link {:?}", link))?;
        }
    }
    #[cfg(not(unix))]
    {
        if !setup.links.is_empty() {
            log::debug!("Skipping {} runtime link(s) on this platform", setup.links.len());
        }
    }

    if !setup.java.is_file() {
        bail!("Runtime {} has no java at {:?}", setup.component, setup.java);
    }
    log::info!("Java runtime {} ready at {:?}", setup.component, setup.home);
    Ok(())
}

/// A Java installation found on the machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JavaInstallation {
    /// Installation directory, the parent of `bin/`
    pub home: PathBuf,
    pub java_path: PathBuf,
    /// `javaw.exe` on Windows
    pub javaw_path: Option<PathBuf>,
    pub version: String,
    pub major_version: u32,
    pub is_64bit: bool,
    pub openjdk: bool,
}

fn default_search_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    #[cfg(windows)]
    {
        roots.push(PathBuf::from("C:\\Program Files\\Java"));
        roots.push(PathBuf::from("C:\\Program Files (x86)\\Java"));
        roots.push(PathBuf::from("C:\\Program Files\\Eclipse Adoptium"));
    }
    #[cfg(target_os = "macos")]
    {
        roots.push(PathBuf::from("/Library/Java/JavaVirtualMachines"));
    }
    #[cfg(target_os = "linux")]
    {
        roots.push(PathBuf::from("/usr/lib/jvm"));
        roots.push(PathBuf::from("/usr/lib/sdk"));
        roots.push(PathBuf::from("/usr/java"));
    }
    roots
}

/// Find the java executable in an installation directory: `bin/`, one nested
/// directory down, or the macOS `Contents/Home` layout.
pub fn find_java_executable(dir: &Path) -> Option<PathBuf> {
    let exe = java_executable_name(OsName::current());
    let direct = dir.join("bin").join(exe);
    if direct.is_file() {
        return Some(direct);
    }
    let macos = dir.join("Contents/Home/bin").join(exe);
    if macos.is_file() {
        return Some(macos);
    }
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        for candidate in [path.join("bin").join(exe), path.join("Contents/Home/bin").join(exe)] {
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

/// Java executables below the usual install locations and `additional`.
pub fn find_java_executables(additional: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for root in default_search_roots().into_iter().chain(additional.iter().cloned()) {
        let Ok(entries) = std::fs::read_dir(&root) else {
            continue;
        };
        let mut dirs: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        for dir in dirs {
            if let Some(java) = find_java_executable(&dir) {
                if seen.insert(java.clone()) {
                    found.push(java);
                }
            }
        }
    }
    found
}

/// Run `java -version` and describe the installation.
pub async fn java_information(java: &Path) -> Result<JavaInstallation> {
    let output = tokio::time::timeout(
        VERSION_TIMEOUT,
        Command::new(java)
            .arg("-version")
            .suppress_console()
            .kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output(),
    )
    .await
    .with_context(|| format!("{:?} did not answer within {:?}", java, VERSION_TIMEOUT))?
    .with_context(|| format!("Failed to run {:?}", java))?;

    // java -version prints to stderr
    let text = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stderr),
        String::from_utf8_lossy(&output.stdout)
    );
    let banner = parse_version_output(&text).with_context(|| format!("Unrecognised version output from {:?}", java))?;

    let home = java
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| java.to_path_buf());
    let javaw = home.join("bin").join("javaw.exe");
    Ok(JavaInstallation {
        javaw_path: javaw.is_file().then_some(javaw),
        home,
        java_path: java.to_path_buf(),
        version: banner.version,
        major_version: banner.major,
        is_64bit: banner.is_64bit,
        openjdk: banner.openjdk,
    })
}

#[derive(Debug, PartialEq, Eq)]
struct VersionBanner {
    version: String,
    major: u32,
    is_64bit: bool,
    openjdk: bool,
}

fn parse_version_output(text: &str) -> Option<VersionBanner> {
    let re = regex::Regex::new(r#"version "([^"]+)""#).ok()?;
    let version = re.captures(text)?.get(1)?.as_str().to_string();
    let major = parse_major_version(&version)?;
    let first_line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    Some(VersionBanner {
        major,
        is_64bit: text.contains("64-Bit"),
        openjdk: first_line.trim_start().starts_with("openjdk"),
        version,
    })
}

/// `1.8.0_372` is Java 8; `17.0.8`, `21-ea` and `25` are what they say.
fn parse_major_version(version: &str) -> Option<u32> {
    let mut parts = version.split(|c: char| !c.is_ascii_digit()).filter(|p| !p.is_empty());
    let first: u32 = parts.next()?.parse().ok()?;
    if first == 1 {
        return parts.next()?.parse().ok();
    }
    Some(first)
}

/// Every Java on PATH or below the usual locations (plus `additional`) that
/// answers `-version`.
pub async fn find_system_javas(additional: &[PathBuf]) -> Vec<JavaInstallation> {
    let additional = additional.to_vec();
    let mut candidates = tokio::task::spawn_blocking(move || find_java_executables(&additional))
        .await
        .unwrap_or_default();
    if let Ok(on_path) = which::which("java") {
        if !candidates.contains(&on_path) {
            candidates.insert(0, on_path);
        }
    }

    let mut found = Vec::new();
    for java in candidates {
        match java_information(&java).await {
            Ok(info) => found.push(info),
            Err(e) => log::debug!("Ignoring {:?}: {:#}", java, e),
        }
    }
    found
}

/// The first installed Java whose major version is exactly `major`.
pub async fn find_system_java(major: u32, additional: &[PathBuf]) -> Option<JavaInstallation> {
    find_system_javas(additional)
        .await
        .into_iter()
        .find(|java| java.major_version == major)
}
