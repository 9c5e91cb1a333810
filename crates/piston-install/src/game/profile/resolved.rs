use crate::error::{InstallError, InstallResult};
use crate::game::metadata::ModloaderType;
use crate::game::profile::maven::MavenCoordinate;
use crate::game::profile::rules::{rules_allow, Platform};
use crate::game::profile::version_parser::{
    Argument, Arguments, Artifact, AssetIndexRef, Download, JavaVersion, Library, LoggingConfig,
    Rule, VersionJson,
};
use crate::utils::fs::is_safe_relative;
use std::collections::HashMap;
use std::path::Path;

/// Which loader produced a profile, with the loader's own version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LoaderKind {
    Vanilla,
    Fabric { loader_version: String },
    Quilt { loader_version: String },
    Forge { loader_version: String },
}

impl LoaderKind {
    /// Infer the loader from a profile id.
    ///
    /// Recognised shapes: `fabric-loader-<lv>-<mc>`, `quilt-loader-<lv>-<mc>`,
    /// `forge-loader-<fv>-<mc>`, `<mc>-forge-<fv>` and legacy
    /// `<mc>-Forge<fv>[-<mc>]`. Anything else is vanilla.
    pub fn detect(id: &str, minecraft_version: &str) -> Self {
        if id == minecraft_version {
            return LoaderKind::Vanilla;
        }
        let mc_suffix = format!("-{}", minecraft_version);
        let strip = |prefix: &str| -> Option<String> {
            id.strip_prefix(prefix).map(|rest| {
                rest.strip_suffix(mc_suffix.as_str())
                    .unwrap_or(rest)
                    .to_string()
            })
        };

        if let Some(v) = strip("fabric-loader-") {
            return LoaderKind::Fabric { loader_version: v };
        }
        if let Some(v) = strip("quilt-loader-") {
            return LoaderKind::Quilt { loader_version: v };
        }
        if let Some(v) = strip("forge-loader-") {
            return LoaderKind::Forge { loader_version: v };
        }
        let lower = id.to_ascii_lowercase();
        if let Some(pos) = lower.find("forge") {
            let rest = id[pos + "forge".len()..].trim_start_matches('-');
            let version = rest.strip_suffix(mc_suffix.as_str()).unwrap_or(rest);
            return LoaderKind::Forge {
                loader_version: version.to_string(),
            };
        }
        LoaderKind::Vanilla
    }

    pub fn modloader_type(&self) -> ModloaderType {
        match self {
            LoaderKind::Vanilla => ModloaderType::Vanilla,
            LoaderKind::Fabric { .. } => ModloaderType::Fabric,
            LoaderKind::Quilt { .. } => ModloaderType::Quilt,
            LoaderKind::Forge { .. } => ModloaderType::Forge,
        }
    }

    pub fn loader_version(&self) -> Option<&str> {
        match self {
            LoaderKind::Vanilla => None,
            LoaderKind::Fabric { loader_version }
            | LoaderKind::Quilt { loader_version }
            | LoaderKind::Forge { loader_version } => Some(loader_version),
        }
    }

    pub fn is_vanilla(&self) -> bool {
        matches!(self, LoaderKind::Vanilla)
    }
}

/// Where a library artifact comes from. `url` is `None` for artifacts that
/// are produced locally (e.g. by Forge processors) rather than downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSource {
    pub url: Option<String>,
    /// Path relative to the libraries directory, `/`-separated
    pub path: String,
    pub sha1: Option<String>,
    pub size: Option<u64>,
}

/// Native archive description carried by old-style LWJGL libraries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NativeSpec {
    /// OS name -> classifier, possibly containing `${arch}`
    pub classifiers: HashMap<String, String>,
    /// Classifier -> published artifact
    pub artifacts: HashMap<String, ArtifactSource>,
    /// Archive entry prefixes that must not be extracted
    pub exclude: Vec<String>,
}

/// A library after merging, ready for platform filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryEntry {
    pub coordinate: MavenCoordinate,
    pub artifact: Option<ArtifactSource>,
    pub rules: Vec<Rule>,
    pub natives: Option<NativeSpec>,
    /// Repository base used to derive URLs that are not published explicitly
    pub repository: String,
}

impl LibraryEntry {
    fn from_library(lib: &Library, default_repository: &str) -> Result<Self, String> {
        let coordinate: MavenCoordinate = lib.name.parse().map_err(|e| format!("{}", e))?;
        let repository = lib
            .url
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| default_repository.to_string());

        let published = lib.downloads.as_ref().and_then(|d| d.artifact.as_ref());
        let artifact = match published {
            Some(a) => Some(source_from_artifact(a, &coordinate)),
            // Old natives-only entries publish classifiers but no main artifact.
            None if lib.downloads.as_ref().is_some_and(|d| d.classifiers.is_some()) => None,
            None => Some(ArtifactSource {
                url: Some(coordinate.url_in(&repository)),
                path: coordinate.path(),
                sha1: lib.sha1.clone(),
                size: lib.size,
            }),
        };

        let natives = lib.natives.as_ref().map(|classifiers| NativeSpec {
            classifiers: classifiers.clone(),
            artifacts: lib
                .downloads
                .as_ref()
                .and_then(|d| d.classifiers.as_ref())
                .map(|map| {
                    map.iter()
                        .map(|(classifier, a)| {
                            let coord = coordinate.with_classifier(classifier);
                            (classifier.clone(), source_from_artifact(a, &coord))
                        })
                        .collect()
                })
                .unwrap_or_default(),
            exclude: lib
                .extract
                .as_ref()
                .map(|e| e.exclude.clone())
                .unwrap_or_default(),
        });

        // Paths are joined onto the libraries directory later.
        let derived = coordinate.path();
        let unsafe_path = artifact
            .iter()
            .chain(natives.iter().flat_map(|n| n.artifacts.values()))
            .map(|a| a.path.as_str())
            .chain([derived.as_str()])
            .find(|p| !is_safe_relative(Path::new(p)));
        if let Some(bad) = unsafe_path {
            return Err(format!("{} has unsafe artifact path {:?}", lib.name, bad));
        }

        Ok(Self {
            coordinate,
            artifact,
            rules: lib.rules.clone().unwrap_or_default(),
            natives,
            repository,
        })
    }

    pub fn applies_to(&self, platform: &Platform) -> bool {
        rules_allow(&self.rules, platform)
    }

    /// The native classifier for `platform`, with `${arch}` substituted.
    pub fn native_classifier(&self, platform: &Platform) -> Option<String> {
        self.natives
            .as_ref()?
            .classifiers
            .get(platform.os.as_str())
            .map(|c| c.replace("${arch}", platform.arch_bits()))
    }

    /// The native archive to fetch for `platform`, if this library has one.
    pub fn native_artifact(&self, platform: &Platform) -> Option<ArtifactSource> {
        let classifier = self.native_classifier(platform)?;
        let natives = self.natives.as_ref()?;
        if let Some(published) = natives.artifacts.get(&classifier) {
            return Some(published.clone());
        }
        let coord = self.coordinate.with_classifier(&classifier);
        Some(ArtifactSource {
            url: Some(coord.url_in(&self.repository)),
            path: coord.path(),
            sha1: None,
            size: None,
        })
    }
}

fn source_from_artifact(artifact: &Artifact, coordinate: &MavenCoordinate) -> ArtifactSource {
    ArtifactSource {
        url: artifact.url.clone().filter(|u| !u.is_empty()),
        path: artifact
            .path
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| coordinate.path()),
        sha1: artifact.sha1.clone().filter(|s| !s.is_empty()),
        size: artifact.size,
    }
}

/// A fully merged profile: no parent references remain.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProfile {
    pub id: String,
    pub loader: LoaderKind,
    pub minecraft_version: String,
    /// Profile ids from this one up to the root, in order
    pub ancestry: Vec<String>,
    pub main_class: String,
    pub libraries: Vec<LibraryEntry>,
    pub asset_index: Option<AssetIndexRef>,
    pub assets: Option<String>,
    pub java_version: Option<JavaVersion>,
    /// Unsubstituted argument templates; legacy `minecraftArguments` are
    /// tokenised into `game`
    pub arguments: Arguments,
    pub client_download: Option<Download>,
    pub logging: Option<LoggingConfig>,
    pub version_type: Option<String>,
    pub release_time: Option<String>,
}

impl ResolvedProfile {
    /// Build from a merged version JSON. `ancestry` lists the merged chain
    /// from child to root.
    pub fn from_version_json(
        json: VersionJson,
        ancestry: Vec<String>,
        default_repository: &str,
    ) -> InstallResult<Self> {
        let id = json.id.clone();
        let main_class = json
            .main_class
            .filter(|m| !m.is_empty())
            .ok_or_else(|| InstallError::corrupt(&id, "missing required field mainClass"))?;

        let libraries = json
            .libraries
            .iter()
            .map(|lib| LibraryEntry::from_library(lib, default_repository))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|reason| InstallError::corrupt(&id, reason))?;

        let minecraft_version = ancestry.last().cloned().unwrap_or_else(|| id.clone());
        let loader = LoaderKind::detect(&id, &minecraft_version);

        let arguments = match (json.arguments, json.minecraft_arguments) {
            (Some(args), _) if !args.game.is_empty() || !args.jvm.is_empty() => args,
            (_, Some(legacy)) => Arguments {
                game: tokenize_legacy(&legacy)
                    .into_iter()
                    .map(Argument::Simple)
                    .collect(),
                jvm: Vec::new(),
            },
            (args, None) => args.unwrap_or_default(),
        };

        Ok(Self {
            id,
            loader,
            minecraft_version,
            ancestry,
            main_class,
            libraries,
            asset_index: json.asset_index,
            assets: json.assets,
            java_version: json.java_version,
            arguments,
            client_download: json.downloads.and_then(|d| d.client),
            logging: json.logging.and_then(|l| l.client),
            version_type: json.version_type,
            release_time: json.release_time,
        })
    }

    /// Libraries whose rules admit `platform`, in profile order.
    pub fn libraries_for<'a>(&'a self, platform: &'a Platform) -> impl Iterator<Item = &'a LibraryEntry> {
        self.libraries.iter().filter(move |lib| lib.applies_to(platform))
    }
}

fn tokenize_legacy(arguments: &str) -> Vec<String> {
    shlex::split(arguments)
        .unwrap_or_else(|| arguments.split_whitespace().map(str::to_string).collect())
}
