/// Readers for the documents packed inside a Forge installer jar.
use crate::game::profile::version_parser::{Library, VersionJson};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

type Jar = zip::ZipArchive<File>;

/// `install_profile.json` of a 1.13+ installer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallProfile {
    #[serde(default)]
    pub spec: i32,
    #[serde(default)]
    pub version: String,
    /// Entry holding the child version document, usually `/version.json`
    #[serde(default)]
    pub json: Option<String>,
    #[serde(default)]
    pub data: HashMap<String, SidedDataEntry>,
    #[serde(default)]
    pub processors: Vec<Processor>,
    #[serde(default)]
    pub libraries: Vec<Library>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SidedDataEntry {
    pub client: String,
    #[serde(default)]
    pub server: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Processor {
    pub jar: String,
    #[serde(default)]
    pub classpath: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub outputs: Option<HashMap<String, String>>,
    #[serde(default)]
    pub sides: Option<Vec<String>>,
}

impl Processor {
    pub fn runs_on_client(&self) -> bool {
        self.sides
            .as_ref()
            .map_or(true, |sides| sides.iter().any(|s| s == "client"))
    }
}

/// Pre-1.13 installers carry the version document inline.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LegacyInstallProfile {
    pub install: LegacyInstallSection,
    #[serde(rename = "versionInfo")]
    pub version_info: VersionJson,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LegacyInstallSection {
    /// Maven coordinate of the universal jar
    pub path: Option<String>,
    /// Entry name of the universal jar inside the installer
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
}

#[derive(Debug, Clone)]
pub enum InstallerContents {
    Modern {
        profile: Box<InstallProfile>,
        version: VersionJson,
    },
    Legacy {
        install: LegacyInstallSection,
        version: VersionJson,
    },
}

impl InstallerContents {
    pub fn version(&self) -> &VersionJson {
        match self {
            InstallerContents::Modern { version, .. } | InstallerContents::Legacy { version, .. } => version,
        }
    }
}

fn open(jar_path: &Path) -> Result<Jar> {
    let file = File::open(jar_path).with_context(|| format!("Failed to open {:?}", jar_path))?;
    zip::ZipArchive::new(file).with_context(|| format!("Failed to read {:?} as ZIP", jar_path))
}

fn read_entry(jar: &mut Jar, name: &str) -> Result<String> {
    let mut entry = jar
        .by_name(name)
        .with_context(|| format!("{} not found in installer JAR", name))?;
    let mut contents = String::new();
    entry
        .read_to_string(&mut contents)
        .with_context(|| format!("Failed to read {}", name))?;
    Ok(contents)
}

fn read_json<T: DeserializeOwned>(jar: &mut Jar, name: &str) -> Result<T> {
    let contents = read_entry(jar, name)?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", name))
}

/// Read the install profile and child version document from an installer.
pub fn read_installer(installer_path: &Path) -> Result<InstallerContents> {
    log::debug!("Reading Forge installer {:?}", installer_path);
    let mut jar = open(installer_path)?;
    let raw: serde_json::Value = read_json(&mut jar, "install_profile.json")?;

    if raw.get("install").is_some() && raw.get("versionInfo").is_some() {
        let legacy: LegacyInstallProfile =
            serde_json::from_value(raw).context("Failed to parse legacy install_profile.json")?;
        log::debug!("Legacy installer for {}", legacy.version_info.id);
        return Ok(InstallerContents::Legacy {
            install: legacy.install,
            version: legacy.version_info,
        });
    }

    let profile: InstallProfile = serde_json::from_value(raw).context("Failed to parse install_profile.json")?;
    let json_entry = profile
        .json
        .as_deref()
        .unwrap_or("/version.json")
        .trim_start_matches('/')
        .to_string();
    let version: VersionJson = read_json(&mut jar, &json_entry)?;
    log::debug!(
        "Parsed install profile: spec={}, processors={}, version={}",
        profile.spec,
        profile.processors.len(),
        version.id
    );
    Ok(InstallerContents::Modern {
        profile: Box::new(profile),
        version,
    })
}

/// Extract the `Main-Class` attribute from a jar manifest.
pub fn extract_main_class_from_jar(jar_path: &Path) -> Result<String> {
    let mut jar = open(jar_path)?;
    let manifest = read_entry(&mut jar, "META-INF/MANIFEST.MF")?;
    manifest
        .lines()
        .find_map(|line| line.strip_prefix("Main-Class:"))
        .map(|class| class.trim().to_string())
        .filter(|class| !class.is_empty())
        .context("Main-Class attribute not found in manifest")
}
