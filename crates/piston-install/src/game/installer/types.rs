use crate::auth::Credentials;
use crate::error::{InstallError, InstallResult};
use crate::game::installer::config::InstallerConfig;
use crate::game::profile::rules::Platform;
use crate::game::profile::version_parser::Arguments;
use reqwest::Client;
use std::path::PathBuf;

// Re-export ModloaderType from metadata module for consistency
pub use crate::game::metadata::ModloaderType;

/// Progress reporter trait for installer operations
/// Implementations forward updates to the UI/notification system.
///
/// Calls come from the install's coordinating task. A panicking
/// implementation is logged and otherwise ignored.
pub trait ProgressReporter: Send + Sync {
    /// Start a new step with optional total steps
    fn start_step(&self, name: &str, total_steps: Option<u32>);

    /// Total bytes transferred so far in this install
    fn update_bytes(&self, transferred: u64, total: Option<u64>);

    /// Set overall percentage (0-100, or -1 for indeterminate)
    fn set_percent(&self, percent: i32);

    /// Set a short status message
    fn set_message(&self, message: &str);

    /// Number of settled tasks out of the planned total (e.g. "3/12").
    fn set_step_count(&self, current: u32, total: Option<u32>);

    /// Mark operation as complete
    fn done(&self, success: bool, message: Option<&str>);

    /// Lets a UI request cancellation by polling instead of holding the session.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A progress reporter that does nothing (silent).
/// Useful for background verification or tests.
pub struct SilentProgressReporter;

impl ProgressReporter for SilentProgressReporter {
    fn start_step(&self, _name: &str, _total_steps: Option<u32>) {}
    fn update_bytes(&self, _transferred: u64, _total: Option<u64>) {}
    fn set_percent(&self, _percent: i32) {}
    fn set_message(&self, _message: &str) {}
    fn set_step_count(&self, _current: u32, _total: Option<u32>) {}
    fn done(&self, _success: bool, _message: Option<&str>) {}
}

/// Installation specification
#[derive(Debug, Clone)]
pub struct InstallSpec {
    /// Minecraft version ID (e.g., "1.20.1")
    pub version_id: String,

    /// Modloader type (vanilla, fabric, quilt, forge)
    pub modloader: Option<ModloaderType>,

    /// Modloader version; the newest stable one is picked when absent
    pub modloader_version: Option<String>,

    /// Root data directory holding versions/, libraries/, assets/
    pub data_dir: PathBuf,

    /// Instance-specific game directory
    pub game_dir: PathBuf,

    /// Java used to run Forge processors. When absent the configured
    /// `JavaRuntimePolicy` picks one
    pub java_path: Option<PathBuf>,

    /// Target platform; the host when absent
    pub platform: Option<Platform>,

    /// Forwarded to endpoints that require authentication
    pub credentials: Option<Credentials>,

    pub config: InstallerConfig,
}

impl InstallSpec {
    pub fn new(version_id: impl Into<String>, data_dir: PathBuf, game_dir: PathBuf) -> Self {
        Self {
            version_id: version_id.into(),
            modloader: None,
            modloader_version: None,
            data_dir,
            game_dir,
            java_path: None,
            platform: None,
            credentials: None,
            config: InstallerConfig::default(),
        }
    }

    pub fn with_loader(mut self, loader: ModloaderType, version: Option<String>) -> Self {
        self.modloader = Some(loader).filter(|l| *l != ModloaderType::Vanilla);
        self.modloader_version = version;
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform.clone().unwrap_or_else(Platform::current)
    }

    /// Get the path to the libraries directory
    pub fn libraries_dir(&self) -> PathBuf {
        self.data_dir.join("libraries")
    }

    /// Get the path to the assets directory
    pub fn assets_dir(&self) -> PathBuf {
        self.data_dir.join("assets")
    }

    /// Get the path to the versions directory
    pub fn versions_dir(&self) -> PathBuf {
        self.data_dir.join("versions")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    /// Scratch directory for a profile's extracted natives, rebuilt on every install
    pub fn natives_dir(&self, profile_id: &str) -> PathBuf {
        self.data_dir.join("natives").join(profile_id)
    }

    pub fn version_json_path(&self, id: &str) -> PathBuf {
        self.versions_dir().join(id).join(format!("{}.json", id))
    }

    pub fn client_jar_path(&self, minecraft_version: &str) -> PathBuf {
        self.versions_dir()
            .join(minecraft_version)
            .join(format!("{}.jar", minecraft_version))
    }

    pub fn asset_index_path(&self, index_id: &str) -> PathBuf {
        self.assets_dir()
            .join("indexes")
            .join(format!("{}.json", index_id))
    }

    pub fn asset_object_path(&self, hash: &str) -> PathBuf {
        self.assets_dir()
            .join("objects")
            .join(hash.get(..2).unwrap_or(hash))
            .join(hash)
    }

    pub fn log_config_path(&self, file_id: &str) -> PathBuf {
        self.assets_dir().join("log_configs").join(file_id)
    }

    /// Home of a provisioned Mojang runtime component
    pub fn runtime_dir(&self, component: &str) -> PathBuf {
        self.data_dir.join("runtimes").join(component)
    }

    /// Cached catalog used when the remote one is unreachable
    pub fn catalog_cache_path(&self) -> PathBuf {
        self.versions_dir().join("version_manifest_v2.json")
    }

    /// Stable, `/`-separated identifier for a file below the data directory.
    pub fn task_id_for(&self, path: &std::path::Path) -> String {
        let rel = path.strip_prefix(&self.data_dir).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Everything shared by the stages of one install: the `InstallSpec` and one pooled
/// HTTP client.
#[derive(Debug, Clone)]
pub struct InstallContext {
    pub client: Client,
    pub spec: InstallSpec,
}

impl InstallContext {
    pub fn new(spec: InstallSpec) -> InstallResult<Self> {
        let client = spec
            .config
            .http_client()
            .map_err(|e| InstallError::Other(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, spec })
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.spec.config
    }
}

/// What a launcher needs to start the installed version.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchLayout {
    pub profile_id: String,
    pub version_json: PathBuf,
    pub main_jar: PathBuf,
    pub libraries_dir: PathBuf,
    pub natives_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub asset_index_path: Option<PathBuf>,
    pub main_class: String,
    /// Unsubstituted game/JVM argument templates
    pub arguments: Arguments,
    /// Library jars in profile order, followed by the main jar
    pub classpath: Vec<PathBuf>,
    /// log4j configuration and the JVM argument template that points at it
    pub logging: Option<(PathBuf, String)>,
    /// Java matching the profile's requirement, when one was provisioned or found
    pub java_executable: Option<PathBuf>,
}
