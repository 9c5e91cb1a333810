//! Installer settings.
//! The constants are the public endpoints; `InstallerConfig` bundles them with
//! the tunables used by the download engine so a host can override any of them.

use serde::{Deserialize, Serialize};
use std::time::Duration;

// URL Constants
pub const VANILLA_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";
pub const RESOURCES_URL: &str = "https://resources.download.minecraft.net";
pub const LIBRARIES_URL: &str = "https://libraries.minecraft.net/";
pub const FABRIC_META_URL: &str = "https://meta.fabricmc.net/v2";
pub const FABRIC_MAVEN_URL: &str = "https://maven.fabricmc.net/";
pub const QUILT_META_URL: &str = "https://meta.quiltmc.org/v3";
pub const QUILT_MAVEN_URL: &str = "https://maven.quiltmc.org/repository/release/";
pub const FORGE_MAVEN_URL: &str = "https://maven.minecraftforge.net/";
pub const JAVA_RUNTIMES_URL: &str =
    "https://launchermeta.mojang.com/v1/products/java-runtime/2ec0cc96c44e5a76b9c8b7c39df7210883d12871/all.json";

pub const DEFAULT_CONCURRENCY: usize = 8;
/// Hard ceiling for the transfer pool; larger requests are clamped.
pub const MAX_CONCURRENCY: usize = 64;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const CONNECT_TIMEOUT_SECS: u64 = 30;
pub const INACTIVITY_TIMEOUT_SECS: u64 = 30;
pub const PROCESSOR_TIMEOUT_SECS: u64 = 300;

/// Remote endpoints used during an install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub version_manifest: String,
    pub resources: String,
    pub libraries: String,
    pub fabric_meta: String,
    pub fabric_maven: String,
    pub quilt_meta: String,
    pub quilt_maven: String,
    pub forge_maven: String,
    /// Mojang's `all.json` listing JVM runtime builds per platform
    pub java_runtimes: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            version_manifest: VANILLA_MANIFEST_URL.to_string(),
            resources: RESOURCES_URL.to_string(),
            libraries: LIBRARIES_URL.to_string(),
            fabric_meta: FABRIC_META_URL.to_string(),
            fabric_maven: FABRIC_MAVEN_URL.to_string(),
            quilt_meta: QUILT_META_URL.to_string(),
            quilt_maven: QUILT_MAVEN_URL.to_string(),
            forge_maven: FORGE_MAVEN_URL.to_string(),
            java_runtimes: JAVA_RUNTIMES_URL.to_string(),
        }
    }
}

/// Where the Java for post-processing (and the returned layout) comes from
/// when `InstallSpec::java_path` is not set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JavaRuntimePolicy {
    /// Download Mojang's runtime for the profile's `javaVersion`; fall back to
    /// an installed Java when none is published for the platform
    #[default]
    Provision,
    /// Only look for an installed Java of the required major version
    System,
    /// Leave Java to the host
    Disabled,
}

/// Tunables for resolution and the download engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Number of concurrent transfers (clamped to `1..=MAX_CONCURRENCY`)
    pub concurrency: usize,
    /// Attempts per task before it is marked failed
    pub max_attempts: u32,
    /// First retry delay; doubles on every further attempt
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// Abort a transfer when no bytes arrive for this long
    pub inactivity_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Wall-clock limit for a single Forge processor run
    pub processor_timeout_secs: u64,
    pub user_agent: String,
    pub java_runtime: JavaRuntimePolicy,
    pub endpoints: Endpoints,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base_ms: 1000,
            backoff_max_ms: 30_000,
            inactivity_timeout_secs: INACTIVITY_TIMEOUT_SECS,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            processor_timeout_secs: PROCESSOR_TIMEOUT_SECS,
            user_agent: format!("piston-install/{}", env!("CARGO_PKG_VERSION")),
            java_runtime: JavaRuntimePolicy::default(),
            endpoints: Endpoints::default(),
        }
    }
}

impl InstallerConfig {
    /// Concurrency actually used by the pool.
    pub fn effective_concurrency(&self) -> usize {
        if self.concurrency > MAX_CONCURRENCY {
            log::warn!(
                "Requested concurrency {} exceeds the maximum of {}, clamping",
                self.concurrency,
                MAX_CONCURRENCY
            );
        }
        self.concurrency.clamp(1, MAX_CONCURRENCY)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs.max(1))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    pub fn processor_timeout(&self) -> Duration {
        Duration::from_secs(self.processor_timeout_secs.max(1))
    }

    /// Delay before attempt `attempt + 1`, given that `attempt` (1-based) just failed.
    /// Exponential in the attempt number, capped, plus up to 25% random jitter.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        use rand::Rng;

        let exp = attempt.saturating_sub(1).min(20);
        let base = self
            .backoff_base_ms
            .saturating_mul(1u64 << exp)
            .min(self.backoff_max_ms);
        let jitter = if base >= 4 {
            rand::rng().random_range(0..=base / 4)
        } else {
            0
        };
        Duration::from_millis(base + jitter)
    }

    /// Build the shared HTTP client. No overall request timeout is set; stalled
    /// transfers are caught by the per-chunk inactivity timeout.
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .connect_timeout(self.connect_timeout())
            .pool_max_idle_per_host(self.effective_concurrency())
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_is_clamped() {
        let mut config = InstallerConfig::default();
        assert_eq!(config.effective_concurrency(), DEFAULT_CONCURRENCY);
        config.concurrency = 500;
        assert_eq!(config.effective_concurrency(), MAX_CONCURRENCY);
        config.concurrency = 0;
        assert_eq!(config.effective_concurrency(), 1);
    }

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        let config = InstallerConfig {
            backoff_base_ms: 100,
            backoff_max_ms: 1000,
            ..Default::default()
        };
        let first = config.backoff_delay(1).as_millis() as u64;
        let second = config.backoff_delay(2).as_millis() as u64;
        let tenth = config.backoff_delay(10).as_millis() as u64;
        assert!((100..=125).contains(&first), "first = {}", first);
        assert!((200..=250).contains(&second), "second = {}", second);
        assert!((1000..=1250).contains(&tenth), "tenth = {}", tenth);
    }

    #[test]
    fn partial_config_deserializes_with_defaults() {
        let config: InstallerConfig =
            serde_json::from_str(r#"{"concurrency": 4, "endpoints": {"resources": "http://x"}}"#)
                .unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(config.endpoints.resources, "http://x");
        assert_eq!(config.endpoints.version_manifest, VANILLA_MANIFEST_URL);
        assert_eq!(config.java_runtime, JavaRuntimePolicy::Provision);
        assert_eq!(config.endpoints.java_runtimes, JAVA_RUNTIMES_URL);

        let system: InstallerConfig = serde_json::from_str(r#"{"java_runtime": "system"}"#).unwrap();
        assert_eq!(system.java_runtime, JavaRuntimePolicy::System);
    }
}
