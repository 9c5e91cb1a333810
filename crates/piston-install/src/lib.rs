//! Resolve, download and verify Minecraft installations.
//!
//! [`install_instance`] drives the whole pipeline: the version (and optional
//! Fabric, Quilt or Forge loader) is resolved into a [`ResolvedProfile`],
//! expanded into a fetch plan, downloaded under an [`InstallSession`] and
//! post-processed. The result is a [`LaunchLayout`] describing where
//! everything landed.

pub mod auth;
pub mod error;
pub mod game;
pub mod utils;

pub use auth::Credentials;
pub use error::{FailedTask, InstallError, InstallResult, TransferError};
pub use game::installer::config::{Endpoints, InstallerConfig, JavaRuntimePolicy};
pub use game::installer::core::jre_manager::{find_system_javas, JavaInstallation};
pub use game::{
    install_instance, InstallSession, InstallSpec, LaunchLayout, LoaderKind, ModloaderType, ProgressReporter,
    ProgressSnapshot, ResolvedProfile, SessionState, SilentProgressReporter,
};
pub use game::profile::Platform;
