pub mod installer;
pub mod metadata;
pub mod profile;

// Re-export commonly used types
pub use installer::install_instance;
pub use installer::session::{InstallSession, ProgressSnapshot, SessionState};
pub use installer::types::{InstallSpec, LaunchLayout, ProgressReporter, SilentProgressReporter};
pub use metadata::{LoaderVersionInfo, ModloaderType, VersionCatalog, VersionDescriptor};
pub use profile::{LoaderKind, ResolvedProfile};
