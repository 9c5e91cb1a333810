pub mod maven;
pub mod resolved;
pub mod resolver;
pub mod rules;
pub mod version_parser;

pub use maven::MavenCoordinate;
pub use resolved::{LoaderKind, ResolvedProfile};
pub use resolver::ManifestResolver;
pub use rules::{OsName, Platform};
pub use version_parser::VersionJson;
