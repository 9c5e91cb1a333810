use crate::error::InstallResult;
use crate::game::installer::plan::LoaderTasks;
use crate::game::installer::types::{InstallContext, ModloaderType};
use crate::game::profile::resolved::ResolvedProfile;
use crate::game::profile::version_parser::VersionJson;
use futures::future::BoxFuture;

/// Seam between the generic pipeline and a specific modloader.
///
/// An adapter turns (Minecraft version, loader version) into a child version
/// document that inherits from the vanilla version, and may contribute extra
/// downloads and post-processing steps once the merged profile is known.
pub trait LoaderAdapter: Send + Sync {
    fn kind(&self) -> ModloaderType;

    /// Produce the loader's child version document. When `loader_version` is
    /// `None` the adapter picks the newest stable build for `minecraft_version`.
    fn build_profile<'a>(
        &'a self,
        ctx: &'a InstallContext,
        minecraft_version: &'a str,
        loader_version: Option<&'a str>,
    ) -> BoxFuture<'a, InstallResult<VersionJson>>;

    /// Downloads and post-processing steps beyond the profile's libraries.
    fn extra_tasks<'a>(
        &'a self,
        ctx: &'a InstallContext,
        profile: &'a ResolvedProfile,
    ) -> BoxFuture<'a, InstallResult<LoaderTasks>> {
        let _ = (ctx, profile);
        Box::pin(async { Ok(LoaderTasks::default()) })
    }
}
