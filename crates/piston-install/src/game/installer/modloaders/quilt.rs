use super::fabric::{build_loader_profile, LoaderMeta};
use crate::error::InstallResult;
use crate::game::installer::core::traits::LoaderAdapter;
use crate::game::installer::types::{InstallContext, ModloaderType};
use crate::game::profile::version_parser::VersionJson;
use futures::future::BoxFuture;

/// Quilt publishes profiles the same way Fabric does, from its own meta
/// service and maven.
pub struct QuiltAdapter;

impl LoaderAdapter for QuiltAdapter {
    fn kind(&self) -> ModloaderType {
        ModloaderType::Quilt
    }

    fn build_profile<'a>(
        &'a self,
        ctx: &'a InstallContext,
        minecraft_version: &'a str,
        loader_version: Option<&'a str>,
    ) -> BoxFuture<'a, InstallResult<VersionJson>> {
        let endpoints = &ctx.config().endpoints;
        Box::pin(build_loader_profile(
            ctx,
            LoaderMeta {
                kind: ModloaderType::Quilt,
                meta_url: &endpoints.quilt_meta,
                maven_url: &endpoints.quilt_maven,
            },
            minecraft_version,
            loader_version,
        ))
    }
}
