pub mod config;
pub mod core;
pub mod modloaders;
pub mod plan;
pub mod session;
pub mod types;

#[cfg(test)]
mod tests;

use crate::error::{InstallError, InstallResult};
use crate::game::installer::core::engine::DownloadEngine;
use crate::game::installer::core::jre_manager::prepare_java;
use crate::game::installer::core::traits::LoaderAdapter;
use crate::game::installer::modloaders::adapter_for;
use crate::game::installer::plan::{DependencyResolver, FetchPlan};
use crate::game::installer::session::{InstallSession, SessionState};
use crate::game::profile::resolved::{LoaderKind, ResolvedProfile};
use crate::game::profile::resolver::ManifestResolver;
use crate::game::profile::rules::Platform;
use crate::utils::fs::{is_safe_segment, write_atomic};
use std::sync::Arc;
use types::{InstallContext, InstallSpec, LaunchLayout};

/// Main entry point for game installation.
///
/// Resolves `spec.version_id` (plus the requested loader), fetches and
/// verifies every file it needs, runs post-processing and returns the
/// layout a launcher needs. Progress and cancellation go through `session`,
/// which also keeps the final plan and the failed task list.
pub async fn install_instance(spec: InstallSpec, session: Arc<InstallSession>) -> InstallResult<LaunchLayout> {
    log::info!(
        "Starting installation: version={}, modloader={:?} {:?}",
        spec.version_id,
        spec.modloader,
        spec.modloader_version
    );
    session.notify(|r| {
        r.set_message("Starting installation...");
        r.set_percent(0);
    });

    let ctx = InstallContext::new(spec)?;
    let mut plan = None;
    let result = run_install(&ctx, &session, &mut plan).await;
    if let Some(plan) = plan {
        session.store_plan(plan);
    }

    match &result {
        Ok(layout) => {
            session.set_state(SessionState::Completed);
            log::info!("Installation completed successfully: {}", layout.profile_id);
            session.notify(|r| r.done(true, Some("Installation complete")));
        }
        Err(err) => {
            let state = match err {
                InstallError::InstallationIncomplete { .. } => SessionState::Incomplete,
                InstallError::Cancelled { .. } => SessionState::Cancelled,
                _ => SessionState::Failed,
            };
            session.set_state(state);
            log::error!("Installation of {} failed: {}", ctx.spec.version_id, err);
            let message = err.to_string();
            session.notify(|r| r.done(false, Some(&message)));
        }
    }
    result
}

async fn run_install(
    ctx: &InstallContext,
    session: &InstallSession,
    plan_slot: &mut Option<FetchPlan>,
) -> InstallResult<LaunchLayout> {
    let spec = &ctx.spec;
    let platform = spec.platform();

    session.set_state(SessionState::Resolving);
    let adapter = spec.modloader.and_then(adapter_for);
    let profile = resolve_profile(ctx, adapter.as_deref()).await?;
    log::info!(
        "Resolved {} ({} libraries, loader {:?})",
        profile.id,
        profile.libraries.len(),
        profile.loader
    );
    session.set_profile(profile.clone());
    if session.is_cancelled() {
        return Err(InstallError::Cancelled {
            completed: 0,
            remaining: 0,
        });
    }

    session.set_state(SessionState::Planning);
    let plan = plan_slot.insert(
        DependencyResolver::new(ctx)
            .expand(&profile, &platform, adapter.as_deref())
            .await?,
    );
    prepare_java(ctx, &profile, &platform, plan).await?;

    session.set_state(SessionState::Downloading);
    let engine = DownloadEngine::new(ctx, session);
    engine.run(plan).await?;

    let natives_dir = spec.natives_dir(&profile.id);
    engine.post_process(plan, &natives_dir).await?;

    Ok(build_layout(ctx, &profile, &platform, plan))
}

/// Resolve the requested version, first materialising the loader's child
/// profile next to the vanilla ones so the resolver can merge it.
async fn resolve_profile(ctx: &InstallContext, adapter: Option<&dyn LoaderAdapter>) -> InstallResult<ResolvedProfile> {
    let spec = &ctx.spec;
    let resolver = ManifestResolver::new(ctx);
    let Some(adapter) = adapter else {
        return resolver.resolve(&spec.version_id).await;
    };

    let child = adapter
        .build_profile(ctx, &spec.version_id, spec.modloader_version.as_deref())
        .await?;
    if !is_safe_segment(&child.id) {
        return Err(InstallError::corrupt(&child.id, "loader profile id is not a plain file name"));
    }
    let path = spec.version_json_path(&child.id);
    let bytes = serde_json::to_vec_pretty(&child).map_err(|e| InstallError::Other(e.into()))?;
    write_atomic(&path, bytes)
        .await
        .map_err(|e| InstallError::io(&path, e))?;
    log::info!("Wrote {} profile {:?}", adapter.kind(), path);

    let parent = child.inherits_from.clone();
    match resolver.resolve(&child.id).await {
        // the loader published a profile for a game version nobody serves
        Err(InstallError::VersionNotFound(missing)) if parent.as_deref() == Some(missing.as_str()) => {
            let kind = LoaderKind::detect(&child.id, &missing);
            Err(InstallError::UnsupportedVersion {
                loader: adapter.kind().to_string(),
                loader_version: kind
                    .loader_version()
                    .or(spec.modloader_version.as_deref())
                    .unwrap_or("unknown")
                    .to_string(),
                minecraft_version: missing,
                reason: "Minecraft version is not in the version catalog".into(),
            })
        }
        other => other,
    }
}

fn build_layout(ctx: &InstallContext, profile: &ResolvedProfile, platform: &Platform, plan: &FetchPlan) -> LaunchLayout {
    let spec = &ctx.spec;
    let libraries_dir = spec.libraries_dir();
    let main_jar = spec.client_jar_path(&profile.minecraft_version);

    let mut classpath: Vec<_> = profile
        .libraries_for(platform)
        .filter_map(|lib| lib.artifact.as_ref())
        .map(|artifact| libraries_dir.join(&artifact.path))
        .collect();
    classpath.push(main_jar.clone());

    let logging = profile
        .logging
        .as_ref()
        .map(|l| (spec.log_config_path(&l.file.id), l.argument.clone()));

    LaunchLayout {
        profile_id: profile.id.clone(),
        version_json: spec.version_json_path(&profile.id),
        main_jar,
        libraries_dir,
        natives_dir: spec.natives_dir(&profile.id),
        assets_dir: spec.assets_dir(),
        asset_index_path: plan.asset_index_path.clone(),
        main_class: profile.main_class.clone(),
        arguments: profile.arguments.clone(),
        classpath,
        logging,
        java_executable: plan.java_executable.clone(),
    }
}

