//! Running Forge installer processors (jar patching, mapping merges) as
//! external Java programs.

use super::parser::extract_main_class_from_jar;
use crate::game::installer::plan::{ExpectedOutput, ProcessorInvocation};
use crate::game::installer::types::InstallContext;
use crate::utils::fs::{file_matches, sha1_file};
use crate::utils::process::QuietCommandExt;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Run one processor unless every declared output already exists with the
/// expected hash. Outputs are verified after the run.
///
/// `java` is the executable picked for this install; without one `InstallSpec::java_path`
/// and then `java` on PATH are used.
pub async fn run_processor(ctx: &InstallContext, java: Option<&Path>, invocation: &ProcessorInvocation) -> Result<()> {
    if outputs_valid(&invocation.outputs).await {
        log::info!(
            "Skipping processor {:?} (outputs already valid)",
            invocation.jar.file_name().unwrap_or_default()
        );
        return Ok(());
    }

    let java = find_java(ctx, java)?;
    let jar = invocation.jar.clone();
    let main_class = tokio::task::spawn_blocking(move || extract_main_class_from_jar(&jar))
        .await?
        .with_context(|| format!("Failed to read Main-Class from {:?}", invocation.jar))?;

    let classpath = std::env::join_paths(std::iter::once(&invocation.jar).chain(&invocation.classpath))
        .context("Processor classpath contains an invalid path")?;

    log::info!("Running processor {}", main_class);
    log::debug!("Processor args: {:?}", invocation.args);

    let mut command = Command::new(&java);
    command
        .arg("-cp")
        .arg(&classpath)
        .arg(&main_class)
        .args(&invocation.args)
        .current_dir(&ctx.spec.data_dir)
        .suppress_console()
        .kill_on_drop(true)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let timeout = ctx.config().processor_timeout();
    let output = tokio::time::timeout(timeout, command.output())
        .await
        .with_context(|| format!("Processor {} timed out after {:?}", main_class, timeout))?
        .with_context(|| format!("Failed to spawn {:?}", java))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::error!("Processor {} failed", main_class);
        log::error!("  stdout: {}", String::from_utf8_lossy(&output.stdout));
        log::error!("  stderr: {}", stderr);
        bail!(
            "Processor {} exited with code {:?}: {}",
            main_class,
            output.status.code(),
            last_line(&stderr)
        );
    }

    verify_outputs(&invocation.outputs).await
}

fn find_java(ctx: &InstallContext, selected: Option<&Path>) -> Result<PathBuf> {
    match selected.or(ctx.spec.java_path.as_deref()) {
        Some(path) => Ok(path.to_path_buf()),
        None => which::which("java").context("No Java executable configured and none found on PATH"),
    }
}

fn last_line(text: &str) -> &str {
    text.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("").trim()
}

/// True when there are declared outputs and all of them are already in place.
pub async fn outputs_valid(outputs: &[ExpectedOutput]) -> bool {
    if outputs.is_empty() {
        return false;
    }
    for output in outputs {
        if !file_matches(&output.path, output.sha1.as_deref(), None).await {
            log::debug!("Processor output {:?} missing or stale", output.path);
            return false;
        }
    }
    true
}

async fn verify_outputs(outputs: &[ExpectedOutput]) -> Result<()> {
    for output in outputs {
        if !tokio::fs::try_exists(&output.path).await.unwrap_or(false) {
            bail!("Processor did not create expected output {:?}", output.path);
        }
        if let Some(expected) = &output.sha1 {
            let actual = sha1_file(&output.path)
                .await
                .with_context(|| format!("Failed to hash {:?}", output.path))?;
            if !actual.eq_ignore_ascii_case(expected) {
                bail!(
                    "Processor output {:?} has wrong SHA1: expected {}, got {}",
                    output.path,
                    expected,
                    actual
                );
            }
        }
    }
    Ok(())
}
