use crate::error::{InstallError, InstallResult};
use crate::game::installer::plan::{ArchiveEntry, NativeArchive};
use crate::utils::fs::{copy_atomic_sync, is_safe_relative};
use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Rebuild `natives_dir` from the given archives.
///
/// The directory is scratch space: it is emptied first so files from a
/// previous install never linger. Any extraction failure is fatal.
pub async fn extract_natives(archives: &[NativeArchive], natives_dir: &Path) -> InstallResult<usize> {
    if tokio::fs::try_exists(natives_dir).await.unwrap_or(false) {
        tokio::fs::remove_dir_all(natives_dir)
            .await
            .map_err(|e| InstallError::io(natives_dir, e))?;
    }
    tokio::fs::create_dir_all(natives_dir)
        .await
        .map_err(|e| InstallError::io(natives_dir, e))?;

    let mut extracted = 0;
    for native in archives {
        let archive = native.archive.clone();
        let dest = natives_dir.to_path_buf();
        let exclude = native.exclude.clone();
        let count = tokio::task::spawn_blocking(move || extract_archive_sync(&archive, &dest, &exclude))
            .await
            .map_err(|e| InstallError::NativeExtraction {
                archive: native.archive.clone(),
                reason: e.to_string(),
            })?
            .map_err(|e| InstallError::NativeExtraction {
                archive: native.archive.clone(),
                reason: format!("{:#}", e),
            })?;
        log::debug!("Extracted {} native file(s) from {:?}", count, native.archive);
        extracted += count;
    }
    log::info!("Extracted {} native file(s) into {:?}", extracted, natives_dir);
    Ok(extracted)
}

/// Unpack every file of `archive` into `dest`, skipping entries that start
/// with one of the `exclude` prefixes (usually `META-INF/`).
pub fn extract_archive_sync(archive: &Path, dest: &Path, exclude: &[String]) -> Result<usize> {
    let file = File::open(archive).with_context(|| format!("Failed to open {:?}", archive))?;
    let mut zip = zip::ZipArchive::new(file).with_context(|| format!("{:?} is not a valid archive", archive))?;
    std::fs::create_dir_all(dest)?;

    let mut count = 0;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let name = entry.name().to_string();
        if entry.is_dir() || exclude.iter().any(|e| name.starts_with(e.as_str())) {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            log::warn!("Skipping unsafe archive entry {:?} in {:?}", name, archive);
            continue;
        };
        let outpath = dest.join(relative);
        write_entry(&mut entry, &outpath)?;
        count += 1;
    }
    Ok(count)
}

fn write_entry(reader: &mut impl std::io::Read, outpath: &Path) -> Result<()> {
    copy_atomic_sync(reader, outpath).with_context(|| format!("Failed to write {:?}", outpath))?;
    Ok(())
}

/// Copy selected entries (or whole `prefix/` subtrees) out of an archive.
pub fn extract_entries_sync(archive: &Path, entries: &[ArchiveEntry]) -> Result<usize> {
    let file = File::open(archive).with_context(|| format!("Failed to open {:?}", archive))?;
    let mut zip = zip::ZipArchive::new(file).with_context(|| format!("{:?} is not a valid archive", archive))?;
    let mut count = 0;

    for spec in entries {
        if spec.source.ends_with('/') {
            let names: Vec<String> = zip
                .file_names()
                .filter(|n| n.starts_with(spec.source.as_str()) && !n.ends_with('/'))
                .map(str::to_string)
                .collect();
            for name in names {
                let relative = PathBuf::from(&name[spec.source.len()..]);
                if !is_safe_relative(&relative) {
                    log::warn!("Skipping unsafe archive entry {:?} in {:?}", name, archive);
                    continue;
                }
                let mut entry = zip.by_name(&name)?;
                write_entry(&mut entry, &spec.destination.join(relative))?;
                count += 1;
            }
        } else {
            let mut entry = zip
                .by_name(&spec.source)
                .with_context(|| format!("{:?} has no entry {}", archive, spec.source))?;
            write_entry(&mut entry, &spec.destination)?;
            count += 1;
        }
    }
    Ok(count)
}

pub async fn extract_entries(archive: &Path, entries: &[ArchiveEntry]) -> Result<usize> {
    let archive = archive.to_path_buf();
    let entries = entries.to_vec();
    tokio::task::spawn_blocking(move || extract_entries_sync(&archive, &entries)).await?
}
