use crate::error::{InstallError, InstallResult};
use crate::game::installer::plan::{AssetIndexFile, VirtualAssets};
use crate::utils::fs::{copy_atomic_sync, is_safe_relative};
use anyhow::{Context, Result};
use std::path::Path;

/// Copy hashed asset objects to their virtual paths for indexes marked
/// `virtual` or `map_to_resources` (pre-1.7 versions read them from there).
pub async fn materialize_virtual_assets(target: &VirtualAssets, objects_dir: &Path) -> InstallResult<usize> {
    let bytes = tokio::fs::read(&target.index_path)
        .await
        .map_err(|e| InstallError::io(&target.index_path, e))?;
    let index: AssetIndexFile = serde_json::from_slice(&bytes)
        .map_err(|e| InstallError::corrupt(target.index_path.display().to_string(), e))?;

    let target_dir = target.target_dir.clone();
    let objects_dir = objects_dir.to_path_buf();
    let copied = tokio::task::spawn_blocking(move || copy_objects(&index, &objects_dir, &target_dir))
        .await
        .map_err(|e| InstallError::Other(e.into()))?
        .map_err(|e| InstallError::PostProcess {
            task: "virtual-assets".to_string(),
            reason: format!("{:#}", e),
        })?;
    log::info!("Materialized {} virtual asset(s) into {:?}", copied, target.target_dir);
    Ok(copied)
}

fn copy_objects(index: &AssetIndexFile, objects_dir: &Path, target_dir: &Path) -> Result<usize> {
    let mut copied = 0;
    for (virtual_path, object) in &index.objects {
        let relative = Path::new(virtual_path);
        if !is_safe_relative(relative) {
            log::warn!("Skipping asset with unsafe path {:?}", virtual_path);
            continue;
        }
        let dest = target_dir.join(relative);
        if std::fs::metadata(&dest).map(|m| m.len() == object.size).unwrap_or(false) {
            continue;
        }
        let source = objects_dir
            .join(object.hash.get(..2).unwrap_or(&object.hash))
            .join(&object.hash);
        let mut reader = std::fs::File::open(&source).with_context(|| format!("Failed to open {:?}", source))?;
        copy_atomic_sync(&mut reader, &dest)
            .with_context(|| format!("Failed to copy {:?} to {:?}", source, dest))?;
        copied += 1;
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copies_objects_to_virtual_paths_once() {
        let dir = tempfile::tempdir().unwrap();
        let objects = dir.path().join("objects");
        let hash = "ab12000000000000000000000000000000000000";
        std::fs::create_dir_all(objects.join("ab")).unwrap();
        std::fs::write(objects.join("ab").join(hash), b"ogg").unwrap();

        let index_path = dir.path().join("indexes/pre-1.6.json");
        std::fs::create_dir_all(index_path.parent().unwrap()).unwrap();
        std::fs::write(
            &index_path,
            format!(
                r#"{{"map_to_resources": true, "objects": {{
                    "sound/step/grass1.ogg": {{"hash": "{h}", "size": 3}},
                    "sound/step/grass2.ogg": {{"hash": "{h}", "size": 3}}}}}}"#,
                h = hash
            ),
        )
        .unwrap();

        let target = VirtualAssets {
            index_path,
            target_dir: dir.path().join("game/resources"),
        };
        assert_eq!(materialize_virtual_assets(&target, &objects).await.unwrap(), 2);
        assert_eq!(
            std::fs::read(dir.path().join("game/resources/sound/step/grass2.ogg")).unwrap(),
            b"ogg"
        );
        // already in place
        assert_eq!(materialize_virtual_assets(&target, &objects).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_object_fails() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("legacy.json");
        std::fs::write(
            &index_path,
            r#"{"virtual": true, "objects": {"a.ogg": {"hash": "ff00000000000000000000000000000000000000", "size": 1}}}"#,
        )
        .unwrap();
        let target = VirtualAssets {
            index_path,
            target_dir: dir.path().join("virtual"),
        };
        let err = materialize_virtual_assets(&target, &dir.path().join("objects")).await.unwrap_err();
        assert!(matches!(err, InstallError::PostProcess { .. }));
    }
}
