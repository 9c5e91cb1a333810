use sha1::{Digest, Sha1};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const HASH_CHUNK: usize = 64 * 1024;

/// SHA1 of a byte slice as lowercase hex.
pub fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Compare two hex digests ignoring case.
pub fn hash_eq(actual: &str, expected: &str) -> bool {
    actual.eq_ignore_ascii_case(expected)
}

/// Stream a file through SHA1 without loading it into memory.
pub fn sha1_file_sync(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; HASH_CHUNK];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Async wrapper around [`sha1_file_sync`]; hashing runs on the blocking pool.
pub async fn sha1_file(path: &Path) -> std::io::Result<String> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || sha1_file_sync(&path))
        .await
        .map_err(std::io::Error::other)?
}

/// Check a file on disk against an optional hash and size.
///
/// With a hash, the hash decides. Without one, a known size must match.
/// With neither, existence is enough.
pub async fn file_matches(
    path: &Path,
    expected_sha1: Option<&str>,
    expected_size: Option<u64>,
) -> bool {
    let meta = match tokio::fs::metadata(path).await {
        Ok(m) if m.is_file() => m,
        _ => return false,
    };
    if let Some(expected) = expected_sha1 {
        return match sha1_file(path).await {
            Ok(actual) => hash_eq(&actual, expected),
            Err(e) => {
                log::warn!("Failed to hash existing file {:?}: {}", path, e);
                false
            }
        };
    }
    match expected_size {
        Some(size) => meta.len() == size,
        None => true,
    }
}

/// Write `bytes` to `path` through a sibling temp file and an atomic rename.
pub async fn write_atomic(path: &Path, bytes: Vec<u8>) -> std::io::Result<()> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let parent = path
            .parent()
            .ok_or_else(|| std::io::Error::other(format!("{:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(std::io::Error::other)?
}

/// Copy `reader` to `path` through a sibling temp file and an atomic rename,
/// replacing whatever was there. Blocking.
pub fn copy_atomic_sync(reader: &mut impl Read, path: &Path) -> std::io::Result<u64> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::other(format!("{:?} has no parent", path)))?;
    std::fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    let written = std::io::copy(reader, &mut tmp)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(written)
}

/// True when `path` is non-empty and made only of plain names, so joining it
/// onto a directory can never leave that directory.
pub fn is_safe_relative(path: &Path) -> bool {
    path.components().next().is_some()
        && path
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)))
}

/// A single path segment such as a version id: safe and without separators.
pub fn is_safe_segment(name: &str) -> bool {
    !name.contains(['/', '\\']) && is_safe_relative(Path::new(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha1_of_known_input() {
        assert_eq!(sha1_hex(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert!(hash_eq("A9993E364706816ABA3E25717850C26C9CD0D89D", &sha1_hex(b"abc")));
    }

    #[tokio::test]
    async fn atomic_write_then_verify() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/file.json");
        write_atomic(&path, b"abc".to_vec()).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
        assert_eq!(sha1_file(&path).await.unwrap(), sha1_hex(b"abc"));
        assert!(file_matches(&path, Some(&sha1_hex(b"abc")), None).await);
        assert!(!file_matches(&path, Some(&sha1_hex(b"abd")), None).await);
        assert!(file_matches(&path, None, Some(3)).await);
        assert!(!file_matches(&path, None, Some(4)).await);
        assert!(!file_matches(&dir.path().join("missing"), None, None).await);
        // no stray temp files next to the target
        assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn atomic_copy_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libraries/a/b.jar");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"a much longer truncated leftover").unwrap();

        let written = copy_atomic_sync(&mut &b"fresh"[..], &path).unwrap();
        assert_eq!(written, 5);
        assert_eq!(std::fs::read(&path).unwrap(), b"fresh");
        assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn rejects_escaping_paths() {
        assert!(is_safe_relative(Path::new("org/ow2/asm/asm-9.3.jar")));
        assert!(!is_safe_relative(Path::new("../outside.jar")));
        assert!(!is_safe_relative(Path::new("org/../../outside.jar")));
        assert!(!is_safe_relative(Path::new("/etc/passwd")));
        assert!(!is_safe_relative(Path::new("")));

        assert!(is_safe_segment("fabric-loader-0.16.5-1.20.1"));
        assert!(!is_safe_segment(".."));
        assert!(!is_safe_segment("1.20.1/../../x"));
        assert!(!is_safe_segment("a\\b"));
    }
}
