use crate::auth::Credentials;
use crate::error::TransferError;
use crate::game::installer::config::InstallerConfig;
use crate::game::installer::plan::DownloadTask;
use crate::utils::fs::{file_matches, hash_eq};
use futures::StreamExt;
use reqwest::Client;
use sha1::{Digest, Sha1};
use std::path::Path;
use std::time::Instant;
use tokio::io::AsyncWriteExt;

impl TransferError {
    /// Whether another attempt could succeed. Client errors other than
    /// timeouts and rate limiting are permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransferError::Status { status, .. } => {
                !(400..500).contains(status) || *status == 408 || *status == 429
            }
            _ => true,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransferError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> TransferError + '_ {
    move |source| TransferError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Check whether a task's destination already holds the expected content.
pub async fn is_already_valid(task: &DownloadTask) -> bool {
    file_matches(&task.destination, task.sha1.as_deref(), task.size).await
}

async fn send(
    client: &Client,
    url: &str,
    credentials: Option<&Credentials>,
) -> Result<reqwest::Response, TransferError> {
    let mut request = client.get(url);
    if let Some(creds) = credentials {
        request = creds.authorize(request);
    }
    let response = request.send().await.map_err(|source| TransferError::Request {
        url: url.to_string(),
        source,
    })?;
    if !response.status().is_success() {
        return Err(TransferError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }
    Ok(response)
}

/// Perform one transfer attempt for `task`.
///
/// The body is streamed into a temp file beside the destination while being
/// hashed. The temp file is renamed over the destination only after the hash
/// and size match; on any error it is removed. Returns the number of bytes
/// written.
pub async fn transfer(
    client: &Client,
    task: &DownloadTask,
    config: &InstallerConfig,
    credentials: Option<&Credentials>,
) -> Result<u64, TransferError> {
    let start = Instant::now();
    let dest = task.destination.as_path();
    let parent = dest
        .parent()
        .ok_or_else(|| TransferError::Io {
            path: dest.to_path_buf(),
            source: std::io::Error::other("destination has no parent directory"),
        })?;
    tokio::fs::create_dir_all(parent).await.map_err(io_err(parent))?;

    let credentials = if task.requires_auth {
        if credentials.is_none() {
            log::warn!("{} requires authentication but no credentials were supplied", task.id);
        }
        credentials
    } else {
        None
    };
    let response = send(client, &task.url, credentials).await?;
    let total_size = response.content_length();
    log::debug!("Download size for {}: {:?} bytes", task.id, total_size);

    let file_name = dest
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download");
    let tmp_path = tempfile::Builder::new()
        .prefix(&format!("{}.", file_name))
        .suffix(".part")
        .tempfile_in(parent)
        .map_err(io_err(parent))?
        .into_temp_path();

    let mut file = tokio::fs::File::create(&tmp_path)
        .await
        .map_err(io_err(&tmp_path))?;
    let mut hasher = Sha1::new();
    let mut downloaded: u64 = 0;
    let mut chunk_count: u64 = 0;
    let inactivity = config.inactivity_timeout();

    let mut stream = response.bytes_stream();
    loop {
        let next = tokio::time::timeout(inactivity, stream.next())
            .await
            .map_err(|_| TransferError::Stalled {
                url: task.url.clone(),
                secs: inactivity.as_secs(),
            })?;
        let Some(chunk) = next else { break };
        let chunk = chunk.map_err(|source| TransferError::Request {
            url: task.url.clone(),
            source,
        })?;
        file.write_all(&chunk).await.map_err(io_err(&tmp_path))?;
        hasher.update(&chunk);
        downloaded += chunk.len() as u64;
        chunk_count += 1;
    }
    file.flush().await.map_err(io_err(&tmp_path))?;
    file.sync_all().await.map_err(io_err(&tmp_path))?;
    drop(file);

    if let Some(expected) = task.size {
        if expected != downloaded {
            return Err(TransferError::SizeMismatch {
                url: task.url.clone(),
                expected,
                actual: downloaded,
            });
        }
    }
    if let Some(ref expected) = task.sha1 {
        let computed = format!("{:x}", hasher.finalize());
        if !hash_eq(&computed, expected) {
            return Err(TransferError::HashMismatch {
                url: task.url.clone(),
                expected: expected.clone(),
                actual: computed,
            });
        }
        log::debug!("SHA1 validated: {}", computed);
    }

    // Atomic move into place
    tmp_path.persist(dest).map_err(|e| TransferError::Io {
        path: dest.to_path_buf(),
        source: e.error,
    })?;

    let secs = start.elapsed().as_secs_f64();
    log::debug!(
        "Download stats: url={}, size={} bytes, chunks={}, time={:.2}s, throughput={:.2} MB/s",
        task.url,
        downloaded,
        chunk_count,
        secs,
        (downloaded as f64 / 1024.0 / 1024.0) / secs.max(0.001)
    );
    Ok(downloaded)
}

async fn fetch_bytes_once(
    client: &Client,
    url: &str,
    config: &InstallerConfig,
) -> Result<Vec<u8>, TransferError> {
    let response = send(client, url, None).await?;
    let mut bytes = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
    let inactivity = config.inactivity_timeout();
    let mut stream = response.bytes_stream();
    loop {
        let next = tokio::time::timeout(inactivity, stream.next())
            .await
            .map_err(|_| TransferError::Stalled {
                url: url.to_string(),
                secs: inactivity.as_secs(),
            })?;
        let Some(chunk) = next else { break };
        let chunk = chunk.map_err(|source| TransferError::Request {
            url: url.to_string(),
            source,
        })?;
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Fetch a small metadata document into memory, retrying transient failures
/// with the configured backoff. Permanent client errors return immediately.
pub async fn fetch_bytes(
    client: &Client,
    url: &str,
    config: &InstallerConfig,
) -> Result<Vec<u8>, TransferError> {
    let max_attempts = config.max_attempts();
    let mut attempt = 0;
    loop {
        attempt += 1;
        match fetch_bytes_once(client, url, config).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) if attempt < max_attempts && e.is_retryable() => {
                let delay = config.backoff_delay(attempt);
                log::warn!(
                    "Request failed (attempt {}/{}): {}. Retrying in {:?}...",
                    attempt,
                    max_attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Download a single file outside the engine, with the same retry policy.
pub async fn transfer_with_retry(
    client: &Client,
    task: &DownloadTask,
    config: &InstallerConfig,
) -> Result<u64, TransferError> {
    let max_attempts = config.max_attempts();
    let mut attempt = 0;
    loop {
        attempt += 1;
        match transfer(client, task, config, None).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) if attempt < max_attempts && e.is_retryable() => {
                let delay = config.backoff_delay(attempt);
                log::warn!(
                    "Download of {} failed (attempt {}/{}): {}. Retrying in {:?}...",
                    task.id,
                    attempt,
                    max_attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Fetch and deserialize a JSON document.
pub async fn fetch_json<T: serde::de::DeserializeOwned>(
    client: &Client,
    url: &str,
    config: &InstallerConfig,
) -> anyhow::Result<T> {
    let bytes = fetch_bytes(client, url, config).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::installer::plan::TaskKind;
    use crate::utils::fs::sha1_hex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quick_config() -> InstallerConfig {
        InstallerConfig {
            backoff_base_ms: 1,
            backoff_max_ms: 2,
            ..Default::default()
        }
    }

    fn task(server: &MockServer, dir: &Path, name: &str, body: &[u8]) -> DownloadTask {
        DownloadTask::new(
            TaskKind::Library,
            format!("{}/{}", server.uri(), name),
            dir.join("libs").join(name),
            format!("libraries/{}", name),
        )
        .with_sha1(Some(sha1_hex(body)))
        .with_size(Some(body.len() as u64))
    }

    #[tokio::test]
    async fn transfer_writes_verified_file_without_leftovers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.jar"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello".to_vec()))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let t = task(&server, dir.path(), "a.jar", b"hello");

        let written = transfer(&Client::new(), &t, &quick_config(), None).await.unwrap();
        assert_eq!(written, 5);
        assert_eq!(std::fs::read(&t.destination).unwrap(), b"hello");
        assert!(is_already_valid(&t).await);
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("libs")).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn hash_mismatch_keeps_destination_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.jar"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"tampered".to_vec()))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let mut t = task(&server, dir.path(), "a.jar", b"hello");
        t.size = None;

        let err = transfer(&Client::new(), &t, &quick_config(), None).await.unwrap_err();
        assert!(matches!(err, TransferError::HashMismatch { .. }));
        assert!(!t.destination.exists());
        let leftovers = std::fs::read_dir(dir.path().join("libs")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn fetch_bytes_does_not_retry_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.json"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        let url = format!("{}/missing.json", server.uri());
        let err = fetch_bytes(&Client::new(), &url, &quick_config()).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn fetch_bytes_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky.json"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;
        let url = format!("{}/flaky.json", server.uri());
        let err = fetch_bytes(&Client::new(), &url, &quick_config()).await.unwrap_err();
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test]
    async fn authenticated_task_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/private.jar"))
            .and(wiremock::matchers::header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello".to_vec()))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let t = task(&server, dir.path(), "private.jar", b"hello").requiring_auth();
        let creds = Credentials::new("tok", "Steve", uuid::Uuid::nil());

        transfer(&Client::new(), &t, &quick_config(), Some(&creds)).await.unwrap();
        assert!(t.destination.exists());
    }
}
