#[cfg(test)]
mod tests {
    use crate::error::InstallError;
    use crate::game::installer::install_instance;
    use crate::game::installer::session::{InstallSession, SessionState};
    use crate::game::installer::types::{InstallSpec, ProgressReporter};
    use crate::game::metadata::ModloaderType;
    use crate::utils::fs::sha1_hex;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // ---------------------------------------------------------------------
    // MockProgressReporter – a simple in‑memory implementation of ProgressReporter
    // ---------------------------------------------------------------------
    struct MockProgressReporter {
        steps: Arc<Mutex<Vec<String>>>,
        percent: Arc<Mutex<i32>>,
        counts: Arc<Mutex<Vec<(u32, Option<u32>)>>>,
        done: Arc<Mutex<Option<bool>>>,
        cancelled: Arc<Mutex<bool>>,
        panicky: bool,
    }

    impl MockProgressReporter {
        fn new() -> Self {
            Self {
                steps: Arc::new(Mutex::new(Vec::new())),
                percent: Arc::new(Mutex::new(0)),
                counts: Arc::new(Mutex::new(Vec::new())),
                done: Arc::new(Mutex::new(None)),
                cancelled: Arc::new(Mutex::new(false)),
                panicky: false,
            }
        }
        fn cancel(&self) {
            *self.cancelled.lock().unwrap() = true;
        }
    }

    impl ProgressReporter for MockProgressReporter {
        fn start_step(&self, name: &str, _total_steps: Option<u32>) {
            self.steps.lock().unwrap().push(name.to_string());
        }
        fn update_bytes(&self, _transferred: u64, _total: Option<u64>) {
            if self.panicky {
                panic!("reporter blew up");
            }
        }
        fn set_percent(&self, percent: i32) {
            *self.percent.lock().unwrap() = percent;
        }
        fn set_message(&self, _message: &str) {}
        fn set_step_count(&self, current: u32, total: Option<u32>) {
            self.counts.lock().unwrap().push((current, total));
        }
        fn done(&self, success: bool, _message: Option<&str>) {
            *self.done.lock().unwrap() = Some(success);
        }
        fn is_cancelled(&self) -> bool {
            *self.cancelled.lock().unwrap()
        }
    }

    // ---------------------------------------------------------------------
    // A tiny vanilla release served by wiremock
    // ---------------------------------------------------------------------
    const CLIENT: &[u8] = b"client jar bytes";
    const LIBRARY: &[u8] = b"library jar bytes";
    const ASSET: &[u8] = b"sound";

    async fn serve(server: &MockServer, route: &str, body: Vec<u8>) {
        Mock::given(method("GET"))
            .and(path(route.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(server)
            .await;
    }

    async fn fake_release(server: &MockServer, dir: &Path) -> InstallSpec {
        let uri = server.uri();
        let asset_hash = sha1_hex(ASSET);
        let index = format!(
            r#"{{"objects": {{"minecraft/sounds/a.ogg": {{"hash": "{h}", "size": {n}}},
                             "minecraft/sounds/b.ogg": {{"hash": "{h}", "size": {n}}}}}}}"#,
            h = asset_hash,
            n = ASSET.len()
        );
        let version = format!(
            r#"{{"id": "1.20.1", "type": "release", "mainClass": "net.minecraft.client.main.Main",
                "arguments": {{"game": ["--username", "${{auth_player_name}}"], "jvm": ["-cp", "${{classpath}}"]}},
                "assetIndex": {{"id": "5", "sha1": "{index_sha}", "size": {index_len}, "url": "{uri}/indexes/5.json"}},
                "assets": "5",
                "downloads": {{"client": {{"sha1": "{client_sha}", "size": {client_len}, "url": "{uri}/client.jar"}}}},
                "libraries": [{{"name": "com.example:lib:1.0",
                    "downloads": {{"artifact": {{"path": "com/example/lib/1.0/lib-1.0.jar",
                        "sha1": "{lib_sha}", "size": {lib_len}, "url": "{uri}/libs/lib-1.0.jar"}}}}}}]}}"#,
            index_sha = sha1_hex(index.as_bytes()),
            index_len = index.len(),
            client_sha = sha1_hex(CLIENT),
            client_len = CLIENT.len(),
            lib_sha = sha1_hex(LIBRARY),
            lib_len = LIBRARY.len(),
        );
        let catalog = format!(
            r#"{{"latest": {{"release": "1.20.1", "snapshot": "1.20.1"}},
                "versions": [{{"id": "1.20.1", "type": "release", "url": "{uri}/v/1.20.1.json",
                  "sha1": "{sha}", "releaseTime": "2023-06-12T13:25:51+00:00"}}]}}"#,
            sha = sha1_hex(version.as_bytes())
        );

        serve(server, "/manifest.json", catalog.into_bytes()).await;
        serve(server, "/v/1.20.1.json", version.into_bytes()).await;
        serve(server, "/indexes/5.json", index.into_bytes()).await;
        serve(server, "/client.jar", CLIENT.to_vec()).await;
        serve(server, "/libs/lib-1.0.jar", LIBRARY.to_vec()).await;
        serve(server, &format!("/res/{}/{}", &asset_hash[..2], asset_hash), ASSET.to_vec()).await;

        let mut spec = InstallSpec::new("1.20.1", dir.join("data"), dir.join("game"));
        spec.config.endpoints.version_manifest = format!("{}/manifest.json", uri);
        spec.config.endpoints.resources = format!("{}/res", uri);
        spec.config.backoff_base_ms = 1;
        spec
    }

    #[test]
    fn test_modloader_type_serialization() {
        assert_eq!(ModloaderType::Vanilla.as_str(), "vanilla");
        assert_eq!(ModloaderType::Fabric.as_str(), "fabric");
        assert_eq!(ModloaderType::Quilt.as_str(), "quilt");
        assert_eq!(ModloaderType::Forge.as_str(), "forge");
    }

    #[tokio::test]
    async fn vanilla_install_reports_progress_and_returns_layout() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let spec = fake_release(&server, dir.path()).await;
        let data_dir = spec.data_dir.clone();

        let reporter = Arc::new(MockProgressReporter::new());
        let session = InstallSession::new(reporter.clone());
        let layout = install_instance(spec, session.clone()).await.unwrap();

        assert_eq!(layout.profile_id, "1.20.1");
        assert_eq!(layout.main_class, "net.minecraft.client.main.Main");
        assert_eq!(
            layout.classpath,
            vec![
                data_dir.join("libraries/com/example/lib/1.0/lib-1.0.jar"),
                data_dir.join("versions/1.20.1/1.20.1.jar"),
            ]
        );
        assert_eq!(layout.asset_index_path, Some(data_dir.join("assets/indexes/5.json")));
        assert!(layout.main_jar.exists());

        // client jar, library and one asset object shared by two paths
        let progress = session.progress();
        assert_eq!(progress.tasks_total, 3);
        assert_eq!(progress.tasks_verified, 3);
        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(*reporter.done.lock().unwrap(), Some(true));
        assert_eq!(*reporter.percent.lock().unwrap(), 100);
        assert_eq!(reporter.counts.lock().unwrap().last(), Some(&(3, Some(3))));
        let steps = reporter.steps.lock().unwrap().clone();
        assert_eq!(
            steps,
            vec!["Resolving version", "Resolving dependencies", "Downloading files", "Post-processing"]
        );
        assert!(session.plan().is_some());
    }

    #[tokio::test]
    async fn reporter_can_cancel_the_install() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let spec = fake_release(&server, dir.path()).await;
        let libraries = spec.libraries_dir();

        let reporter = Arc::new(MockProgressReporter::new());
        reporter.cancel();
        let session = InstallSession::new(reporter.clone());
        let err = install_instance(spec, session.clone()).await.unwrap_err();

        assert!(matches!(err, InstallError::Cancelled { .. }));
        assert_eq!(session.state(), SessionState::Cancelled);
        assert_eq!(*reporter.done.lock().unwrap(), Some(false));
        assert!(!libraries.exists());
    }

    #[tokio::test]
    async fn panicking_reporter_does_not_abort() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let spec = fake_release(&server, dir.path()).await;

        let mut reporter = MockProgressReporter::new();
        reporter.panicky = true;
        let reporter = Arc::new(reporter);
        let session = InstallSession::new(reporter.clone());
        install_instance(spec, session.clone()).await.unwrap();

        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(*reporter.done.lock().unwrap(), Some(true));
    }
}
