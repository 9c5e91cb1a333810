use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;

use piston_install::{install_instance, Credentials, InstallSession, InstallSpec, ModloaderType, ProgressReporter};

struct ConsoleReporter {
    cancel_rx: watch::Receiver<bool>,
}

impl ConsoleReporter {
    fn new() -> (Self, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { cancel_rx: rx }, tx)
    }
}

impl ProgressReporter for ConsoleReporter {
    fn start_step(&self, name: &str, total_steps: Option<u32>) {
        println!("[STEP START] {} (total: {:?})", name, total_steps);
    }

    fn update_bytes(&self, transferred: u64, total: Option<u64>) {
        if let Some(t) = total {
            println!("[BYTES] {}/{}", transferred, t);
        } else {
            println!("[BYTES] {}", transferred);
        }
    }

    fn set_percent(&self, percent: i32) {
        println!("[PROGRESS] {}%", percent);
    }

    fn set_message(&self, message: &str) {
        println!("[MSG] {}", message);
    }

    fn set_step_count(&self, current: u32, total: Option<u32>) {
        println!("[STEP COUNT] {}/{:?}", current, total);
    }

    fn done(&self, success: bool, message: Option<&str>) {
        println!("[DONE] success={} message={:?}", success, message);
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }
}

/// `PISTON_VERSION` is `<mc>` or `<loader>:<mc>[:<loader version>]`,
/// e.g. `fabric:1.20.1` or `forge:1.20.1:47.2.0`.
fn parse_target(target: &str) -> Result<(String, Option<ModloaderType>, Option<String>)> {
    let parts: Vec<&str> = target.split(':').collect();
    match parts.as_slice() {
        [mc] => Ok((mc.to_string(), None, None)),
        [loader, mc] => Ok((mc.to_string(), Some(loader.parse()?), None)),
        [loader, mc, version] => Ok((mc.to_string(), Some(loader.parse()?), Some(version.to_string()))),
        _ => anyhow::bail!("Unrecognised target {:?}", target),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let target = std::env::var("PISTON_VERSION").unwrap_or_else(|_| "1.20.1".to_string());
    let (version, loader, loader_version) = parse_target(&target)?;

    // Without PISTON_DATA_DIR the install goes to a temp directory that is
    // removed on exit.
    let tmp = tempfile::tempdir()?;
    let root = match std::env::var_os("PISTON_DATA_DIR") {
        Some(dir) => std::path::PathBuf::from(dir),
        None => tmp.path().to_path_buf(),
    };

    let mut spec = InstallSpec::new(version, root.join("data"), root.join("game"));
    if let Some(loader) = loader {
        spec = spec.with_loader(loader, loader_version);
    }
    spec.credentials = Some(Credentials::offline("Player"));

    let (reporter_impl, cancel_tx) = ConsoleReporter::new();
    let session = InstallSession::new(Arc::new(reporter_impl));

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("Cancelling...");
            let _ = cancel_tx.send(true);
        }
    });

    println!("Installing {} into {}", target, root.display());
    let layout = install_instance(spec, session.clone())
        .await
        .context("Installation failed")?;

    println!("Main class: {}", layout.main_class);
    println!("Classpath: {} entries", layout.classpath.len());
    println!("Natives:   {}", layout.natives_dir.display());
    match &layout.java_executable {
        Some(java) => println!("Java:      {}", java.display()),
        None => println!("Java:      (host default)"),
    }
    println!("Progress:  {:?}", session.progress());
    Ok(())
}
