use crate::error::{FailedTask, InstallError, InstallResult, TransferError};
use crate::game::installer::core::assets::materialize_virtual_assets;
use crate::game::installer::core::downloader::{is_already_valid, transfer};
use crate::game::installer::core::jre_manager::finalize_runtime;
use crate::game::installer::core::natives::{extract_entries, extract_natives};
use crate::game::installer::modloaders::forge::processors::run_processor;
use crate::game::installer::plan::{DownloadTask, FetchPlan, PostProcessKind, TaskState};
use crate::game::installer::session::{InstallSession, SessionState};
use crate::game::installer::types::InstallContext;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

/// How often the scheduler re-checks cancellation while nothing settles.
const CANCEL_POLL: Duration = Duration::from_millis(200);

enum Outcome {
    AlreadyValid,
    Transferred(u64),
}

/// Executes fetch plans under an [`InstallSession`].
pub struct DownloadEngine<'a> {
    ctx: &'a InstallContext,
    session: &'a InstallSession,
}

impl<'a> DownloadEngine<'a> {
    pub fn new(ctx: &'a InstallContext, session: &'a InstallSession) -> Self {
        Self { ctx, session }
    }

    async fn attempt(&self, idx: usize, task: DownloadTask) -> (usize, Result<Outcome, TransferError>) {
        if task.attempt == 1 && is_already_valid(&task).await {
            return (idx, Ok(Outcome::AlreadyValid));
        }
        let result = transfer(
            &self.ctx.client,
            &task,
            self.ctx.config(),
            self.ctx.spec.credentials.as_ref(),
        )
        .await
        .map(Outcome::Transferred);
        (idx, result)
    }

    /// Fetch every task in `plan`, updating each task's state in place.
    ///
    /// Tasks run on a pool of at most `concurrency` transfers. A failed
    /// attempt goes back to `Pending` after an exponential backoff until the
    /// attempt budget is spent, then the task is `Failed`; other tasks are not
    /// affected. Returns `Cancelled` when cancellation left tasks pending and
    /// `InstallationIncomplete` when any task failed.
    pub async fn run(&self, plan: &mut FetchPlan) -> InstallResult<()> {
        let config = self.ctx.config();
        let limit = config.effective_concurrency();
        let max_attempts = config.max_attempts();
        self.session.add_planned(plan.tasks.len() as u64);
        log::info!(
            "Downloading {} file(s) with up to {} concurrent transfer(s)",
            plan.tasks.len(),
            limit
        );

        let mut ready: VecDeque<usize> = plan
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.state == TaskState::Pending)
            .map(|(i, _)| i)
            .collect();
        let mut transfers = FuturesUnordered::new();
        let mut backoff: FuturesUnordered<BoxFuture<'static, usize>> = FuturesUnordered::new();
        let mut failures = Vec::new();
        let mut ticker = tokio::time::interval(CANCEL_POLL);

        loop {
            let cancelled = self.session.is_cancelled();
            if !cancelled {
                while transfers.len() < limit {
                    let Some(idx) = ready.pop_front() else { break };
                    let task = &mut plan.tasks[idx];
                    task.state = TaskState::InFlight;
                    task.attempt += 1;
                    transfers.push(self.attempt(idx, task.clone()));
                }
            }
            if transfers.is_empty() && (cancelled || (ready.is_empty() && backoff.is_empty())) {
                break;
            }

            tokio::select! {
                Some((idx, result)) = transfers.next(), if !transfers.is_empty() => {
                    let task = &mut plan.tasks[idx];
                    match result {
                        Ok(outcome) => {
                            task.state = TaskState::Verified;
                            let bytes = match outcome {
                                Outcome::AlreadyValid => {
                                    log::debug!("Already present and valid: {}", task.id);
                                    0
                                }
                                Outcome::Transferred(bytes) => {
                                    log::debug!("Downloaded {} ({} bytes)", task.id, bytes);
                                    bytes
                                }
                            };
                            self.session.record_verified(&task.id, bytes);
                        }
                        Err(e) if self.session.is_cancelled() => {
                            log::info!("Not retrying {} after cancellation: {}", task.id, e);
                            task.state = TaskState::Pending;
                        }
                        Err(e) if task.attempt < max_attempts && e.is_retryable() => {
                            let delay = config.backoff_delay(task.attempt);
                            log::warn!(
                                "Download of {} failed (attempt {}/{}): {}. Retrying in {:?}",
                                task.id,
                                task.attempt,
                                max_attempts,
                                e,
                                delay
                            );
                            task.state = TaskState::Pending;
                            backoff.push(Box::pin(async move {
                                tokio::time::sleep(delay).await;
                                idx
                            }));
                        }
                        Err(e) => {
                            task.state = TaskState::Failed;
                            let failed = FailedTask {
                                id: task.id.clone(),
                                url: task.url.clone(),
                                reason: e.to_string(),
                                attempts: task.attempt,
                            };
                            self.session.record_failed(failed.clone());
                            failures.push(failed);
                        }
                    }
                }
                Some(idx) = backoff.next(), if !backoff.is_empty() && !cancelled => {
                    ready.push_back(idx);
                }
                _ = ticker.tick() => {}
            }
        }

        let pending = plan
            .tasks
            .iter()
            .filter(|t| t.state == TaskState::Pending)
            .count();
        let verified = plan
            .tasks
            .iter()
            .filter(|t| t.state == TaskState::Verified)
            .count();

        if pending > 0 {
            log::warn!(
                "Download cancelled: {} verified, {} failed, {} not started",
                verified,
                failures.len(),
                pending
            );
            return Err(InstallError::Cancelled {
                completed: verified,
                remaining: pending,
            });
        }
        if !failures.is_empty() {
            return Err(InstallError::InstallationIncomplete { failed: failures });
        }
        log::info!("All {} file(s) verified", verified);
        Ok(())
    }

    /// Work that needs every download in place: native extraction, legacy
    /// virtual assets and the Java runtime, then loader post-processing in
    /// declared order.
    pub async fn post_process(&self, plan: &mut FetchPlan, natives_dir: &Path) -> InstallResult<()> {
        self.session.set_state(SessionState::PostProcessing);

        extract_natives(&plan.natives, natives_dir).await?;

        if let Some(ref virtual_assets) = plan.virtual_assets {
            let objects_dir = self.ctx.spec.assets_dir().join("objects");
            materialize_virtual_assets(virtual_assets, &objects_dir).await?;
        }

        if let Some(ref runtime) = plan.java_runtime {
            finalize_runtime(runtime)
                .await
                .map_err(|e| InstallError::PostProcess {
                    task: "java-runtime".into(),
                    reason: format!("{:#}", e),
                })?;
        }
        let java = plan.java_executable.clone();

        let max_attempts = self.ctx.config().max_attempts();
        let total = plan.post_process.len();
        for (i, task) in plan.post_process.iter_mut().enumerate() {
            if self.session.is_cancelled() {
                return Err(InstallError::Cancelled {
                    completed: i,
                    remaining: total - i,
                });
            }
            self.session
                .notify(|r| r.set_message(&format!("Post-processing {} ({}/{})", task.id, i + 1, total)));

            loop {
                task.attempt += 1;
                task.state = TaskState::InFlight;
                match self.run_post_task(&task.kind, java.as_deref()).await {
                    Ok(()) => {
                        task.state = TaskState::Verified;
                        log::info!("Post-processing step {} complete", task.id);
                        break;
                    }
                    Err(e) if task.attempt < max_attempts && !self.session.is_cancelled() => {
                        let delay = self.ctx.config().backoff_delay(task.attempt);
                        log::warn!(
                            "Post-processing step {} failed (attempt {}/{}): {:#}. Retrying in {:?}",
                            task.id,
                            task.attempt,
                            max_attempts,
                            e,
                            delay
                        );
                        task.state = TaskState::Pending;
                        tokio::time::sleep(delay).await;
                    }
                    Err(e) => {
                        task.state = TaskState::Failed;
                        log::error!("Post-processing step {} failed: {:#}", task.id, e);
                        return Err(InstallError::PostProcess {
                            task: task.id.clone(),
                            reason: format!("{:#}", e),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    async fn run_post_task(&self, kind: &PostProcessKind, java: Option<&Path>) -> anyhow::Result<()> {
        match kind {
            PostProcessKind::ExtractArchive { archive, entries } => {
                let count = extract_entries(archive, entries).await?;
                log::debug!("Extracted {} file(s) from {:?}", count, archive);
                Ok(())
            }
            PostProcessKind::RunProcessor(invocation) => run_processor(self.ctx, java, invocation).await,
        }
    }
}
