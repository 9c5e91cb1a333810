use crate::error::FailedTask;
use crate::game::installer::plan::FetchPlan;
use crate::game::installer::types::ProgressReporter;
use crate::game::profile::resolved::ResolvedProfile;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Resolving,
    Planning,
    Downloading,
    PostProcessing,
    Completed,
    /// Downloads settled with at least one failed task
    Incomplete,
    Cancelled,
    Failed,
}

/// Counter values at one point in time. Every field only grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    pub tasks_total: u64,
    pub tasks_verified: u64,
    pub tasks_failed: u64,
    pub bytes_transferred: u64,
}

impl ProgressSnapshot {
    pub fn tasks_settled(&self) -> u64 {
        self.tasks_verified + self.tasks_failed
    }

    pub fn percent(&self) -> i32 {
        if self.tasks_total == 0 {
            return -1;
        }
        ((self.tasks_settled() * 100) / self.tasks_total).min(100) as i32
    }
}

#[derive(Debug)]
struct SessionRecord {
    state: SessionState,
    profile: Option<ResolvedProfile>,
    plan: Option<FetchPlan>,
    completed: Vec<String>,
    failed: Vec<FailedTask>,
}

/// Handle for one install: cancellation, counters and the final record.
///
/// Share it as `Arc<InstallSession>`; [`InstallSession::cancel`] may be called
/// from any thread while the install runs.
pub struct InstallSession {
    reporter: Arc<dyn ProgressReporter>,
    cancelled: AtomicBool,
    tasks_total: AtomicU64,
    tasks_verified: AtomicU64,
    tasks_failed: AtomicU64,
    bytes_transferred: AtomicU64,
    record: Mutex<SessionRecord>,
}

impl std::fmt::Debug for InstallSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallSession")
            .field("state", &self.state())
            .field("cancelled", &self.cancelled.load(Ordering::SeqCst))
            .field("progress", &self.progress())
            .finish()
    }
}

impl InstallSession {
    pub fn new(reporter: Arc<dyn ProgressReporter>) -> Arc<Self> {
        Arc::new(Self {
            reporter,
            cancelled: AtomicBool::new(false),
            tasks_total: AtomicU64::new(0),
            tasks_verified: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            bytes_transferred: AtomicU64::new(0),
            record: Mutex::new(SessionRecord {
                state: SessionState::Resolving,
                profile: None,
                plan: None,
                completed: Vec::new(),
                failed: Vec::new(),
            }),
        })
    }

    fn record(&self) -> MutexGuard<'_, SessionRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Request cooperative cancellation. No new transfers or retries start;
    /// transfers already running finish on their own.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            log::info!("Install cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        let reporter = &self.reporter;
        match catch_unwind(AssertUnwindSafe(|| reporter.is_cancelled())) {
            Ok(true) => {
                self.cancel();
                true
            }
            Ok(false) => false,
            Err(_) => {
                log::warn!("Progress reporter panicked in is_cancelled; ignoring");
                false
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.record().state
    }

    pub fn progress(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            tasks_total: self.tasks_total.load(Ordering::SeqCst),
            tasks_verified: self.tasks_verified.load(Ordering::SeqCst),
            tasks_failed: self.tasks_failed.load(Ordering::SeqCst),
            bytes_transferred: self.bytes_transferred.load(Ordering::SeqCst),
        }
    }

    /// Ids of verified tasks, in settle order.
    pub fn completed_tasks(&self) -> Vec<String> {
        self.record().completed.clone()
    }

    pub fn failed_tasks(&self) -> Vec<FailedTask> {
        self.record().failed.clone()
    }

    pub fn profile(&self) -> Option<ResolvedProfile> {
        self.record().profile.clone()
    }

    /// The plan with each task's final state, once downloads have settled.
    pub fn plan(&self) -> Option<FetchPlan> {
        self.record().plan.clone()
    }

    /// Invoke the reporter, containing any panic it raises.
    pub(crate) fn notify(&self, f: impl FnOnce(&dyn ProgressReporter)) {
        let reporter = self.reporter.as_ref();
        if catch_unwind(AssertUnwindSafe(|| f(reporter))).is_err() {
            log::warn!("Progress reporter panicked; continuing install");
        }
    }

    pub(crate) fn set_state(&self, state: SessionState) {
        self.record().state = state;
        let label = match state {
            SessionState::Resolving => Some("Resolving version"),
            SessionState::Planning => Some("Resolving dependencies"),
            SessionState::Downloading => Some("Downloading files"),
            SessionState::PostProcessing => Some("Post-processing"),
            _ => None,
        };
        if let Some(label) = label {
            self.notify(|r| r.start_step(label, None));
        }
    }

    pub(crate) fn set_profile(&self, profile: ResolvedProfile) {
        self.record().profile = Some(profile);
    }

    pub(crate) fn store_plan(&self, plan: FetchPlan) {
        self.record().plan = Some(plan);
    }

    pub(crate) fn add_planned(&self, tasks: u64) {
        self.tasks_total.fetch_add(tasks, Ordering::SeqCst);
        self.publish();
    }

    pub(crate) fn record_verified(&self, id: &str, bytes: u64) {
        self.record().completed.push(id.to_string());
        self.tasks_verified.fetch_add(1, Ordering::SeqCst);
        self.bytes_transferred.fetch_add(bytes, Ordering::SeqCst);
        self.publish();
    }

    pub(crate) fn record_failed(&self, failed: FailedTask) {
        log::error!(
            "Giving up on {} after {} attempt(s): {}",
            failed.id,
            failed.attempts,
            failed.reason
        );
        self.record().failed.push(failed);
        self.tasks_failed.fetch_add(1, Ordering::SeqCst);
        self.publish();
    }

    fn publish(&self) {
        let snapshot = self.progress();
        self.notify(|r| {
            r.set_step_count(
                snapshot.tasks_settled() as u32,
                Some(snapshot.tasks_total as u32),
            );
            r.update_bytes(snapshot.bytes_transferred, None);
            r.set_percent(snapshot.percent());
        });
    }
}
