//! In-memory registry of asynchronous fetch jobs.
//!
//! Each job runs on its own tokio task and owns all writes to its state;
//! pollers read consistent snapshots through the job's mutex. Finished jobs
//! stay available for one hour and then expire; expiry is recorded as a
//! registration timestamp and enforced lazily on lookup plus a sweep at every
//! job start, so no timer task is held per job.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::info;

use super::error::ScheduleError;
use super::fetch::FetchTimetable;
use super::import::TeacherLessonIndex;
use super::period::{walk_windows, DateRange, WalkOptions, WindowEvent};
use super::types::{JobOutcome, JobResult, ProgressResponse};
use crate::db::LessonStore;

/// How long finished jobs remain pollable.
pub const JOB_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Delay between windows, to stay under the upstream's rate limit.
const WINDOW_PACING: Duration = Duration::from_millis(500);

/// One asynchronous fetch job. Identity fields are immutable; everything
/// mutable lives behind the state mutex.
pub struct AsyncJob {
    pub id: String,
    pub teacher_name: String,
    pub start_date: String,
    pub end_date: String,
    state: Mutex<JobState>,
}

struct JobState {
    progress: u32,
    status: String,
    total_periods: usize,
    completed: usize,
    finished: bool,
    result: JobResult,
}

impl AsyncJob {
    fn new(id: String, teacher: String, start_date: String, end_date: String) -> Self {
        let result = JobResult {
            job_id: id.clone(),
            teacher_name: teacher.clone(),
            start_date: start_date.clone(),
            end_date: end_date.clone(),
            schedule_items: Vec::new(),
            response_size: 0,
            item_count: 0,
            debug_info: String::new(),
            completion_time: String::new(),
            status: JobOutcome::Running,
        };

        Self {
            id,
            teacher_name: teacher,
            start_date,
            end_date,
            state: Mutex::new(JobState {
                progress: 0,
                status: "Initializing...".to_string(),
                total_periods: 0,
                completed: 0,
                finished: false,
                result,
            }),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut JobState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn is_finished(&self) -> bool {
        self.state.lock().unwrap().finished
    }

    /// Copy-on-read progress snapshot; pollers never observe a half-written
    /// multi-field update.
    pub fn progress_snapshot(&self) -> ProgressResponse {
        let state = self.state.lock().unwrap();
        ProgressResponse {
            job_id: self.id.clone(),
            progress: state.progress,
            status: state.status.clone(),
            total_periods: state.total_periods,
            completed: state.completed,
            item_count: state.result.item_count,
            finished: state.finished,
        }
    }

    /// Full result, available only once the worker has finished.
    pub fn result_snapshot(&self) -> Option<JobResult> {
        let state = self.state.lock().unwrap();
        state.finished.then(|| state.result.clone())
    }

    fn fail(&self, err: &ScheduleError) {
        self.with_state(|state| {
            state.status = format!("Error: {err}");
            state.result.status = JobOutcome::Error;
            state.result.debug_info = format!("Error: {err}");
            state.progress = 100;
            state.finished = true;
        });
    }
}

struct JobEntry {
    job: Arc<AsyncJob>,
    registered_at: Instant,
    /// Handle to the job's worker task
    #[allow(dead_code)]
    worker: JoinHandle<()>,
}

/// Thread-safe registry of running and recently finished jobs.
pub struct JobRegistry {
    jobs: DashMap<String, JobEntry>,
    retention: Duration,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::with_retention(JOB_RETENTION)
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            jobs: DashMap::new(),
            retention,
        }
    }

    /// Registers a new job and launches its worker task. Returns the job ID
    /// immediately; the caller never blocks on completion.
    pub fn start<F>(
        &self,
        fetcher: F,
        store: Arc<LessonStore>,
        teacher: &str,
        start_date: &str,
        end_date: &str,
        teacher_id: i64,
    ) -> String
    where
        F: FetchTimetable + 'static,
    {
        self.purge_expired();

        let job_id = next_job_id();
        let job = Arc::new(AsyncJob::new(
            job_id.clone(),
            teacher.to_string(),
            start_date.to_string(),
            end_date.to_string(),
        ));

        info!(job_id = %job_id, teacher, start_date, end_date, "starting async schedule fetch");
        let worker = tokio::spawn(run_job(job.clone(), fetcher, store, teacher_id));

        self.jobs.insert(
            job_id.clone(),
            JobEntry {
                job,
                registered_at: Instant::now(),
                worker,
            },
        );

        job_id
    }

    /// Looks up a job, expiring it if its retention window has passed.
    pub fn get(&self, job_id: &str) -> Option<Arc<AsyncJob>> {
        self.jobs.get(job_id).and_then(|entry| {
            if entry.registered_at.elapsed() < self.retention {
                Some(entry.job.clone())
            } else {
                drop(entry);
                self.jobs.remove(job_id);
                None
            }
        })
    }

    /// Removes every job past its retention window.
    pub fn purge_expired(&self) {
        self.jobs
            .retain(|_, entry| entry.registered_at.elapsed() < self.retention);
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Time-based job IDs; nanosecond resolution keeps concurrent starts apart.
fn next_job_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("job_{nanos}")
}

/// Worker body: validates the range, walks every window with pacing, and
/// writes all progress and result fields onto the job.
async fn run_job<F>(job: Arc<AsyncJob>, fetcher: F, store: Arc<LessonStore>, teacher_id: i64)
where
    F: FetchTimetable,
{
    let range = match DateRange::parse(&job.start_date, &job.end_date) {
        Ok(range) => range,
        Err(err) => {
            job.fail(&err);
            return;
        }
    };

    let total = range.window_count();
    job.with_state(|state| {
        state.total_periods = total;
        state.status = format!("Starting fetch for {total} periods");
        state.progress = 5;
    });

    let lesson_index = TeacherLessonIndex {
        store: &store,
        teacher_id,
    };
    let options = WalkOptions {
        pacing: Some(WINDOW_PACING),
    };

    let worker_job = job.clone();
    let mut observer = move |event: &WindowEvent| match *event {
        WindowEvent::Started { index, total } => {
            // The finished flag doubles as the stop signal.
            if worker_job.is_finished() {
                return false;
            }
            worker_job.with_state(|state| {
                state.status = format!("Loading period {} of {}", index + 1, total);
                // 5% on start, then linear up to 95% across the windows
                state.progress = (5 + index * 90 / total) as u32;
                state.completed = index;
            });
            true
        }
        WindowEvent::Finished { items_so_far, .. } => {
            worker_job.with_state(|state| state.result.item_count = items_so_far);
            true
        }
    };

    let report = walk_windows(
        &fetcher,
        &job.teacher_name,
        &range,
        &lesson_index,
        &options,
        &mut observer,
    )
    .await;

    info!(
        job_id = %job.id,
        items = report.item_count,
        bytes = report.response_size,
        "async schedule fetch completed"
    );

    job.with_state(|state| {
        state.result.debug_info = report.debug;
        state.result.response_size = report.response_size;
        state.result.item_count = report.item_count;
        state.result.schedule_items = report.items;
        state.result.status = JobOutcome::Completed;
        state.result.completion_time = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        state.status = "Fetch completed".to_string();
        state.progress = 100;
        state.completed = state.total_periods;
        state.finished = true;
    });
}
