//! Shared application state.

use std::sync::Arc;

use crate::db::LessonStore;
use crate::schedule_import::{JobRegistry, ScheduleFetcher};

/// State shared by every handler: the lesson store, the upstream timetable
/// client, and the async-job registry.
pub struct AppState {
    pub store: Arc<LessonStore>,
    pub fetcher: ScheduleFetcher,
    pub jobs: JobRegistry,
}

impl AppState {
    pub fn new(store: LessonStore, fetcher: ScheduleFetcher) -> Self {
        Self {
            store: Arc::new(store),
            fetcher,
            jobs: JobRegistry::new(),
        }
    }
}
