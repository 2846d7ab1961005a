//! API endpoints for schedule fetching and lesson import.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::schedule_import::{
    decode_entities, import_all, import_one, parse_schedule_html, sort_items, walk_windows,
    AddAllLessonsRequest, AsyncFetchRequest, DateRange, FetchTimetable, ScheduleError,
    ScheduleItem, ScheduleResponse, TeacherLessonIndex, WalkOptions,
};
use crate::server::middleware::identity::TeacherId;
use crate::server::types::ApiErrorType;
use crate::types::AppState;

/// Query parameters for the synchronous schedule fetch.
#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    pub teacher: Option<String>,
    pub date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
}

/// Converts a ScheduleError to an API response.
fn schedule_error_to_response(error: ScheduleError) -> Response {
    let (status, message) = match &error {
        ScheduleError::InvalidDate { .. } | ScheduleError::InvalidRange => {
            (StatusCode::BAD_REQUEST, "Invalid date range")
        }
        ScheduleError::MissingGroups => (StatusCode::BAD_REQUEST, "Group name is required"),
        ScheduleError::AlreadyImported => (StatusCode::CONFLICT, "Lesson is already in the system"),
        ScheduleError::JobNotFound { .. } => (StatusCode::NOT_FOUND, "Job not found"),
        ScheduleError::JobNotFinished { .. } => {
            (StatusCode::PRECONDITION_FAILED, "Job is still in progress")
        }
        ScheduleError::Network { .. } | ScheduleError::EmptyResponse => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to fetch schedule from API",
        ),
        ScheduleError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to add lesson"),
    };

    ApiErrorType::from((status, message, Some(error.to_string()))).into_response()
}

/// GET /api/schedule?teacher=&date=&endDate=
///
/// Fetches, parses, and sorts the teacher's schedule. With an `endDate`
/// differing from `date` the whole range is walked in 14-day windows;
/// otherwise a single page is fetched. `date` defaults to today.
pub async fn get_schedule(
    State(s): State<Arc<AppState>>,
    Extension(TeacherId(teacher_id)): Extension<TeacherId>,
    Query(params): Query<ScheduleQuery>,
) -> Response {
    let Some(teacher) = params.teacher.filter(|t| !t.is_empty()) else {
        return ApiErrorType::from((StatusCode::BAD_REQUEST, "Teacher name is required", None))
            .into_response();
    };
    let date = params
        .date
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
    let end_date = params.end_date.unwrap_or_default();

    info!(teacher = %teacher, date = %date, end_date = %end_date, "GET /api/schedule");

    let index = TeacherLessonIndex {
        store: s.store.as_ref(),
        teacher_id,
    };

    if !end_date.is_empty() && end_date != date {
        let range = match DateRange::parse(&date, &end_date) {
            Ok(range) => range,
            Err(err) => {
                return ApiErrorType::from((
                    StatusCode::BAD_REQUEST,
                    "Invalid date range",
                    Some(err.to_string()),
                ))
                .into_response()
            }
        };

        let report = walk_windows(
            &s.fetcher,
            &teacher,
            &range,
            &index,
            &WalkOptions::default(),
            &mut |_| true,
        )
        .await;

        let response = ScheduleResponse {
            response_size: report.response_size,
            item_count: report.item_count,
            debug_info: report.debug,
            schedule_items: report.items,
        };
        (StatusCode::OK, Json(response)).into_response()
    } else {
        match s.fetcher.fetch(&teacher, &date).await {
            Ok(page) => {
                let decoded = decode_entities(&page.html);
                let parsed = parse_schedule_html(&decoded, &index, 0);
                let mut items = parsed.items;
                sort_items(&mut items);

                let response = ScheduleResponse {
                    response_size: page.html.len(),
                    item_count: items.len(),
                    debug_info: page.debug,
                    schedule_items: items,
                };
                (StatusCode::OK, Json(response)).into_response()
            }
            Err(err) => {
                error!(teacher = %teacher, date = %date, error = %err, "schedule fetch failed");
                schedule_error_to_response(err)
            }
        }
    }
}

/// POST /api/schedule/async
///
/// Starts a background fetch over a date range and returns its job ID
/// immediately; progress and results are polled separately.
pub async fn start_async_fetch(
    State(s): State<Arc<AppState>>,
    Extension(TeacherId(teacher_id)): Extension<TeacherId>,
    Json(req): Json<AsyncFetchRequest>,
) -> Response {
    if req.teacher.is_empty() || req.start_date.is_empty() || req.end_date.is_empty() {
        return ApiErrorType::from((
            StatusCode::BAD_REQUEST,
            "Teacher, startDate, and endDate are required",
            None,
        ))
        .into_response();
    }

    let job_id = s.jobs.start(
        s.fetcher.clone(),
        s.store.clone(),
        &req.teacher,
        &req.start_date,
        &req.end_date,
        teacher_id,
    );

    (StatusCode::OK, Json(json!({ "jobID": job_id }))).into_response()
}

/// GET /api/schedule/progress/:job_id
pub async fn get_progress(
    Path(job_id): Path<String>,
    State(s): State<Arc<AppState>>,
) -> Response {
    match s.jobs.get(&job_id) {
        Some(job) => (StatusCode::OK, Json(job.progress_snapshot())).into_response(),
        None => schedule_error_to_response(ScheduleError::JobNotFound { job_id }),
    }
}

/// GET /api/schedule/results/:job_id
pub async fn get_results(Path(job_id): Path<String>, State(s): State<Arc<AppState>>) -> Response {
    match s.jobs.get(&job_id) {
        Some(job) => match job.result_snapshot() {
            Some(result) => (StatusCode::OK, Json(result)).into_response(),
            None => schedule_error_to_response(ScheduleError::JobNotFinished { job_id }),
        },
        None => schedule_error_to_response(ScheduleError::JobNotFound { job_id }),
    }
}

/// POST /api/schedule/lesson
///
/// Imports a single selected schedule item as a lesson.
pub async fn add_lesson(
    State(s): State<Arc<AppState>>,
    Extension(TeacherId(teacher_id)): Extension<TeacherId>,
    Json(item): Json<ScheduleItem>,
) -> Response {
    match import_one(&s.store, teacher_id, &item) {
        Ok(()) => {
            info!(teacher_id, date = %item.date, subject = %item.subject, "imported lesson from schedule");
            (StatusCode::CREATED, Json(json!({ "added": 1 }))).into_response()
        }
        Err(err) => schedule_error_to_response(err),
    }
}

/// POST /api/schedule/lessons
///
/// Imports a batch of schedule items; always 200 with per-item disposition
/// counts once the list is non-empty.
pub async fn add_all_lessons(
    State(s): State<Arc<AppState>>,
    Extension(TeacherId(teacher_id)): Extension<TeacherId>,
    Json(req): Json<AddAllLessonsRequest>,
) -> Response {
    if req.schedule_items.is_empty() {
        return ApiErrorType::from((StatusCode::BAD_REQUEST, "No lessons to add", None))
            .into_response();
    }

    let summary = import_all(&s.store, teacher_id, &req.schedule_items);
    info!(
        teacher_id,
        added = summary.added,
        failed = summary.failed,
        duplicates = summary.duplicates_skipped,
        "imported lessons from schedule"
    );

    (StatusCode::OK, Json(summary)).into_response()
}
