//! Error types for the schedule import subsystem.

use thiserror::Error;

/// Errors that can occur while fetching, walking, or importing a schedule.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Network/HTTP request failed
    #[error("Network error: {message}")]
    Network { message: String },

    /// The upstream returned a 200 with an empty body
    #[error("Empty response received from the timetable service")]
    EmptyResponse,

    /// A date parameter could not be parsed
    #[error("Invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { value: String },

    /// The requested range ends before it starts
    #[error("End date cannot be before start date")]
    InvalidRange,

    /// No job registered under this ID (never existed, or retention expired)
    #[error("Job {job_id} not found")]
    JobNotFound { job_id: String },

    /// The job exists but its worker has not finished yet
    #[error("Job {job_id} is still in progress")]
    JobNotFinished { job_id: String },

    /// The lesson already exists for this (teacher, date, group, subject)
    #[error("Lesson is already in the system")]
    AlreadyImported,

    /// An item reduced to zero groups after cleanup
    #[error("Group name is required")]
    MissingGroups,

    /// Underlying lesson store failed
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl From<reqwest::Error> for ScheduleError {
    fn from(err: reqwest::Error) -> Self {
        ScheduleError::Network {
            message: err.to_string(),
        }
    }
}
