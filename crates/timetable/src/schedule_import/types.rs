//! Types for timetable scraping and lesson import.

use serde::{Deserialize, Serialize};

/// One detected class session from the upstream timetable.
///
/// Transient: items live only in responses and job results until the client
/// selects them for import.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleItem {
    /// Synthetic `lesson_<n>` ID, unique within one fetch operation
    pub id: String,
    /// Date in YYYY-MM-DD format
    pub date: String,
    /// Raw HH:MM-HH:MM range as printed by the source
    pub time: String,
    /// Full class-type name (Лекция, Практика, Лабораторная работа, ...)
    pub class_type: String,
    pub subject: String,
    /// Comma-joined display form of `groups`
    pub group: String,
    pub groups: Vec<String>,
    /// "Вся группа", "<n> п.г." or "Поток"
    pub subgroup: String,
    /// Room label, empty when the source shows none
    pub auditorium: String,
    /// True iff a matching lesson already exists for every group of the item
    pub in_system: bool,
}

/// Response for the synchronous schedule fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponse {
    pub schedule_items: Vec<ScheduleItem>,
    pub response_size: usize,
    pub item_count: usize,
    pub debug_info: String,
}

/// Request body for starting an asynchronous fetch job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AsyncFetchRequest {
    pub teacher: String,
    pub start_date: String,
    pub end_date: String,
}

/// Progress snapshot returned to pollers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    #[serde(rename = "jobID")]
    pub job_id: String,
    pub progress: u32,
    pub status: String,
    pub total_periods: usize,
    pub completed: usize,
    pub item_count: usize,
    pub finished: bool,
}

/// Terminal disposition of an asynchronous fetch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobOutcome {
    Running,
    Completed,
    Error,
}

/// Accumulated result of an asynchronous fetch job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    #[serde(rename = "jobID")]
    pub job_id: String,
    pub teacher_name: String,
    pub start_date: String,
    pub end_date: String,
    pub schedule_items: Vec<ScheduleItem>,
    pub response_size: usize,
    pub item_count: usize,
    pub debug_info: String,
    /// YYYY-MM-DD HH:MM:SS, empty until the job finishes
    pub completion_time: String,
    pub status: JobOutcome,
}

/// Request body for the bulk lesson import.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddAllLessonsRequest {
    pub schedule_items: Vec<ScheduleItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_item_wire_names() {
        let item = ScheduleItem {
            id: "lesson_0".to_string(),
            date: "2025-03-15".to_string(),
            time: "08:00-09:35".to_string(),
            class_type: "Лекция".to_string(),
            subject: "Математика".to_string(),
            group: "ИС1-227-ОТ".to_string(),
            groups: vec!["ИС1-227-ОТ".to_string()],
            subgroup: "Поток".to_string(),
            auditorium: "301".to_string(),
            in_system: false,
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["classType"], "Лекция");
        assert_eq!(json["inSystem"], false);
        assert!(json.get("class_type").is_none());
    }

    #[test]
    fn test_job_id_spelled_exactly() {
        let progress = ProgressResponse {
            job_id: "job_1".to_string(),
            progress: 5,
            status: "Initializing...".to_string(),
            total_periods: 3,
            completed: 0,
            item_count: 0,
            finished: false,
        };

        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["jobID"], "job_1");
        assert_eq!(json["totalPeriods"], 3);
    }

    #[test]
    fn test_job_outcome_lowercase() {
        assert_eq!(
            serde_json::to_string(&JobOutcome::Completed).unwrap(),
            "\"completed\""
        );
        assert_eq!(serde_json::to_string(&JobOutcome::Error).unwrap(), "\"error\"");
    }
}
