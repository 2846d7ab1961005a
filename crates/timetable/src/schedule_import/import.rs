//! Persisting selected schedule items as lesson records.

use tracing::warn;

use super::error::ScheduleError;
use super::parse::LessonIndex;
use super::types::ScheduleItem;
use crate::db::{LessonStore, NewLesson};
use serde::Serialize;

/// Placeholder topic stamped on every imported lesson.
pub const IMPORT_TOPIC: &str = "Импортировано из расписания";
/// Imported lessons get a fixed duration; the schedule's time range is not
/// interpreted.
pub const IMPORT_HOURS: i64 = 2;
/// Bulk inserts run in transactions of this many lessons.
pub const IMPORT_BATCH_SIZE: usize = 20;

/// Per-item disposition counts of a bulk import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub added: usize,
    pub failed: usize,
    pub duplicates_skipped: usize,
}

/// Existence predicate bound to one teacher, backed by the lesson store.
pub struct TeacherLessonIndex<'a> {
    pub store: &'a LessonStore,
    pub teacher_id: i64,
}

impl LessonIndex for TeacherLessonIndex<'_> {
    fn contains(&self, date: &str, group_name: &str, subject: &str) -> bool {
        self.store
            .lesson_exists(self.teacher_id, date, group_name, subject)
            .unwrap_or(false)
    }
}

/// Groups of an item, trimmed and de-blanked; falls back to splitting the
/// comma-joined display form when the structured list is empty.
fn cleaned_groups(item: &ScheduleItem) -> Vec<String> {
    let raw: Vec<String> = if item.groups.is_empty() {
        item.group.split(',').map(|g| g.to_string()).collect()
    } else {
        item.groups.clone()
    };

    raw.iter()
        .map(|g| g.trim())
        .filter(|g| !g.is_empty())
        .map(|g| g.to_string())
        .collect()
}

fn lesson_record(teacher_id: i64, item: &ScheduleItem, groups: Vec<String>) -> NewLesson {
    NewLesson {
        teacher_id,
        group_name: groups.join(", "),
        groups,
        subject: item.subject.clone(),
        topic: IMPORT_TOPIC.to_string(),
        hours: IMPORT_HOURS,
        date: item.date.clone(),
        kind: item.class_type.clone(),
        auditorium: item.auditorium.clone(),
    }
}

/// Imports a single selected item.
///
/// Items flagged in-system, or already present for the exact
/// (teacher, date, group name, subject) tuple, are conflicts; an item with no
/// usable group is a validation error.
pub fn import_one(
    store: &LessonStore,
    teacher_id: i64,
    item: &ScheduleItem,
) -> Result<(), ScheduleError> {
    if item.in_system {
        return Err(ScheduleError::AlreadyImported);
    }

    let groups = cleaned_groups(item);
    if groups.is_empty() {
        return Err(ScheduleError::MissingGroups);
    }

    let group_name = groups.join(", ");
    if store.lesson_exists(teacher_id, &item.date, &group_name, &item.subject)? {
        return Err(ScheduleError::AlreadyImported);
    }

    store.insert_lesson(&lesson_record(teacher_id, item, groups))?;
    Ok(())
}

/// Imports a batch of selected items, reporting per-item dispositions.
///
/// Duplicates are counted and skipped, group-less items are dropped silently,
/// and the remainder is inserted in transactions of [`IMPORT_BATCH_SIZE`].
/// A failed batch counts entirely as failed; later batches still run.
pub fn import_all(store: &LessonStore, teacher_id: i64, items: &[ScheduleItem]) -> ImportSummary {
    let mut summary = ImportSummary::default();
    let mut pending = Vec::new();

    for item in items {
        let groups = cleaned_groups(item);
        if groups.is_empty() {
            continue;
        }

        let group_name = groups.join(", ");
        if store
            .lesson_exists(teacher_id, &item.date, &group_name, &item.subject)
            .unwrap_or(false)
        {
            summary.duplicates_skipped += 1;
            continue;
        }

        pending.push(lesson_record(teacher_id, item, groups));
    }

    for batch in pending.chunks(IMPORT_BATCH_SIZE) {
        match store.insert_lessons(batch) {
            Ok(()) => summary.added += batch.len(),
            Err(err) => {
                warn!(teacher_id, batch_size = batch.len(), error = %err, "lesson batch insert failed");
                summary.failed += batch.len();
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule_import::parse::parse_schedule_html;

    fn item(date: &str, subject: &str, groups: &[&str]) -> ScheduleItem {
        ScheduleItem {
            id: "lesson_0".to_string(),
            date: date.to_string(),
            time: "08:00-09:35".to_string(),
            class_type: "Практика".to_string(),
            subject: subject.to_string(),
            group: groups.join(", "),
            groups: groups.iter().map(|g| g.to_string()).collect(),
            subgroup: "Вся группа".to_string(),
            auditorium: String::new(),
            in_system: false,
        }
    }

    #[test]
    fn test_import_one_then_exists() {
        let store = LessonStore::in_memory();
        let item = item("2025-03-15", "Физика", &["ИС1-227-ОТ"]);

        import_one(&store, 1, &item).unwrap();
        assert!(store
            .lesson_exists(1, "2025-03-15", "ИС1-227-ОТ", "Физика")
            .unwrap());
        // A different teacher is unaffected
        assert!(!store
            .lesson_exists(2, "2025-03-15", "ИС1-227-ОТ", "Физика")
            .unwrap());
    }

    #[test]
    fn test_import_one_conflicts() {
        let store = LessonStore::in_memory();
        let fresh = item("2025-03-15", "Физика", &["ИС1-227-ОТ"]);

        import_one(&store, 1, &fresh).unwrap();
        assert!(matches!(
            import_one(&store, 1, &fresh),
            Err(ScheduleError::AlreadyImported)
        ));

        let mut flagged = item("2025-03-16", "Физика", &["ИС1-227-ОТ"]);
        flagged.in_system = true;
        assert!(matches!(
            import_one(&store, 1, &flagged),
            Err(ScheduleError::AlreadyImported)
        ));
        // The flagged item must not have produced a row
        assert!(!store
            .lesson_exists(1, "2025-03-16", "ИС1-227-ОТ", "Физика")
            .unwrap());
    }

    #[test]
    fn test_import_one_requires_groups() {
        let store = LessonStore::in_memory();
        let mut empty = item("2025-03-15", "Физика", &[]);
        empty.group = " , ".to_string();

        assert!(matches!(
            import_one(&store, 1, &empty),
            Err(ScheduleError::MissingGroups)
        ));
    }

    #[test]
    fn test_group_fallback_to_display_form() {
        let store = LessonStore::in_memory();
        let mut display_only = item("2025-03-15", "Физика", &[]);
        display_only.group = " ИС1-227-ОТ , ПБ2-118-ОБ ".to_string();

        import_one(&store, 1, &display_only).unwrap();
        assert!(store
            .lesson_exists(1, "2025-03-15", "ИС1-227-ОТ, ПБ2-118-ОБ", "Физика")
            .unwrap());
    }

    #[test]
    fn test_bulk_import_idempotent() {
        let store = LessonStore::in_memory();
        let items: Vec<_> = (0..25)
            .map(|i| item("2025-03-15", &format!("Предмет {i}"), &["ИС1-227-ОТ"]))
            .collect();

        let first = import_all(&store, 1, &items);
        assert_eq!(
            first,
            ImportSummary {
                added: 25,
                failed: 0,
                duplicates_skipped: 0
            }
        );

        let second = import_all(&store, 1, &items);
        assert_eq!(
            second,
            ImportSummary {
                added: 0,
                failed: 0,
                duplicates_skipped: 25
            }
        );

        assert_eq!(store.lesson_count(1).unwrap(), 25);
    }

    #[test]
    fn test_bulk_import_skips_groupless_items_silently() {
        let store = LessonStore::in_memory();
        let mut groupless = item("2025-03-15", "Физика", &[]);
        groupless.group = String::new();
        let items = vec![groupless, item("2025-03-15", "Математика", &["ИС1-227-ОТ"])];

        let summary = import_all(&store, 1, &items);
        assert_eq!(
            summary,
            ImportSummary {
                added: 1,
                failed: 0,
                duplicates_skipped: 0
            }
        );
    }

    #[test]
    fn test_round_trip_sets_in_system() {
        let store = LessonStore::in_memory();
        let html = "<div style=\"margin-bottom: 25px\">\
             <div><strong>15 марта 2025</strong></div>\
             <div>Суббота</div>\
             <table><tr><td>08:00-09:35</td><td>пр. Физика<br>ИС1-227-ОТ</td></tr></table>\
             </div>";
        let index = TeacherLessonIndex {
            store: &store,
            teacher_id: 1,
        };

        let before = parse_schedule_html(html, &index, 0);
        assert!(!before.items[0].in_system);

        import_one(&store, 1, &before.items[0]).unwrap();

        let after = parse_schedule_html(html, &index, 0);
        assert!(after.items[0].in_system);
    }
}
