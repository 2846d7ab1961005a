/// Database module for imported lesson records
mod types;

pub use types::NewLesson;

use rusqlite::{params, Connection, Result};
use std::sync::Mutex;

const SCHEMA_SQL: &str = include_str!("../../../../sql/init_lessons.sql");

const INSERT_LESSON_SQL: &str = "INSERT INTO lessons (
        teacher_id, group_name, groups_json, subject, topic,
        hours, date, kind, auditorium, created_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, datetime('now'))";

pub struct LessonStore {
    db: Mutex<Connection>,
}

impl LessonStore {
    /// Creates a new LessonStore and initializes the database schema
    pub fn new(db_path: &str) -> Self {
        let conn = Connection::open(db_path).expect("Failed to open database");

        conn.execute_batch(SCHEMA_SQL)
            .expect("Failed to initialize database schema");

        Self {
            db: Mutex::new(conn),
        }
    }

    /// In-memory store with the same schema, for tests
    pub fn in_memory() -> Self {
        let conn = Connection::open_in_memory().expect("Failed to open in-memory database");

        conn.execute_batch(SCHEMA_SQL)
            .expect("Failed to initialize database schema");

        Self {
            db: Mutex::new(conn),
        }
    }

    /// Checks whether a lesson already exists for the exact
    /// (teacher, date, group name, subject) tuple
    pub fn lesson_exists(
        &self,
        teacher_id: i64,
        date: &str,
        group_name: &str,
        subject: &str,
    ) -> Result<bool> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT COUNT(*) FROM lessons
             WHERE teacher_id = ?1 AND date = ?2 AND group_name = ?3 AND subject = ?4",
        )?;
        let count: i64 = stmt.query_row(params![teacher_id, date, group_name, subject], |row| {
            row.get(0)
        })?;
        Ok(count > 0)
    }

    /// Inserts a single lesson record
    pub fn insert_lesson(&self, lesson: &NewLesson) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            INSERT_LESSON_SQL,
            params![
                lesson.teacher_id,
                lesson.group_name,
                serde_json::to_string(&lesson.groups).unwrap(),
                lesson.subject,
                lesson.topic,
                lesson.hours,
                lesson.date,
                lesson.kind,
                lesson.auditorium,
            ],
        )?;
        Ok(())
    }

    /// Inserts a batch of lessons inside one transaction; the batch commits
    /// or fails as a whole
    pub fn insert_lessons(&self, lessons: &[NewLesson]) -> Result<()> {
        if lessons.is_empty() {
            return Ok(());
        }

        let mut db = self.db.lock().unwrap();
        let tx = db.transaction()?;

        for lesson in lessons {
            tx.execute(
                INSERT_LESSON_SQL,
                params![
                    lesson.teacher_id,
                    lesson.group_name,
                    serde_json::to_string(&lesson.groups).unwrap(),
                    lesson.subject,
                    lesson.topic,
                    lesson.hours,
                    lesson.date,
                    lesson.kind,
                    lesson.auditorium,
                ],
            )?;
        }

        tx.commit()
    }

    /// Number of lessons persisted for a teacher
    pub fn lesson_count(&self, teacher_id: i64) -> Result<i64> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare("SELECT COUNT(*) FROM lessons WHERE teacher_id = ?1")?;
        stmt.query_row(params![teacher_id], |row| row.get(0))
    }
}
