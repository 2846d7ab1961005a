/// Database types for lesson records

/// A lesson row about to be inserted.
#[derive(Debug, Clone)]
pub struct NewLesson {
    pub teacher_id: i64,
    /// Comma-joined display form of `groups`
    pub group_name: String,
    /// Structured group list, stored as a JSON string column
    pub groups: Vec<String>,
    pub subject: String,
    pub topic: String,
    pub hours: i64,
    /// YYYY-MM-DD
    pub date: String,
    /// Full class-type name
    pub kind: String,
    pub auditorium: String,
}
