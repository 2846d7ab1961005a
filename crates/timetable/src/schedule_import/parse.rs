//! Regex extraction for the upstream timetable HTML.
//!
//! The source pages are semi-structured Russian HTML. Every field is pulled
//! out by its own pattern so that upstream format drift surfaces as one
//! failing extractor instead of a broken monolithic pass. Malformed input
//! degrades to fewer items; parsing never fails.

use regex::Regex;
use std::sync::LazyLock;

use super::types::ScheduleItem;

/// Subgroup label for a class taught to the full group.
pub const WHOLE_GROUP: &str = "Вся группа";
/// Subgroup label for a lecture stream spanning several groups.
pub const LECTURE_STREAM: &str = "Поток";

/// Table marker for a day without classes.
const NO_CLASSES_MARKER: &str = "Нет пар";

// Patterns compiled once; they mirror the markup the upstream currently
// emits. A silent layout change upstream yields empty results, not errors.
static DAY_BLOCK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)<div[^>]*margin-bottom: 25px[^>]*>\s*<div>\s*<strong>(\d+) ([а-яА-Я]+) (\d{4})</strong>\s*</div>\s*<div>\s*([а-яА-Я]+)\s*</div>\s*<table>(.*?)</table>\s*</div>",
    )
    .unwrap()
});
static CLASS_ROW_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<tr>\s*<td[^>]*>(\d+:\d+-\d+:\d+)</td>\s*<td[^>]*>(.*?)</td>\s*</tr>")
        .unwrap()
});
static SUBJECT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(лаб|пр|лек)\.\s+([^<\r\n]+)").unwrap());
static GROUP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([А-Я]+\d+-\d+-[А-Я]{2})").unwrap());
static SUBGROUP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s+п\.г\.").unwrap());
static AUDITORIUM_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a href="https://vgltu.ru/map/rasp\?auditory=([^"]+)">([^<]+)</a>"#).unwrap()
});

/// Existence predicate for already-persisted lessons.
///
/// Consulted once per (date, qualified group name, subject) candidate while
/// computing the `inSystem` flag. Implementations bind the teacher identity.
pub trait LessonIndex: Sync {
    fn contains(&self, date: &str, group_name: &str, subject: &str) -> bool;
}

/// One day's fragment of the upstream page.
struct DayBlock<'a> {
    day: &'a str,
    month: &'a str,
    year: &'a str,
    table: &'a str,
}

fn day_blocks(html: &str) -> Vec<DayBlock<'_>> {
    DAY_BLOCK_REGEX
        .captures_iter(html)
        .map(|caps| DayBlock {
            day: caps.get(1).map_or("", |m| m.as_str()),
            month: caps.get(2).map_or("", |m| m.as_str()),
            year: caps.get(3).map_or("", |m| m.as_str()),
            table: caps.get(5).map_or("", |m| m.as_str()),
        })
        .collect()
}

/// Maps a Russian genitive month name to its two-digit number.
fn month_number(month_ru: &str) -> Option<&'static str> {
    match month_ru.to_lowercase().as_str() {
        "января" => Some("01"),
        "февраля" => Some("02"),
        "марта" => Some("03"),
        "апреля" => Some("04"),
        "мая" => Some("05"),
        "июня" => Some("06"),
        "июля" => Some("07"),
        "августа" => Some("08"),
        "сентября" => Some("09"),
        "октября" => Some("10"),
        "ноября" => Some("11"),
        "декабря" => Some("12"),
        _ => None,
    }
}

fn class_rows(table: &str) -> Vec<(&str, &str)> {
    CLASS_ROW_REGEX
        .captures_iter(table)
        .filter_map(|caps| {
            let time = caps.get(1)?.as_str();
            let content = caps.get(2)?.as_str();
            Some((time, content))
        })
        .collect()
}

/// Extracts the class-type abbreviation and the trimmed subject name.
fn subject_line(content: &str) -> Option<(&str, String)> {
    let caps = SUBJECT_REGEX.captures(content)?;
    let abbr = caps.get(1)?.as_str();
    let subject = caps.get(2)?.as_str().trim().to_string();
    Some((abbr, subject))
}

/// Expands a class-type abbreviation to its full name.
///
/// Unrecognized abbreviations pass through with a trailing dot.
fn class_type_label(abbr: &str) -> String {
    match abbr {
        "пр" => "Практика".to_string(),
        "лек" => "Лекция".to_string(),
        "лаб" => "Лабораторная работа".to_string(),
        other => format!("{other}."),
    }
}

fn group_codes(content: &str) -> Vec<String> {
    GROUP_REGEX
        .captures_iter(content)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Resolves the subgroup label for a class row.
///
/// Lectures without an explicit marker default to the stream; everything else
/// defaults to the whole group.
fn subgroup_label(content: &str, abbr: &str) -> String {
    if let Some(caps) = SUBGROUP_REGEX.captures(content) {
        if let Some(n) = caps.get(1) {
            return format!("{} п.г.", n.as_str());
        }
    }
    if abbr == "лек" {
        LECTURE_STREAM.to_string()
    } else {
        WHOLE_GROUP.to_string()
    }
}

/// Room label from the auditorium map link; the link text is the label.
fn auditorium_label(content: &str) -> String {
    AUDITORIUM_REGEX
        .captures(content)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Group name as persisted: subgroup suffix appended unless the class runs
/// for the whole group or a lecture stream.
fn qualified_group(group: &str, subgroup: &str) -> String {
    if subgroup != WHOLE_GROUP && subgroup != LECTURE_STREAM {
        format!("{group} {subgroup}")
    } else {
        group.to_string()
    }
}

/// Output of one page parse.
pub struct ParsedPage {
    pub items: Vec<ScheduleItem>,
    /// Item counter after this page, for threading across a multi-page fetch
    pub next_id: usize,
}

/// Extracts schedule items from one timetable page.
///
/// `base_count` seeds the synthetic ID counter so IDs stay unique when a
/// caller parses several pages of one logical request.
pub fn parse_schedule_html(html: &str, index: &dyn LessonIndex, base_count: usize) -> ParsedPage {
    let mut items = Vec::new();
    let mut count = base_count;

    if html.is_empty() {
        return ParsedPage {
            items,
            next_id: count,
        };
    }

    for block in day_blocks(html) {
        if block.table.contains(NO_CLASSES_MARKER) {
            continue;
        }
        let Some(month) = month_number(block.month) else {
            continue;
        };
        let date = format!("{}-{}-{}", block.year, month, block.day);

        for (time, content) in class_rows(block.table) {
            let Some((abbr, subject)) = subject_line(content) else {
                continue;
            };

            // A row without a recognizable group cannot be imported.
            let groups = group_codes(content);
            if groups.is_empty() {
                continue;
            }

            let subgroup = subgroup_label(content, abbr);

            // Conservative flag: the item counts as already imported only if
            // every one of its groups has a matching persisted lesson.
            let in_system = groups
                .iter()
                .all(|g| index.contains(&date, &qualified_group(g, &subgroup), &subject));

            items.push(ScheduleItem {
                id: format!("lesson_{count}"),
                date: date.clone(),
                time: time.to_string(),
                class_type: class_type_label(abbr),
                subject,
                group: groups.join(", "),
                groups,
                subgroup,
                auditorium: auditorium_label(content),
                in_system,
            });

            count += 1;
        }
    }

    ParsedPage {
        items,
        next_id: count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Index backed by an explicit set of (date, group, subject) rows.
    struct SetIndex(HashSet<(String, String, String)>);

    impl SetIndex {
        fn empty() -> Self {
            Self(HashSet::new())
        }

        fn with(rows: &[(&str, &str, &str)]) -> Self {
            Self(
                rows.iter()
                    .map(|(d, g, s)| (d.to_string(), g.to_string(), s.to_string()))
                    .collect(),
            )
        }
    }

    impl LessonIndex for SetIndex {
        fn contains(&self, date: &str, group_name: &str, subject: &str) -> bool {
            self.0
                .contains(&(date.to_string(), group_name.to_string(), subject.to_string()))
        }
    }

    fn day_block_html(day: &str, month: &str, year: &str, table: &str) -> String {
        format!(
            "<div style=\"margin-bottom: 25px\">\
             <div><strong>{day} {month} {year}</strong></div>\
             <div>Понедельник</div>\
             <table>{table}</table>\
             </div>"
        )
    }

    fn class_row_html(time: &str, content: &str) -> String {
        format!("<tr><td class=\"time\">{time}</td><td>{content}</td></tr>")
    }

    #[test]
    fn test_month_number() {
        assert_eq!(month_number("марта"), Some("03"));
        assert_eq!(month_number("Декабря"), Some("12"));
        assert_eq!(month_number("march"), None);
    }

    #[test]
    fn test_class_type_label() {
        assert_eq!(class_type_label("пр"), "Практика");
        assert_eq!(class_type_label("лек"), "Лекция");
        assert_eq!(class_type_label("лаб"), "Лабораторная работа");
        assert_eq!(class_type_label("сем"), "сем.");
    }

    #[test]
    fn test_group_codes() {
        let content = "лаб. Физика<br>ИС1-227-ОТ, ПБ2-118-ОБ";
        assert_eq!(group_codes(content), vec!["ИС1-227-ОТ", "ПБ2-118-ОБ"]);
        assert!(group_codes("лек. Физика, поток").is_empty());
    }

    #[test]
    fn test_subgroup_defaults() {
        assert_eq!(subgroup_label("лаб. Физика ИС1-227-ОТ 2 п.г.", "лаб"), "2 п.г.");
        assert_eq!(subgroup_label("лек. Физика ИС1-227-ОТ", "лек"), LECTURE_STREAM);
        assert_eq!(subgroup_label("пр. Физика ИС1-227-ОТ", "пр"), WHOLE_GROUP);
    }

    #[test]
    fn test_auditorium_uses_link_text() {
        let content = "лек. Физика ИС1-227-ОТ \
            <a href=\"https://vgltu.ru/map/rasp?auditory=k2-301\">301</a>";
        assert_eq!(auditorium_label(content), "301");
        assert_eq!(auditorium_label("лек. Физика ИС1-227-ОТ"), "");
    }

    #[test]
    fn test_qualified_group() {
        assert_eq!(qualified_group("ИС1-227-ОТ", "1 п.г."), "ИС1-227-ОТ 1 п.г.");
        assert_eq!(qualified_group("ИС1-227-ОТ", WHOLE_GROUP), "ИС1-227-ОТ");
        assert_eq!(qualified_group("ИС1-227-ОТ", LECTURE_STREAM), "ИС1-227-ОТ");
    }

    #[test]
    fn test_parse_single_lecture() {
        let row = class_row_html(
            "08:00-09:35",
            "лек. Математика<br>ИС1-227-ОТ \
             <a href=\"https://vgltu.ru/map/rasp?auditory=k2-301\">301</a>",
        );
        let html = day_block_html("15", "марта", "2025", &row);

        let parsed = parse_schedule_html(&html, &SetIndex::empty(), 0);
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.next_id, 1);

        let item = &parsed.items[0];
        assert_eq!(item.id, "lesson_0");
        assert_eq!(item.date, "2025-03-15");
        assert_eq!(item.time, "08:00-09:35");
        assert_eq!(item.class_type, "Лекция");
        assert_eq!(item.subject, "Математика");
        assert_eq!(item.group, "ИС1-227-ОТ");
        assert_eq!(item.subgroup, LECTURE_STREAM);
        assert_eq!(item.auditorium, "301");
        assert!(!item.in_system);
    }

    #[test]
    fn test_no_classes_day_yields_nothing() {
        let html = day_block_html("15", "марта", "2025", "<tr><td>Нет пар</td></tr>");
        let parsed = parse_schedule_html(&html, &SetIndex::empty(), 0);
        assert!(parsed.items.is_empty());
        assert_eq!(parsed.next_id, 0);
    }

    #[test]
    fn test_degenerate_inputs() {
        let index = SetIndex::empty();
        assert!(parse_schedule_html("", &index, 0).items.is_empty());
        assert!(parse_schedule_html("<html><body>500</body></html>", &index, 0)
            .items
            .is_empty());
        // Day block with an empty table
        let html = day_block_html("15", "марта", "2025", "");
        assert!(parse_schedule_html(&html, &index, 0).items.is_empty());
    }

    #[test]
    fn test_unknown_month_skips_block() {
        let row = class_row_html("08:00-09:35", "лек. Математика ИС1-227-ОТ");
        let html = day_block_html("15", "мартобря", "2025", &row);
        assert!(parse_schedule_html(&html, &SetIndex::empty(), 0).items.is_empty());
    }

    #[test]
    fn test_row_without_groups_is_discarded() {
        let row = class_row_html("08:00-09:35", "лек. Математика, поток");
        let html = day_block_html("15", "марта", "2025", &row);
        assert!(parse_schedule_html(&html, &SetIndex::empty(), 0).items.is_empty());
    }

    #[test]
    fn test_counter_threads_across_pages() {
        let row = class_row_html("08:00-09:35", "пр. Физика<br>ИС1-227-ОТ");
        let html = day_block_html("15", "марта", "2025", &row);

        let first = parse_schedule_html(&html, &SetIndex::empty(), 0);
        let second = parse_schedule_html(&html, &SetIndex::empty(), first.next_id);

        assert_eq!(first.items[0].id, "lesson_0");
        assert_eq!(second.items[0].id, "lesson_1");
        assert_eq!(second.next_id, 2);
    }

    #[test]
    fn test_in_system_requires_all_groups() {
        let row = class_row_html("10:00-11:35", "пр. Физика<br>ИС1-227-ОТ, ПБ2-118-ОБ");
        let html = day_block_html("15", "марта", "2025", &row);

        let partial = SetIndex::with(&[("2025-03-15", "ИС1-227-ОТ", "Физика")]);
        let parsed = parse_schedule_html(&html, &partial, 0);
        assert!(!parsed.items[0].in_system);

        let full = SetIndex::with(&[
            ("2025-03-15", "ИС1-227-ОТ", "Физика"),
            ("2025-03-15", "ПБ2-118-ОБ", "Физика"),
        ]);
        let parsed = parse_schedule_html(&html, &full, 0);
        assert!(parsed.items[0].in_system);
    }

    #[test]
    fn test_in_system_uses_subgroup_suffix() {
        let row = class_row_html("10:00-11:35", "лаб. Физика<br>ИС1-227-ОТ 1 п.г.");
        let html = day_block_html("15", "марта", "2025", &row);

        // A row persisted without the suffix must not satisfy the check.
        let unsuffixed = SetIndex::with(&[("2025-03-15", "ИС1-227-ОТ", "Физика")]);
        assert!(!parse_schedule_html(&html, &unsuffixed, 0).items[0].in_system);

        let suffixed = SetIndex::with(&[("2025-03-15", "ИС1-227-ОТ 1 п.г.", "Физика")]);
        assert!(parse_schedule_html(&html, &suffixed, 0).items[0].in_system);
    }

    #[test]
    fn test_multiple_days_and_rows() {
        let day1 = day_block_html(
            "15",
            "марта",
            "2025",
            &(class_row_html("08:00-09:35", "лек. Математика<br>ИС1-227-ОТ")
                + &class_row_html("10:00-11:35", "пр. Математика<br>ИС1-227-ОТ")),
        );
        let day2 = day_block_html(
            "16",
            "марта",
            "2025",
            &class_row_html("08:00-09:35", "лаб. Физика<br>ИС1-227-ОТ 2 п.г."),
        );
        let html = format!("{day1}{day2}");

        let parsed = parse_schedule_html(&html, &SetIndex::empty(), 0);
        assert_eq!(parsed.items.len(), 3);
        assert_eq!(parsed.next_id, 3);

        let ids: HashSet<_> = parsed.items.iter().map(|i| i.id.clone()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(parsed.items[2].date, "2025-03-16");
        assert_eq!(parsed.items[2].subgroup, "2 п.г.");
    }
}
