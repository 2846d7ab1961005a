//! Date-range walking shared by the synchronous and asynchronous fetch paths.
//!
//! The upstream endpoint takes a single "from" date and returns at most 14
//! days of results, so a longer range is covered by repeated fetches, one per
//! 14-day window. A failed window is logged and skipped; it must never abort
//! the rest of the range.

use std::time::Duration;

use chrono::{Days, NaiveDate};
use tracing::warn;

use super::error::ScheduleError;
use super::fetch::FetchTimetable;
use super::parse::{parse_schedule_html, LessonIndex};
use super::types::ScheduleItem;

/// Maximum number of days the upstream returns per request.
pub const WINDOW_DAYS: u64 = 14;

/// A validated inclusive date range.
#[derive(Debug, Clone, Copy)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Parses and validates a range; the end must not precede the start.
    pub fn parse(start: &str, end: &str) -> Result<Self, ScheduleError> {
        let start = parse_date(start)?;
        let end = parse_date(end)?;
        if end < start {
            return Err(ScheduleError::InvalidRange);
        }
        Ok(Self { start, end })
    }

    pub fn total_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Number of 14-day windows needed to cover the range.
    pub fn window_count(&self) -> usize {
        (self.total_days() / WINDOW_DAYS as i64 + 1) as usize
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, ScheduleError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ScheduleError::InvalidDate {
        value: value.to_string(),
    })
}

/// Progress notifications emitted while walking a range.
#[derive(Debug, Clone, Copy)]
pub enum WindowEvent {
    /// About to process window `index` of `total`. Observers return `false`
    /// here to stop the walk; this is the cancellation point.
    Started { index: usize, total: usize },
    /// Window `index` done; `items_so_far` counts everything kept so far.
    Finished {
        index: usize,
        total: usize,
        items_so_far: usize,
    },
}

/// Walk tuning; the async path paces requests, the sync path does not.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkOptions {
    /// Delay before each window's fetch, for upstream rate-limit avoidance
    pub pacing: Option<Duration>,
}

/// Accumulated outcome of a full range walk.
#[derive(Debug)]
pub struct WalkReport {
    /// All kept items, sorted by (date, time)
    pub items: Vec<ScheduleItem>,
    /// Total bytes of upstream HTML received
    pub response_size: usize,
    pub item_count: usize,
    pub debug: String,
    pub total_periods: usize,
}

/// Fetches, decodes, and parses every window of `range` for one teacher.
///
/// The item-ID counter is threaded across windows, failed windows contribute
/// zero items, and items dated past `range.end` (the last window can
/// overshoot) are dropped.
pub async fn walk_windows<F, O>(
    fetcher: &F,
    teacher: &str,
    range: &DateRange,
    index: &dyn LessonIndex,
    options: &WalkOptions,
    observer: &mut O,
) -> WalkReport
where
    F: FetchTimetable,
    O: FnMut(&WindowEvent) -> bool,
{
    let total = range.window_count();
    let mut debug = format!(
        "Requesting schedule for {} days ({} periods of 14 days)\n\n",
        range.total_days() + 1,
        total
    );

    let mut items: Vec<ScheduleItem> = Vec::new();
    let mut response_size = 0usize;
    let mut next_id = 0usize;
    let mut current = range.start;

    for i in 0..total {
        if !observer(&WindowEvent::Started { index: i, total }) {
            break;
        }
        if current > range.end {
            break;
        }

        let date_str = current.format("%Y-%m-%d").to_string();
        debug.push_str(&format!("=== Request #{}: {} ===\n", i + 1, date_str));

        if let Some(pause) = options.pacing {
            tokio::time::sleep(pause).await;
        }

        match fetcher.fetch(teacher, &date_str).await {
            Ok(page) => {
                debug.push_str(&page.debug);
                response_size += page.html.len();

                // The upstream double-encodes; decode once before parsing.
                let decoded = entities::unescape(&page.html);
                let parsed = parse_schedule_html(&decoded, index, next_id);
                next_id = parsed.next_id;

                items.extend(
                    parsed
                        .items
                        .into_iter()
                        .filter(|item| within_end(item, range.end)),
                );
            }
            Err(err) => {
                warn!(date = %date_str, error = %err, "timetable fetch failed, skipping window");
                debug.push_str(&format!("Error fetching schedule for {date_str}: {err}\n"));
            }
        }

        observer(&WindowEvent::Finished {
            index: i,
            total,
            items_so_far: items.len(),
        });

        current = current + Days::new(WINDOW_DAYS);
    }

    let item_count = items.len();
    debug.push_str(&format!(
        "\n=== Total: found {item_count} items for the entire period ===\n"
    ));

    sort_items(&mut items);

    WalkReport {
        items,
        response_size,
        item_count,
        debug,
        total_periods: total,
    }
}

/// Keeps items whose date parses and does not exceed the requested end.
fn within_end(item: &ScheduleItem, end: NaiveDate) -> bool {
    match NaiveDate::parse_from_str(&item.date, "%Y-%m-%d") {
        Ok(date) => date <= end,
        Err(_) => false,
    }
}

/// Stable ascending sort by (date, time); both fields are fixed-width
/// sortable strings.
pub fn sort_items(items: &mut [ScheduleItem]) {
    items.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.time.cmp(&b.time)));
}

/// Decodes one level of HTML entity encoding from an upstream page.
pub fn decode_entities(html: &str) -> String {
    entities::unescape(html)
}

/// Minimal HTML entity decoding, enough for the double-encoded upstream
/// payload (avoiding an extra dependency).
mod entities {
    // &amp; is decoded last so freshly produced ampersands are not re-decoded.
    const ENTITIES: [(&str, &str); 8] = [
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#34;", "\""),
        ("&#39;", "'"),
        ("&apos;", "'"),
        ("&nbsp;", " "),
        ("&amp;", "&"),
    ];

    pub fn unescape(s: &str) -> String {
        let mut out = s.to_string();
        for (entity, ch) in ENTITIES {
            if out.contains(entity) {
                out = out.replace(entity, ch);
            }
        }
        out
    }
}
