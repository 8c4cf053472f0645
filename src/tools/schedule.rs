//! Schedule tool operations, including the timeline projection
//! (`spec.md` §4.E).

use crate::core::error::{MaestroError, Result};
use crate::core::model::{Schedule, ScheduleItem, ScheduleItemStatus};
use crate::core::mutator;
use crate::core::path_resolver as paths;
use crate::core::runtime::Runtime;
use crate::core::time::parse_due_date;
use crate::events::Event;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;

const UNSCHEDULED_CAP: usize = 50;

pub fn get_schedule_status(runtime: &Runtime, slug: &str) -> Result<Schedule> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    crate::core::atomic_store::read_typed(&paths::schedule_path(&project_root))
}

pub fn list_schedule_items(runtime: &Runtime, slug: &str) -> Result<Vec<ScheduleItem>> {
    Ok(get_schedule_status(runtime, slug)?.items)
}

fn emit(runtime: &Runtime, slug: &str) {
    runtime.event_bus.publish(Event::ScheduleUpdated { project_slug: slug.to_string() });
}

/// Unknown `type`/`status` strings are clamped to `activity`/`pending`
/// at the transport boundary, before a typed `ScheduleItem` reaches this
/// function — see `transport::http::parse_schedule_item`.
pub fn upsert_schedule_item(runtime: &Runtime, slug: &str, item: ScheduleItem) -> Result<ScheduleItem> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    let saved = mutator::upsert_item(&project_root, item)?;
    emit(runtime, slug);
    Ok(saved)
}

pub fn set_schedule_constraint(runtime: &Runtime, slug: &str, item_id: &str, impact: &str) -> Result<ScheduleItem> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    let item = mutator::set_constraint(&project_root, item_id, impact)?;
    emit(runtime, slug);
    Ok(item)
}

pub fn close_schedule_item(
    runtime: &Runtime,
    slug: &str,
    item_id: &str,
    status: ScheduleItemStatus,
    reason: &str,
) -> Result<ScheduleItem> {
    let project_root = paths::project_root(&runtime.config.store_root, slug)?;
    let item = mutator::close_item(&project_root, item_id, status, reason)?;
    emit(runtime, slug);
    Ok(item)
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineDay {
    pub date: String,
    pub label: String,
    pub is_today: bool,
    pub is_past: bool,
    pub is_future: bool,
    pub week_start: String,
    pub week_label: String,
    pub items: Vec<ScheduleItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Timeline {
    pub days: Vec<TimelineDay>,
    pub unscheduled: Vec<ScheduleItem>,
}

/// `get_schedule_timeline`: one row per day in `month` (`YYYY-MM`), days
/// sorted `date desc`; items with no parseable due date go in `unscheduled`
/// instead, capped at `UNSCHEDULED_CAP`.
pub fn get_schedule_timeline(
    runtime: &Runtime,
    slug: &str,
    month: &str,
    include_empty_days: bool,
) -> Result<Timeline> {
    let (year, month_num) = parse_year_month(month)?;
    let month_start = NaiveDate::from_ymd_opt(year, month_num, 1)
        .ok_or_else(|| MaestroError::InvalidArgument(format!("invalid month '{month}'")))?;
    let next_month_start = if month_num == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month_num + 1, 1)
    }
    .expect("adjacent month is always valid");
    let month_end = next_month_start - Duration::days(1);

    let items = list_schedule_items(runtime, slug)?;
    let today = Utc::now().date_naive();

    let mut by_date: HashMap<NaiveDate, Vec<ScheduleItem>> = HashMap::new();
    let mut unscheduled = Vec::new();
    for item in items {
        match parse_due_date(&item.due_date) {
            Some(date) if date >= month_start && date <= month_end => {
                by_date.entry(date).or_default().push(item);
            }
            Some(_) => {} // scheduled but outside this month — not shown here
            None => {
                if unscheduled.len() < UNSCHEDULED_CAP {
                    unscheduled.push(item);
                }
            }
        }
    }

    let mut days = Vec::new();
    let mut cursor = month_start;
    while cursor <= month_end {
        if include_empty_days || by_date.contains_key(&cursor) {
            let week_start = cursor - Duration::days(cursor.weekday().num_days_from_monday() as i64);
            days.push(TimelineDay {
                date: cursor.format("%Y-%m-%d").to_string(),
                label: cursor.format("%a %-d %b").to_string(),
                is_today: cursor == today,
                is_past: cursor < today,
                is_future: cursor > today,
                week_start: week_start.format("%Y-%m-%d").to_string(),
                week_label: format!("Week of {}", week_start.format("%-d %b")),
                items: by_date.remove(&cursor).unwrap_or_default(),
            });
        }
        cursor += Duration::days(1);
    }
    days.sort_by(|a, b| b.date.cmp(&a.date));

    Ok(Timeline { days, unscheduled })
}

fn parse_year_month(month: &str) -> Result<(i32, u32)> {
    let mut parts = month.split('-');
    let year = parts.next().and_then(|s| s.parse::<i32>().ok());
    let month_num = parts.next().and_then(|s| s.parse::<u32>().ok());
    match (year, month_num, parts.next()) {
        (Some(y), Some(m), None) if (1..=12).contains(&m) => Ok((y, m)),
        _ => Err(MaestroError::InvalidArgument(format!("expected 'YYYY-MM', got '{month}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeline_buckets_by_day_and_caps_unscheduled() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("project.json"), r#"{"slug":"root"}"#).unwrap();
        let runtime = Runtime::for_test(dir.path());
        upsert_schedule_item(&runtime, "root", ScheduleItem {
            title: "Pour slab".into(),
            due_date: "2026-03-15".into(),
            ..Default::default()
        }).unwrap();
        for i in 0..60 {
            upsert_schedule_item(&runtime, "root", ScheduleItem {
                title: format!("Unscheduled {i}"),
                ..Default::default()
            }).unwrap();
        }

        let timeline = get_schedule_timeline(&runtime, "root", "2026-03", false).unwrap();
        assert_eq!(timeline.days.len(), 1);
        assert_eq!(timeline.days[0].date, "2026-03-15");
        assert_eq!(timeline.unscheduled.len(), UNSCHEDULED_CAP);
    }

    #[test]
    fn invalid_month_is_invalid_argument() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("project.json"), r#"{"slug":"root"}"#).unwrap();
        let runtime = Runtime::for_test(dir.path());
        let err = get_schedule_timeline(&runtime, "root", "not-a-month", true).unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");
    }

    #[test]
    fn close_requires_terminal_status_through_tool_layer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("project.json"), r#"{"slug":"root"}"#).unwrap();
        let runtime = Runtime::for_test(dir.path());
        let item = upsert_schedule_item(&runtime, "root", ScheduleItem { title: "x".into(), ..Default::default() }).unwrap();
        let err = close_schedule_item(&runtime, "root", &item.id, ScheduleItemStatus::Pending, "n/a").unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");
    }
}
