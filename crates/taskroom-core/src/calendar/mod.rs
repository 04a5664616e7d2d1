//! Month grid computation for the calendar view.
//!
//! A grid always covers whole Sunday-to-Saturday weeks: it starts on the
//! Sunday on or before the 1st and ends on the Saturday on or after the last
//! day of the month, so it holds 28, 35 or 42 days.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::error::ValidationError;
use crate::task::{Task, TaskCollection};

pub const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarDay<'a> {
    pub date: NaiveDate,
    /// False for leading/trailing days borrowed from adjacent months
    pub in_month: bool,
    pub is_today: bool,
    pub tasks: Vec<&'a Task>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthGrid<'a> {
    pub year: i32,
    pub month: u32,
    pub days: Vec<CalendarDay<'a>>,
}

impl<'a> MonthGrid<'a> {
    /// Header text, e.g. "March 2026".
    pub fn title(&self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_default()
    }

    pub fn weeks(&self) -> impl Iterator<Item = &[CalendarDay<'a>]> {
        self.days.chunks(7)
    }

    pub fn day(&self, date: NaiveDate) -> Option<&CalendarDay<'a>> {
        self.days.iter().find(|d| d.date == date)
    }
}

/// First and last day shown for `year`/`month`.
pub fn grid_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), ValidationError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| invalid_month(year, month))?;
    let (next_year, next_month) = shift_month(year, month, 1);
    let last = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| invalid_month(year, month))?;

    let start = first - Duration::days(i64::from(first.weekday().num_days_from_sunday()));
    let end = last + Duration::days(i64::from(6 - last.weekday().num_days_from_sunday()));
    Ok((start, end))
}

/// Build the grid for a month, placing each task on its due day.
pub fn month_grid<'a>(
    tasks: &'a TaskCollection,
    year: i32,
    month: u32,
    today: NaiveDate,
) -> Result<MonthGrid<'a>, ValidationError> {
    let (start, end) = grid_bounds(year, month)?;
    let days = start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|date| CalendarDay {
            date,
            in_month: date.year() == year && date.month() == month,
            is_today: date == today,
            tasks: tasks.tasks_due_on(date),
        })
        .collect();
    Ok(MonthGrid { year, month, days })
}

/// Move `delta` months forward (negative goes back).
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

/// Parse `YYYY-MM`.
pub fn parse_year_month(raw: &str) -> Result<(i32, u32), ValidationError> {
    let err = || ValidationError::InvalidValue {
        field: "month".into(),
        message: format!("expected YYYY-MM, got '{raw}'"),
    };
    let (y, m) = raw.trim().split_once('-').ok_or_else(err)?;
    let year: i32 = y.parse().map_err(|_| err())?;
    let month: u32 = m.parse().map_err(|_| err())?;
    if !(1..=12).contains(&month) {
        return Err(err());
    }
    Ok((year, month))
}

fn invalid_month(year: i32, month: u32) -> ValidationError {
    ValidationError::InvalidValue {
        field: "month".into(),
        message: format!("{year}-{month:02} is not a valid month"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskDraft;
    use chrono::{TimeZone, Utc, Weekday};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn grid_covers_whole_weeks() {
        // March 2026 starts on a Sunday and ends on a Tuesday.
        let (start, end) = grid_bounds(2026, 3).unwrap();
        assert_eq!(start, ymd(2026, 3, 1));
        assert_eq!(end, ymd(2026, 4, 4));
        assert_eq!(start.weekday(), Weekday::Sun);
        assert_eq!(end.weekday(), Weekday::Sat);
    }

    #[test]
    fn february_can_fit_four_weeks() {
        // February 2015: Sunday the 1st through Saturday the 28th.
        let tasks = TaskCollection::new();
        let grid = month_grid(&tasks, 2015, 2, ymd(2015, 2, 10)).unwrap();
        assert_eq!(grid.days.len(), 28);
        assert!(grid.days.iter().all(|d| d.in_month));
    }

    #[test]
    fn leading_days_come_from_previous_month() {
        let tasks = TaskCollection::new();
        let grid = month_grid(&tasks, 2026, 10, ymd(2026, 10, 17)).unwrap();
        assert_eq!(grid.days.len() % 7, 0);
        assert_eq!(grid.days[0].date, ymd(2026, 9, 27));
        assert!(!grid.days[0].in_month);
        assert_eq!(grid.weeks().count(), grid.days.len() / 7);
        assert!(grid.day(ymd(2026, 10, 17)).unwrap().is_today);
        assert_eq!(grid.title(), "October 2026");
    }

    #[test]
    fn tasks_land_on_due_day() {
        let mut tasks = TaskCollection::new();
        let due = Utc.with_ymd_and_hms(2026, 10, 20, 15, 0, 0).unwrap();
        tasks.create_task(TaskDraft::new("review").with_due_date(due));
        tasks.create_task(TaskDraft::new("someday"));
        let grid = month_grid(&tasks, 2026, 10, ymd(2026, 10, 1)).unwrap();
        let day = grid.day(ymd(2026, 10, 20)).unwrap();
        assert_eq!(day.tasks.len(), 1);
        assert_eq!(day.tasks[0].title, "review");
        let placed: usize = grid.days.iter().map(|d| d.tasks.len()).sum();
        assert_eq!(placed, 1);
    }

    #[test]
    fn shift_month_wraps_years() {
        assert_eq!(shift_month(2026, 12, 1), (2027, 1));
        assert_eq!(shift_month(2026, 1, -1), (2025, 12));
        assert_eq!(shift_month(2026, 5, 0), (2026, 5));
    }

    #[test]
    fn parse_year_month_validates() {
        assert_eq!(parse_year_month("2026-07").unwrap(), (2026, 7));
        assert!(parse_year_month("2026-13").is_err());
        assert!(parse_year_month("July").is_err());
        assert!(grid_bounds(2026, 0).is_err());
    }
}
