//! Named date windows used by the dashboard date filter.
//!
//! Every window is evaluated against a reference instant (normally "now") in that
//! instant's time zone, so day, week and month boundaries fall on local midnight.
//! Endpoints are inclusive at day granularity.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DateRange {
    #[default]
    All,
    Today,
    Yesterday,
    /// Monday-start week containing the reference day.
    ThisWeek,
    LastWeek,
    /// Trailing windows, today included.
    Last7Days,
    Last30Days,
    ThisMonth,
    LastMonth,
    /// Three-month block `month0 / 3` containing the reference day.
    ThisQuarter,
    LastQuarter,
    ThisYear,
    LastYear,
    /// A literal calendar year, independent of the reference instant.
    Year(i32),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown date range '{0}'")]
pub struct UnknownDateRange(pub String);

impl FromStr for DateRange {
    type Err = UnknownDateRange;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        let range = match token {
            "" | "todos" => DateRange::All,
            "hoy" => DateRange::Today,
            "ayer" => DateRange::Yesterday,
            "estaSemana" => DateRange::ThisWeek,
            "semanaPasada" => DateRange::LastWeek,
            "ultimos7" => DateRange::Last7Days,
            "ultimos30" => DateRange::Last30Days,
            "mes" => DateRange::ThisMonth,
            "mesPasado" => DateRange::LastMonth,
            "trimestre" => DateRange::ThisQuarter,
            "trimestrePasado" => DateRange::LastQuarter,
            "añoActual" => DateRange::ThisYear,
            "añoPasado" => DateRange::LastYear,
            year if year.len() == 4 && year.bytes().all(|b| b.is_ascii_digit()) => {
                DateRange::Year(year.parse().map_err(|_| UnknownDateRange(s.to_string()))?)
            }
            _ => return Err(UnknownDateRange(s.to_string())),
        };
        Ok(range)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            DateRange::All => "todos",
            DateRange::Today => "hoy",
            DateRange::Yesterday => "ayer",
            DateRange::ThisWeek => "estaSemana",
            DateRange::LastWeek => "semanaPasada",
            DateRange::Last7Days => "ultimos7",
            DateRange::Last30Days => "ultimos30",
            DateRange::ThisMonth => "mes",
            DateRange::LastMonth => "mesPasado",
            DateRange::ThisQuarter => "trimestre",
            DateRange::LastQuarter => "trimestrePasado",
            DateRange::ThisYear => "añoActual",
            DateRange::LastYear => "añoPasado",
            DateRange::Year(year) => return write!(f, "{:04}", year),
        };
        f.write_str(token)
    }
}

impl DateRange {
    pub fn literal_year(&self) -> Option<i32> {
        match self {
            DateRange::Year(year) => Some(*year),
            _ => None,
        }
    }

    /// Decides whether `timestamp` falls inside this window as seen from `reference`.
    pub fn contains<Tz: TimeZone>(&self, timestamp: &DateTime<Utc>, reference: &DateTime<Tz>) -> bool {
        let day = timestamp.with_timezone(&reference.timezone()).date_naive();
        let today = reference.date_naive();

        match self {
            DateRange::All => true,
            DateRange::Today => day == today,
            DateRange::Yesterday => day == days_before(today, 1),
            DateRange::ThisWeek => {
                let start = week_start(today);
                within(day, start, days_after(start, 6))
            }
            DateRange::LastWeek => {
                let start = days_before(week_start(today), 7);
                within(day, start, days_after(start, 6))
            }
            DateRange::Last7Days => within(day, days_before(today, 6), today),
            DateRange::Last30Days => within(day, days_before(today, 29), today),
            DateRange::ThisMonth => day.year() == today.year() && day.month() == today.month(),
            DateRange::LastMonth => {
                let (year, month) = previous_month(today.year(), today.month());
                day.year() == year && day.month() == month
            }
            DateRange::ThisQuarter => {
                day.year() == today.year() && quarter(day.month()) == quarter(today.month())
            }
            DateRange::LastQuarter => {
                let (year, q) = previous_quarter(today.year(), today.month());
                day.year() == year && quarter(day.month()) == q
            }
            DateRange::ThisYear => day.year() == today.year(),
            DateRange::LastYear => day.year() == today.year() - 1,
            DateRange::Year(year) => day.year() == *year,
        }
    }
}

fn within(day: NaiveDate, start: NaiveDate, end: NaiveDate) -> bool {
    start <= day && day <= end
}

fn days_before(day: NaiveDate, n: u64) -> NaiveDate {
    day.checked_sub_days(Days::new(n)).unwrap_or(NaiveDate::MIN)
}

fn days_after(day: NaiveDate, n: u64) -> NaiveDate {
    day.checked_add_days(Days::new(n)).unwrap_or(NaiveDate::MAX)
}

fn week_start(day: NaiveDate) -> NaiveDate {
    days_before(day, u64::from(day.weekday().num_days_from_monday()))
}

// Quarter index 0..=3 for a 1-based month.
fn quarter(month: u32) -> u32 {
    (month - 1) / 3
}

fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

fn previous_quarter(year: i32, month: u32) -> (i32, u32) {
    match quarter(month) {
        0 => (year - 1, 3),
        q => (year, q - 1),
    }
}
