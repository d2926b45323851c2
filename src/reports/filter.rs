use chrono::{DateTime, TimeZone};
use serde::Deserialize;
use thiserror::Error;
use utoipa::IntoParams;

use crate::models::{Priority, Report};
use crate::reports::date_range::{DateRange, UnknownDateRange};

/// Sentinel accepted by the priority and type filters meaning "do not filter".
pub const ALL_SENTINEL: &str = "todos";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error(transparent)]
    DateRange(#[from] UnknownDateRange),
    #[error("unknown priority '{0}'")]
    Priority(String),
}

/// Query-string form of a filter, shared by the stats and export endpoints.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FilterParams {
    /// Date range token (`todos`, `hoy`, `mes`, `2025`, ...)
    pub fecha: Option<String>,
    /// `Baja`, `Media`, `Alta`, `Crítica` or `todos`
    pub prioridad: Option<String>,
    /// Problem type or `todos`
    pub tipo: Option<String>,
    /// Free-text search
    pub q: Option<String>,
}

/// The dashboard's four predicates, ANDed together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportFilter {
    pub date_range: DateRange,
    pub priority: Option<Priority>,
    pub problem_type: Option<String>,
    pub search: String,
}

impl TryFrom<&FilterParams> for ReportFilter {
    type Error = FilterError;

    fn try_from(params: &FilterParams) -> Result<Self, Self::Error> {
        let date_range = match params.fecha.as_deref() {
            Some(token) => token.parse()?,
            None => DateRange::All,
        };
        let priority = match active(params.prioridad.as_deref()) {
            Some(value) => Some(Priority::parse(value).ok_or_else(|| FilterError::Priority(value.to_string()))?),
            None => None,
        };
        Ok(Self {
            date_range,
            priority,
            problem_type: active(params.tipo.as_deref()).map(str::to_string),
            search: params.q.clone().unwrap_or_default(),
        })
    }
}

fn active(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty() && *v != ALL_SENTINEL)
}

impl ReportFilter {
    pub fn matches<Tz: TimeZone>(&self, report: &Report, reference: &DateTime<Tz>) -> bool {
        self.date_range.contains(&report.timestamp, reference)
            && self.priority.map_or(true, |p| report.prioridad == p)
            && self
                .problem_type
                .as_deref()
                .map_or(true, |t| report.tipo_problema == t)
            && matches_search(report, &self.search)
    }

    /// Keeps the matching reports in their input order.
    pub fn apply<Tz: TimeZone>(&self, reports: &[Report], reference: &DateTime<Tz>) -> Vec<Report> {
        reports
            .iter()
            .filter(|r| self.matches(r, reference))
            .cloned()
            .collect()
    }
}

/// Case-insensitive substring search over the text columns a user sees in the table.
pub fn matches_search(report: &Report, search: &str) -> bool {
    if search.is_empty() {
        return true;
    }
    let needle = search.to_lowercase();
    let departments = report.departamento.join(", ");
    [
        report.id.as_str(),
        departments.as_str(),
        report.descripcion.as_str(),
        report.tipo_problema.as_str(),
        report.quien_reporta.as_str(),
        report.asignado_a.as_str(),
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(&needle))
}
