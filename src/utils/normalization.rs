use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::models::{split_list, DepartmentField, Priority, Report, Status};

/// Loosely-typed report as read from the store, an HTTP body or an import file.
/// Every field is optional; `normalize` turns it into a canonical `Report`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawReport {
    pub id: Option<String>,
    pub departamento: Option<DepartmentField>,
    pub descripcion: Option<String>,
    pub tipo_problema: Option<String>,
    pub quien_reporta: Option<String>,
    pub prioridad: Option<String>,
    pub asignado_a: Option<String>,
    pub status: Option<String>,
    pub timestamp: Option<String>,
    pub imagenes: Option<Vec<String>>,
    pub email: Option<String>,
    pub telefono: Option<String>,
}

impl RawReport {
    /// Reads the known fields off a JSON object. Fields of an unexpected type are ignored.
    pub fn from_json(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        let text = |key: &str| obj.get(key).and_then(scalar_text);

        let id = non_empty(text("id").as_deref()).or_else(|| obj.get("_id").and_then(object_id));

        let departamento = match obj.get("departamento") {
            Some(Value::Array(items)) => Some(DepartmentField::List(
                items.iter().filter_map(scalar_text).collect(),
            )),
            Some(Value::String(joined)) => Some(DepartmentField::Joined(joined.clone())),
            _ => None,
        };

        let imagenes = match obj.get("imagenes") {
            Some(Value::Array(items)) => Some(items.iter().filter_map(scalar_text).collect()),
            Some(Value::String(joined)) => Some(split_list(joined)),
            _ => None,
        };

        Self {
            id,
            departamento,
            descripcion: text("descripcion"),
            tipo_problema: text("tipoProblema"),
            quien_reporta: text("quienReporta"),
            prioridad: text("prioridad"),
            asignado_a: text("asignadoA"),
            status: text("status"),
            timestamp: text("timestamp"),
            imagenes,
            email: text("email"),
            telefono: text("telefono"),
        }
    }

    /// Reads a CSV record keyed by header name. List columns are comma-joined text.
    pub fn from_record(record: &HashMap<String, String>) -> Self {
        let text = |key: &str| record.get(key).map(|v| v.to_string());
        Self {
            id: text("id"),
            departamento: text("departamento").map(DepartmentField::Joined),
            descripcion: text("descripcion"),
            tipo_problema: text("tipoProblema"),
            quien_reporta: text("quienReporta"),
            prioridad: text("prioridad"),
            asignado_a: text("asignadoA"),
            status: text("status"),
            timestamp: text("timestamp"),
            imagenes: text("imagenes").map(|joined| split_list(&joined)),
            email: text("email"),
            telefono: text("telefono"),
        }
    }

    pub fn departments(&self) -> Vec<String> {
        self.departamento
            .clone()
            .map(DepartmentField::into_list)
            .unwrap_or_default()
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// Document stores hand back `_id` either as a plain string or as {"$oid": "..."}.
fn object_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("$oid").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Returns the trimmed value when it is non-empty.
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Parses RFC 3339 first, then the common naive layouts (read as UTC).
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Some(ts.with_timezone(&Utc));
    }
    for layout in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, layout) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Builds the canonical report. Returns `None` when no identifier can be resolved;
/// every other gap is filled with a default.
pub fn normalize(raw: RawReport, now: DateTime<Utc>, roster: &[String]) -> Option<Report> {
    let id = non_empty(raw.id.as_deref())?;
    let departamento = raw.departments();

    let prioridad = raw
        .prioridad
        .as_deref()
        .and_then(Priority::parse)
        .unwrap_or_default();
    let status = raw
        .status
        .as_deref()
        .and_then(Status::parse)
        .unwrap_or_default();
    let asignado_a = non_empty(raw.asignado_a.as_deref())
        .or_else(|| roster.first().cloned())
        .unwrap_or_default();
    let timestamp = raw
        .timestamp
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or(now);

    Some(Report {
        id,
        departamento,
        descripcion: raw.descripcion.unwrap_or_default(),
        tipo_problema: raw.tipo_problema.unwrap_or_default(),
        quien_reporta: raw.quien_reporta.unwrap_or_default(),
        prioridad,
        asignado_a,
        status,
        timestamp,
        imagenes: raw.imagenes.unwrap_or_default(),
        email: non_empty(raw.email.as_deref()),
        telefono: non_empty(raw.telefono.as_deref()),
    })
}

/// Normalizes a JSON array of stored records, dropping the ones without an id.
pub fn normalize_all(records: &[Value], now: DateTime<Utc>, roster: &[String]) -> Vec<Report> {
    records
        .iter()
        .filter_map(|value| normalize(RawReport::from_json(value), now, roster))
        .collect()
}
