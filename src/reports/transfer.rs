//! CSV / JSON export of a report set and the record-by-record bulk import.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, SecondsFormat};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{NewReport, Priority, Report, Status};
use crate::utils::normalization::{non_empty, parse_timestamp, RawReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Json,
}

impl FileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FileFormat::Csv => "text/csv; charset=utf-8",
            FileFormat::Json => "application/json",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileFormat::Csv => "CSV",
            FileFormat::Json => "JSON",
        }
    }

    /// Picks the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, ImportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        ext.parse()
    }
}

impl FromStr for FileFormat {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            "json" => Ok(FileFormat::Json),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Errors that abort a whole import batch before anything is submitted.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unsupported file format '{0}' (expected csv or json)")]
    UnsupportedFormat(String),
    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("the JSON root must be an array of reports")]
    NotAnArray,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Flat CSV projection of a report; list columns are joined with ", ".
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CsvRow<'a> {
    id: &'a str,
    departamento: String,
    descripcion: &'a str,
    tipo_problema: &'a str,
    quien_reporta: &'a str,
    prioridad: &'static str,
    asignado_a: &'a str,
    status: &'static str,
    timestamp: String,
    imagenes: String,
    email: &'a str,
    telefono: &'a str,
}

impl<'a> From<&'a Report> for CsvRow<'a> {
    fn from(report: &'a Report) -> Self {
        Self {
            id: &report.id,
            departamento: report.departamento.join(", "),
            descripcion: &report.descripcion,
            tipo_problema: &report.tipo_problema,
            quien_reporta: &report.quien_reporta,
            prioridad: report.prioridad.as_str(),
            asignado_a: &report.asignado_a,
            status: report.status.as_str(),
            timestamp: report.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            imagenes: report.imagenes.join(", "),
            email: report.email.as_deref().unwrap_or_default(),
            telefono: report.telefono.as_deref().unwrap_or_default(),
        }
    }
}

pub fn export_csv(reports: &[Report]) -> Result<Vec<u8>, ExportError> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_writer(Vec::new());
    for report in reports {
        wtr.serialize(CsvRow::from(report))?;
    }
    wtr.into_inner()
        .map_err(|e| ExportError::Csv(csv::Error::from(e.into_error())))
}

pub fn export_json(reports: &[Report]) -> Result<Vec<u8>, ExportError> {
    Ok(serde_json::to_vec_pretty(reports)?)
}

pub fn export(reports: &[Report], format: FileFormat) -> Result<Vec<u8>, ExportError> {
    match format {
        FileFormat::Csv => export_csv(reports),
        FileFormat::Json => export_json(reports),
    }
}

/// Download name offered for an export made on `date`.
pub fn export_filename(date: NaiveDate, format: FileFormat) -> String {
    format!("reportes_municipales_{}.{}", date.format("%Y-%m-%d"), format.extension())
}

/// One parsed import entry, kept in file order.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportRecord {
    Ready(NewReport),
    /// Entry that cannot be submitted; counted as a failure.
    Rejected(String),
}

/// Turns a loose record into a create request. The server assigns a fresh id and
/// the status always restarts at Pendiente.
fn to_new_report(raw: RawReport, keep_timestamp: bool) -> NewReport {
    let departamento = raw.departments();
    NewReport {
        id: None,
        departamento,
        descripcion: raw.descripcion.unwrap_or_default(),
        tipo_problema: raw.tipo_problema.unwrap_or_default(),
        quien_reporta: raw.quien_reporta.unwrap_or_default(),
        prioridad: raw
            .prioridad
            .as_deref()
            .and_then(Priority::parse)
            .unwrap_or_default(),
        asignado_a: non_empty(raw.asignado_a.as_deref()),
        status: Status::Pendiente,
        timestamp: if keep_timestamp {
            raw.timestamp.as_deref().and_then(parse_timestamp)
        } else {
            None
        },
        imagenes: raw.imagenes.unwrap_or_default(),
        email: non_empty(raw.email.as_deref()),
        telefono: non_empty(raw.telefono.as_deref()),
    }
}

pub fn parse_csv_import(bytes: &[u8]) -> Result<Vec<ImportRecord>, ImportError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(bytes);
    let headers = rdr.headers()?.clone();

    let mut records = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                records.push(ImportRecord::Rejected(format!("row {}: {}", line + 1, e)));
                continue;
            }
        };
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let fields: HashMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        records.push(ImportRecord::Ready(to_new_report(
            RawReport::from_record(&fields),
            false,
        )));
    }
    Ok(records)
}

pub fn parse_json_import(bytes: &[u8]) -> Result<Vec<ImportRecord>, ImportError> {
    let root: Value = serde_json::from_slice(bytes)?;
    let Value::Array(items) = root else {
        return Err(ImportError::NotAnArray);
    };
    Ok(items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            if item.is_object() {
                ImportRecord::Ready(to_new_report(RawReport::from_json(item), true))
            } else {
                ImportRecord::Rejected(format!("element {} is not an object", idx))
            }
        })
        .collect())
}

pub fn parse_import(bytes: &[u8], format: FileFormat) -> Result<Vec<ImportRecord>, ImportError> {
    match format {
        FileFormat::Csv => parse_csv_import(bytes),
        FileFormat::Json => parse_json_import(bytes),
    }
}

/// Destination of imported records, usually the HTTP client.
#[async_trait]
pub trait ReportSink: Send + Sync {
    type Error: fmt::Display + Send;

    /// Creates one report and returns its id.
    async fn submit(&self, report: &NewReport) -> Result<String, Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub format: FileFormat,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl ImportSummary {
    pub fn new(format: FileFormat) -> Self {
        Self {
            format,
            succeeded: 0,
            failed: 0,
            errors: Vec::new(),
        }
    }

    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Message shown to the user once the batch ends.
    pub fn feedback(&self) -> String {
        format!(
            "Importación {} terminada. Éxitos: {}, Fallos: {}.",
            self.format.label(),
            self.succeeded,
            self.failed
        )
    }
}

/// Submits every record one after the other, in file order. A failing record is
/// tallied and the batch carries on.
pub async fn run_import<S>(sink: &S, records: Vec<ImportRecord>, format: FileFormat) -> ImportSummary
where
    S: ReportSink + ?Sized,
{
    let mut summary = ImportSummary::new(format);
    let total = records.len();
    for (idx, record) in records.into_iter().enumerate() {
        match record {
            ImportRecord::Ready(report) => match sink.submit(&report).await {
                Ok(id) => {
                    info!("import {}/{}: created report {}", idx + 1, total, id);
                    summary.succeeded += 1;
                }
                Err(e) => {
                    warn!("import {}/{}: submission failed: {}", idx + 1, total, e);
                    summary.failed += 1;
                    summary.errors.push(format!("record {}: {}", idx + 1, e));
                }
            },
            ImportRecord::Rejected(reason) => {
                warn!("import {}/{}: skipped: {}", idx + 1, total, reason);
                summary.failed += 1;
                summary.errors.push(reason);
            }
        }
    }
    info!("{}", summary.feedback());
    summary
}
