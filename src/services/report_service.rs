use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::Report;
use crate::store::{ReportStore, StoreError};
use crate::utils::normalization::{non_empty, normalize, RawReport};

/// Attachments accepted on a single submission.
pub const MAX_IMAGES: usize = 10;

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("el reporte debe ser un objeto JSON")]
    NotAnObject,
    #[error("se permiten como máximo 10 imágenes")]
    TooManyImages,
    #[error("failed to store upload: {0}")]
    Upload(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A file received under the `imagenes` multipart field.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Fresh external id, `R-<millis>-<3 digits>`.
pub fn generate_report_id<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> String {
    format!("R-{}-{:03}", now.timestamp_millis(), rng.gen_range(0..1000))
}

/// Fills in whatever the server owns: id when absent, status reset to Pendiente,
/// creation time unless a parsable one was sent, and a roster assignee when absent.
pub fn build_report<R: Rng + ?Sized>(
    payload: &Value,
    now: DateTime<Utc>,
    roster: &[String],
    rng: &mut R,
) -> Result<Report, SubmissionError> {
    if !payload.is_object() {
        return Err(SubmissionError::NotAnObject);
    }
    let mut raw = RawReport::from_json(payload);

    if non_empty(raw.id.as_deref()).is_none() {
        raw.id = Some(generate_report_id(now, rng));
    }
    raw.status = None;
    if non_empty(raw.asignado_a.as_deref()).is_none() {
        raw.asignado_a = roster.choose(rng).cloned();
    }

    normalize(raw, now, roster).ok_or(SubmissionError::NotAnObject)
}

/// Disk name for an upload, `<millis>-<random>-<original name>`.
pub fn stored_file_name<R: Rng + ?Sized>(original: &str, now: DateTime<Utc>, rng: &mut R) -> String {
    let base = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("imagen");
    format!("{}-{}-{}", now.timestamp_millis(), rng.gen_range(0..1_000_000_000u32), base)
}

/// Writes the uploads to `dir` and returns their stored names in order.
pub async fn save_uploads(dir: &Path, uploads: &[Upload], now: DateTime<Utc>) -> Result<Vec<String>, SubmissionError> {
    if uploads.len() > MAX_IMAGES {
        return Err(SubmissionError::TooManyImages);
    }
    if uploads.is_empty() {
        return Ok(Vec::new());
    }
    tokio::fs::create_dir_all(dir).await?;

    let names: Vec<String> = {
        let mut rng = rand::thread_rng();
        uploads
            .iter()
            .map(|u| stored_file_name(&u.file_name, now, &mut rng))
            .collect()
    };
    for (upload, name) in uploads.iter().zip(&names) {
        let path: PathBuf = dir.join(name);
        tokio::fs::write(&path, &upload.bytes).await?;
        debug!("Stored upload {} ({} bytes)", path.display(), upload.bytes.len());
    }
    Ok(names)
}

/// Deletes files written for a submission that was not stored.
async fn remove_uploads(dir: &Path, names: &[String]) {
    for name in names {
        let path = dir.join(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!("Removed orphaned upload {}", path.display()),
            Err(e) => warn!("Failed to remove orphaned upload {}: {}", path.display(), e),
        }
    }
}

/// Creates a report from a submitted payload. When `uploads` is `Some`, the stored
/// file names replace whatever `imagenes` the payload carried.
pub async fn create_report(
    store: &dyn ReportStore,
    payload: &Value,
    uploads: Option<&[Upload]>,
    upload_dir: &Path,
    roster: &[String],
) -> Result<Report, SubmissionError> {
    let now = Utc::now();
    if uploads.map_or(false, |u| u.len() > MAX_IMAGES) {
        return Err(SubmissionError::TooManyImages);
    }
    let mut report = {
        let mut rng = rand::thread_rng();
        build_report(payload, now, roster, &mut rng)?
    };
    let stored: &[String] = match uploads {
        Some(uploads) => {
            report.imagenes = save_uploads(upload_dir, uploads, now).await?;
            report.imagenes.as_slice()
        }
        None => &[],
    };

    if let Err(e) = store.insert(&report).await {
        remove_uploads(upload_dir, stored).await;
        return Err(e.into());
    }
    info!(
        "Created report {} ({} department(s), {} image(s))",
        report.id,
        report.departamento.len(),
        report.imagenes.len()
    );
    Ok(report)
}
