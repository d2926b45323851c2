//! Dashboard side of the system: an HTTP client of the report service plus the
//! local state the dashboard keeps between refreshes.
//!
//! `Dashboard` owns the last fetched report list. Every mutation goes to the
//! server and is followed by a full reload, whether it succeeded or not, so the
//! local copy never drifts from the store for longer than one round trip.

pub mod api;
pub mod drafts;
pub mod poller;
pub mod session;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone};
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{info, warn};

use crate::models::{NewReport, Report, ReportPatch};
use crate::reports::transfer::{self, ExportError, FileFormat, ImportError, ImportSummary, ReportSink};
use crate::reports::{DashboardStats, ReportFilter};

pub use api::{ApiClient, ClientError};
pub use drafts::{DraftBook, FieldEdit};
pub use poller::Poller;
pub use session::{Session, SessionError, SessionStore};

/// Report operations the dashboard needs from the server.
#[async_trait]
pub trait ReportApi: Send + Sync {
    async fn fetch_reports(&self) -> Result<Vec<Report>, ClientError>;
    /// Returns the id the server assigned.
    async fn submit_report(&self, report: &NewReport) -> Result<String, ClientError>;
    async fn patch_report(&self, id: &str, patch: &ReportPatch) -> Result<(), ClientError>;
    async fn remove_report(&self, id: &str) -> Result<(), ClientError>;
}

/// Import destination that creates each record through the API.
pub struct ApiSink<'a> {
    api: &'a dyn ReportApi,
}

impl<'a> ApiSink<'a> {
    pub fn new(api: &'a dyn ReportApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ReportSink for ApiSink<'_> {
    type Error = ClientError;

    async fn submit(&self, report: &NewReport) -> Result<String, Self::Error> {
        self.api.submit_report(report).await
    }
}

pub struct Dashboard {
    api: Arc<dyn ReportApi>,
    reports: RwLock<Vec<Report>>,
    drafts: Mutex<DraftBook>,
    generation: watch::Sender<u64>,
}

impl Dashboard {
    pub fn new(api: Arc<dyn ReportApi>) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            api,
            reports: RwLock::new(Vec::new()),
            drafts: Mutex::new(DraftBook::new()),
            generation,
        }
    }

    /// Replaces the local list with the server's. Returns the number of reports.
    pub async fn reload(&self) -> Result<usize, ClientError> {
        let fresh = self.api.fetch_reports().await?;
        let count = fresh.len();
        *self.reports.write().await = fresh;
        self.generation.send_modify(|g| *g += 1);
        Ok(count)
    }

    /// Ticks once per completed reload.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    pub async fn reports(&self) -> Vec<Report> {
        self.reports.read().await.clone()
    }

    /// The filtered table, with unsaved row edits shown on top.
    pub async fn view<Tz: TimeZone>(&self, filter: &ReportFilter, reference: &DateTime<Tz>) -> Vec<Report> {
        let reports = self.reports.read().await;
        let shown = self.drafts.lock().await.overlay(&reports);
        filter.apply(&shown, reference)
    }

    pub async fn stats<Tz: TimeZone>(&self, filter: &ReportFilter, reference: &DateTime<Tz>) -> DashboardStats {
        let reports = self.reports.read().await;
        let filtered = filter.apply(&reports, reference);
        DashboardStats::compute(&filtered, &filter.date_range, reference)
    }

    pub async fn export<Tz: TimeZone>(
        &self,
        filter: &ReportFilter,
        reference: &DateTime<Tz>,
        format: FileFormat,
    ) -> Result<Vec<u8>, ExportError> {
        let reports = self.reports.read().await;
        transfer::export(&filter.apply(&reports, reference), format)
    }

    pub async fn create(&self, report: &NewReport) -> Result<String, ClientError> {
        let result = self.api.submit_report(report).await;
        self.reconcile().await;
        result
    }

    pub async fn update(&self, id: &str, patch: &ReportPatch) -> Result<(), ClientError> {
        let result = self.api.patch_report(id, patch).await;
        self.reconcile().await;
        result
    }

    pub async fn delete(&self, id: &str) -> Result<(), ClientError> {
        let result = self.api.remove_report(id).await;
        self.reconcile().await;
        result
    }

    pub async fn edit(&self, id: &str, edit: FieldEdit) {
        self.drafts.lock().await.set(id, edit);
    }

    /// Sends the row's pending edits. Returns `false` when there was nothing to send.
    pub async fn commit(&self, id: &str) -> Result<bool, ClientError> {
        let Some(patch) = self.drafts.lock().await.take(id) else {
            return Ok(false);
        };
        self.update(id, &patch).await?;
        Ok(true)
    }

    pub async fn discard(&self, id: &str) -> bool {
        self.drafts.lock().await.discard(id)
    }

    /// Parses the file and submits its records one by one. A malformed file aborts
    /// before anything is sent.
    pub async fn import(&self, bytes: &[u8], format: FileFormat) -> Result<ImportSummary, ImportError> {
        let records = transfer::parse_import(bytes, format)?;
        let sink = ApiSink::new(self.api.as_ref());
        let summary = transfer::run_import(&sink, records, format).await;
        self.reconcile().await;
        Ok(summary)
    }

    async fn reconcile(&self) {
        match self.reload().await {
            Ok(count) => info!("Reloaded {} reports", count),
            Err(e) => warn!("Reload after mutation failed: {}", e),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{new_report, FakeApi};
    use super::*;
    use crate::models::Status;
    use chrono::Utc;

    #[tokio::test]
    async fn test_mutations_trigger_reload() {
        let api = Arc::new(FakeApi::default());
        let dashboard = Dashboard::new(api.clone());
        let mut ticks = dashboard.subscribe();

        let id = dashboard.create(&new_report("Monitor parpadea")).await.unwrap();
        assert_eq!(api.fetch_count(), 1);
        assert!(ticks.has_changed().unwrap());
        ticks.borrow_and_update();
        assert_eq!(dashboard.reports().await.len(), 1);

        dashboard.edit(&id, FieldEdit::Status(Status::Resuelto)).await;
        let shown = dashboard.view(&ReportFilter::default(), &Utc::now()).await;
        assert_eq!(shown[0].status, Status::Resuelto);
        assert_eq!(dashboard.reports().await[0].status, Status::Pendiente);

        assert!(dashboard.commit(&id).await.unwrap());
        assert!(!dashboard.commit(&id).await.unwrap());
        assert_eq!(dashboard.reports().await[0].status, Status::Resuelto);
        assert_eq!(api.fetch_count(), 2);

        dashboard.delete(&id).await.unwrap();
        assert!(dashboard.reports().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_mutation_still_reloads() {
        let api = Arc::new(FakeApi {
            fail_mutations: true,
            ..Default::default()
        });
        let dashboard = Dashboard::new(api.clone());
        assert!(dashboard.delete("R-1").await.is_err());
        assert_eq!(api.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_import_submits_each_record_then_reloads() {
        let api = Arc::new(FakeApi::default());
        let dashboard = Dashboard::new(api.clone());
        let json = br#"[
            {"descripcion": "Impresora atascada", "departamento": "DIF, CABILDO"},
            {"descripcion": ""},
            42
        ]"#;
        let summary = dashboard.import(json, FileFormat::Json).await.unwrap();
        assert_eq!((summary.succeeded, summary.failed), (1, 2));
        assert_eq!(api.fetch_count(), 1);
        let reports = dashboard.reports().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].departamento, vec!["DIF", "CABILDO"]);

        assert!(matches!(
            dashboard.import(b"{}", FileFormat::Json).await,
            Err(ImportError::NotAnArray)
        ));
        assert_eq!(api.fetch_count(), 1);
    }
}
