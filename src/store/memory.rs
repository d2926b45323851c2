use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::models::{Report, ReportPatch, StoredUser};
use crate::store::{ReportStore, StoreError, UserStore};

/// Process-local store. Reports are kept newest first.
#[derive(Clone, Default)]
pub struct MemoryStore {
    reports: Arc<RwLock<Vec<Report>>>,
    users: Arc<RwLock<HashMap<String, StoredUser>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reports(reports: Vec<Report>) -> Self {
        let mut reports = reports;
        reports.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Self {
            reports: Arc::new(RwLock::new(reports)),
            users: Arc::default(),
        }
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Report>, StoreError> {
        let reports = self.reports.read().map_err(|_| StoreError::Poisoned)?;
        Ok(reports.clone())
    }

    async fn insert(&self, report: &Report) -> Result<(), StoreError> {
        let mut reports = self.reports.write().map_err(|_| StoreError::Poisoned)?;
        if reports.iter().any(|r| r.id == report.id) {
            return Err(StoreError::Duplicate(report.id.clone()));
        }
        let at = reports
            .iter()
            .position(|r| r.timestamp <= report.timestamp)
            .unwrap_or(reports.len());
        reports.insert(at, report.clone());
        Ok(())
    }

    async fn update(&self, id: &str, patch: &ReportPatch) -> Result<(), StoreError> {
        let mut reports = self.reports.write().map_err(|_| StoreError::Poisoned)?;
        let report = reports
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        patch.apply_to(report);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut reports = self.reports.write().map_err(|_| StoreError::Poisoned)?;
        let before = reports.len();
        reports.retain(|r| r.id != id);
        if reports.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<StoredUser>, StoreError> {
        let users = self.users.read().map_err(|_| StoreError::Poisoned)?;
        Ok(users.get(email).cloned())
    }

    async fn insert_user(&self, user: &StoredUser) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(|_| StoreError::Poisoned)?;
        if users.contains_key(&user.user.email) {
            return Err(StoreError::Duplicate(user.user.email.clone()));
        }
        users.insert(user.user.email.clone(), user.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, Status, User};

    fn report(id: &str, ts: &str) -> Report {
        Report {
            id: id.to_string(),
            departamento: vec!["DIF".to_string()],
            descripcion: "Pantalla azul al iniciar".to_string(),
            tipo_problema: "Hardware - Computadoras".to_string(),
            quien_reporta: "Ana".to_string(),
            prioridad: Priority::Media,
            asignado_a: "Ayudante Paco".to_string(),
            status: Status::Pendiente,
            timestamp: ts.parse().unwrap(),
            imagenes: vec![],
            email: None,
            telefono: None,
        }
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let store = MemoryStore::new();
        store.insert(&report("R-1", "2025-03-01T10:00:00Z")).await.unwrap();
        store.insert(&report("R-3", "2025-03-03T10:00:00Z")).await.unwrap();
        store.insert(&report("R-2", "2025-03-02T10:00:00Z")).await.unwrap();
        let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["R-3", "R-2", "R-1"]);
    }

    #[tokio::test]
    async fn test_duplicate_and_missing_ids() {
        let store = MemoryStore::with_reports(vec![report("R-1", "2025-03-01T10:00:00Z")]);
        assert!(matches!(
            store.insert(&report("R-1", "2025-03-05T10:00:00Z")).await,
            Err(StoreError::Duplicate(_))
        ));
        assert!(matches!(
            store.update("R-9", &ReportPatch::default()).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(store.delete("R-9").await, Err(StoreError::NotFound(_))));
        store.delete("R-1").await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_keeps_timestamp() {
        let store = MemoryStore::with_reports(vec![report("R-1", "2025-03-01T10:00:00Z")]);
        let patch = ReportPatch {
            status: Some(Status::Resuelto),
            ..Default::default()
        };
        store.update("R-1", &patch).await.unwrap();
        let stored = &store.list().await.unwrap()[0];
        assert_eq!(stored.status, Status::Resuelto);
        assert_eq!(stored.timestamp, "2025-03-01T10:00:00Z".parse::<chrono::DateTime<chrono::Utc>>().unwrap());
    }

    #[tokio::test]
    async fn test_users_are_unique_by_email() {
        let store = MemoryStore::new();
        let user = StoredUser {
            user: User {
                nombre: "Ana".to_string(),
                email: "ana@municipio.gob.mx".to_string(),
                rol: "admin".to_string(),
            },
            password_hash: "hash".to_string(),
        };
        store.insert_user(&user).await.unwrap();
        assert!(matches!(store.insert_user(&user).await, Err(StoreError::Duplicate(_))));
        let found = store.find_by_email("ana@municipio.gob.mx").await.unwrap().unwrap();
        assert_eq!(found.user.nombre, "Ana");
        assert!(store.find_by_email("otro@municipio.gob.mx").await.unwrap().is_none());
    }
}
