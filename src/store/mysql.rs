use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySql, Pool};
use tracing::warn;

use crate::database::{self, reports, users};
use crate::models::{Report, ReportPatch, StoredUser};
use crate::store::{ReportStore, StoreError, UserStore};
use crate::utils::normalization::normalize_all;

#[derive(Clone)]
pub struct MySqlStore {
    pool: Pool<MySql>,
    roster: Arc<Vec<String>>,
}

impl MySqlStore {
    pub fn new(pool: Pool<MySql>, roster: Arc<Vec<String>>) -> Self {
        Self { pool, roster }
    }
}

fn duplicate_or(err: sqlx::Error, key: &str) -> StoreError {
    if database::is_unique_violation(&err) {
        StoreError::Duplicate(key.to_string())
    } else {
        StoreError::Database(err)
    }
}

#[async_trait]
impl ReportStore for MySqlStore {
    async fn list(&self) -> Result<Vec<Report>, StoreError> {
        let documents = reports::list_reports(&self.pool).await?;
        let total = documents.len();
        let normalized = normalize_all(&documents, Utc::now(), &self.roster);
        if normalized.len() < total {
            warn!("Dropped {} stored reports without an id", total - normalized.len());
        }
        Ok(normalized)
    }

    async fn insert(&self, report: &Report) -> Result<(), StoreError> {
        reports::insert_report(&self.pool, report)
            .await
            .map_err(|e| duplicate_or(e, &report.id))
    }

    async fn update(&self, id: &str, patch: &ReportPatch) -> Result<(), StoreError> {
        // MySQL reports zero affected rows when nothing changed, so check existence first.
        if !reports::report_exists(&self.pool, id).await? {
            return Err(StoreError::NotFound(id.to_string()));
        }
        reports::update_report(&self.pool, id, patch).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        if reports::delete_report(&self.pool, id).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound(id.to_string()))
        }
    }
}

#[async_trait]
impl UserStore for MySqlStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<StoredUser>, StoreError> {
        Ok(users::find_user_by_email(&self.pool, email).await?)
    }

    async fn insert_user(&self, user: &StoredUser) -> Result<(), StoreError> {
        users::insert_user(&self.pool, user)
            .await
            .map_err(|e| duplicate_or(e, &user.user.email))
    }
}
