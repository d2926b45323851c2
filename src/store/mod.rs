//! Persistence seams for reports and users.
//!
//! Handlers only see the two traits below. `MySqlStore` keeps documents as rows
//! with JSON columns; `MemoryStore` backs development runs and tests.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Report, ReportPatch, StoredUser};

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("record already exists: {0}")]
    Duplicate(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Every report, newest first.
    async fn list(&self) -> Result<Vec<Report>, StoreError>;

    /// Fails with `Duplicate` when the id is taken.
    async fn insert(&self, report: &Report) -> Result<(), StoreError>;

    /// Overwrites the fields named by `patch`. Fails with `NotFound` when no report has `id`.
    async fn update(&self, id: &str, patch: &ReportPatch) -> Result<(), StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<StoredUser>, StoreError>;

    /// Fails with `Duplicate` when the email is already registered.
    async fn insert_user(&self, user: &StoredUser) -> Result<(), StoreError>;
}
