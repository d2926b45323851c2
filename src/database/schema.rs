use anyhow::Result;
use sqlx::{MySql, Pool};
use tracing::info;

pub async fn initialize_schema(pool: &Pool<MySql>) -> Result<()> {
    info!("Initializing database schema...");

    // List-valued report fields live in JSON columns.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            seq BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
            id VARCHAR(128) NOT NULL UNIQUE,
            departamento JSON NOT NULL,
            descripcion TEXT NOT NULL,
            tipo_problema VARCHAR(255) NOT NULL DEFAULT '',
            quien_reporta VARCHAR(255) NOT NULL DEFAULT '',
            prioridad VARCHAR(32) NOT NULL DEFAULT 'Baja',
            asignado_a VARCHAR(255) NOT NULL DEFAULT '',
            status VARCHAR(32) NOT NULL DEFAULT 'Pendiente',
            ts DATETIME(3) NOT NULL,
            imagenes JSON NOT NULL,
            email VARCHAR(255) NULL,
            telefono VARCHAR(64) NULL,
            INDEX idx_ts (ts DESC)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            email VARCHAR(255) NOT NULL PRIMARY KEY,
            nombre VARCHAR(255) NOT NULL,
            rol VARCHAR(64) NOT NULL DEFAULT '',
            password_hash VARCHAR(255) NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(pool)
    .await?;

    info!("Database schema initialized successfully");
    Ok(())
}
