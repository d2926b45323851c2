use chrono::NaiveDateTime;
use serde_json::{json, Value};
use sqlx::types::Json;
use sqlx::{MySql, Pool, QueryBuilder, Row};

use crate::models::{Report, ReportPatch};

const SELECT_COLUMNS: &str = "id, departamento, descripcion, tipo_problema, quien_reporta, \
     prioridad, asignado_a, status, ts, imagenes, email, telefono";

/// Every stored row as a loose JSON document, newest first. Callers normalize.
pub async fn list_reports(pool: &Pool<MySql>) -> Result<Vec<Value>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM reports ORDER BY ts DESC, seq DESC",
        SELECT_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    let mut documents = Vec::with_capacity(rows.len());
    for row in rows {
        let ts: Option<NaiveDateTime> = row.try_get("ts")?;
        let departamento: Option<Value> = row.try_get("departamento")?;
        let imagenes: Option<Value> = row.try_get("imagenes")?;
        documents.push(json!({
            "id": row.try_get::<String, _>("id")?,
            "departamento": departamento,
            "descripcion": row.try_get::<String, _>("descripcion")?,
            "tipoProblema": row.try_get::<String, _>("tipo_problema")?,
            "quienReporta": row.try_get::<String, _>("quien_reporta")?,
            "prioridad": row.try_get::<String, _>("prioridad")?,
            "asignadoA": row.try_get::<String, _>("asignado_a")?,
            "status": row.try_get::<String, _>("status")?,
            "timestamp": ts.map(|t| t.and_utc().to_rfc3339()),
            "imagenes": imagenes,
            "email": row.try_get::<Option<String>, _>("email")?,
            "telefono": row.try_get::<Option<String>, _>("telefono")?,
        }));
    }
    Ok(documents)
}

pub async fn report_exists(pool: &Pool<MySql>, id: &str) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT 1 FROM reports WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

pub async fn insert_report(pool: &Pool<MySql>, report: &Report) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO reports (id, departamento, descripcion, tipo_problema, quien_reporta, \
         prioridad, asignado_a, status, ts, imagenes, email, telefono) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&report.id)
    .bind(Json(&report.departamento))
    .bind(&report.descripcion)
    .bind(&report.tipo_problema)
    .bind(&report.quien_reporta)
    .bind(report.prioridad.as_str())
    .bind(&report.asignado_a)
    .bind(report.status.as_str())
    .bind(report.timestamp.naive_utc())
    .bind(Json(&report.imagenes))
    .bind(report.email.as_deref())
    .bind(report.telefono.as_deref())
    .execute(pool)
    .await?;
    Ok(())
}

/// Writes the patched columns. Returns without touching the database for an empty patch.
pub async fn update_report(pool: &Pool<MySql>, id: &str, patch: &ReportPatch) -> Result<(), sqlx::Error> {
    if patch.is_empty() {
        return Ok(());
    }

    let mut qb: QueryBuilder<MySql> = QueryBuilder::new("UPDATE reports SET ");
    {
        let mut set = qb.separated(", ");
        if let Some(status) = patch.status {
            set.push("status = ");
            set.push_bind_unseparated(status.as_str());
        }
        if let Some(prioridad) = patch.prioridad {
            set.push("prioridad = ");
            set.push_bind_unseparated(prioridad.as_str());
        }
        if let Some(departamento) = &patch.departamento {
            set.push("departamento = ");
            set.push_bind_unseparated(Json(departamento.clone().into_list()));
        }
        if let Some(descripcion) = &patch.descripcion {
            set.push("descripcion = ");
            set.push_bind_unseparated(descripcion.clone());
        }
        if let Some(tipo) = &patch.tipo_problema {
            set.push("tipo_problema = ");
            set.push_bind_unseparated(tipo.clone());
        }
        if let Some(quien) = &patch.quien_reporta {
            set.push("quien_reporta = ");
            set.push_bind_unseparated(quien.clone());
        }
    }
    qb.push(" WHERE id = ");
    qb.push_bind(id.to_string());

    qb.build().execute(pool).await?;
    Ok(())
}

/// Returns whether a row was removed.
pub async fn delete_report(pool: &Pool<MySql>, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM reports WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
