use sqlx::{MySql, Pool, Row};

use crate::models::{StoredUser, User};

pub async fn find_user_by_email(pool: &Pool<MySql>, email: &str) -> Result<Option<StoredUser>, sqlx::Error> {
    let row = sqlx::query("SELECT nombre, email, rol, password_hash FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    if let Some(row) = row {
        Ok(Some(StoredUser {
            user: User {
                nombre: row.try_get("nombre")?,
                email: row.try_get("email")?,
                rol: row.try_get("rol")?,
            },
            password_hash: row.try_get("password_hash")?,
        }))
    } else {
        Ok(None)
    }
}

pub async fn insert_user(pool: &Pool<MySql>, user: &StoredUser) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO users (email, nombre, rol, password_hash) VALUES (?, ?, ?, ?)")
        .bind(&user.user.email)
        .bind(&user.user.nombre)
        .bind(&user.user.rol)
        .bind(&user.password_hash)
        .execute(pool)
        .await?;
    Ok(())
}
