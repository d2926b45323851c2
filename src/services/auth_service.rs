use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use thiserror::Error;
use tracing::info;

use crate::models::{LoginRequest, RegisterRequest, StoredUser, User};
use crate::store::{StoreError, UserStore};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Faltan campos requeridos")]
    MissingFields,
    #[error("El usuario ya existe")]
    AlreadyExists,
    #[error("Usuario no encontrado")]
    UnknownUser,
    #[error("Contraseña incorrecta")]
    WrongPassword,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(_) => AuthError::AlreadyExists,
            other => AuthError::Store(other),
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// Argon2 hashing runs on the blocking pool.
async fn hash_off_runtime(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Hash(e.to_string()))?
}

async fn verify_off_runtime(password: String, hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// Registers a user. Every field is required; the password is stored only as a hash.
pub async fn register(users: &dyn UserStore, request: &RegisterRequest) -> Result<User, AuthError> {
    let nombre = request.nombre.trim();
    let email = request.email.trim();
    let rol = request.rol.trim();
    if nombre.is_empty() || email.is_empty() || request.password.is_empty() || rol.is_empty() {
        return Err(AuthError::MissingFields);
    }

    let stored = StoredUser {
        user: User {
            nombre: nombre.to_string(),
            email: email.to_string(),
            rol: rol.to_string(),
        },
        password_hash: hash_off_runtime(request.password.clone()).await?,
    };
    users.insert_user(&stored).await?;
    info!("Registered user {} with role {}", stored.user.email, stored.user.rol);
    Ok(stored.user)
}

pub async fn authenticate(users: &dyn UserStore, request: &LoginRequest) -> Result<User, AuthError> {
    let email = request.email.trim();
    if email.is_empty() || request.password.is_empty() {
        return Err(AuthError::MissingFields);
    }
    let stored = users
        .find_by_email(email)
        .await?
        .ok_or(AuthError::UnknownUser)?;
    if !verify_off_runtime(request.password.clone(), stored.password_hash.clone()).await? {
        return Err(AuthError::WrongPassword);
    }
    Ok(stored.user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn registration() -> RegisterRequest {
        RegisterRequest {
            nombre: "Ana Torres".to_string(),
            email: "ana@municipio.gob.mx".to_string(),
            password: "contraseña-segura".to_string(),
            rol: "admin".to_string(),
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("secreto123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secreto123", &hash));
        assert!(!verify_password("otro", &hash));
        assert!(!verify_password("secreto123", "not-a-hash"));
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();
        let user = register(&store, &registration()).await.unwrap();
        assert_eq!(user.rol, "admin");

        let login = LoginRequest {
            email: "ana@municipio.gob.mx".to_string(),
            password: "contraseña-segura".to_string(),
        };
        assert_eq!(authenticate(&store, &login).await.unwrap(), user);
    }

    #[tokio::test]
    async fn test_register_errors() {
        let store = MemoryStore::new();
        register(&store, &registration()).await.unwrap();
        assert!(matches!(
            register(&store, &registration()).await,
            Err(AuthError::AlreadyExists)
        ));

        let mut incomplete = registration();
        incomplete.rol = "  ".to_string();
        assert!(matches!(
            register(&store, &incomplete).await,
            Err(AuthError::MissingFields)
        ));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_hashing_does_not_block_other_tasks() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = {
            let ticks = ticks.clone();
            tokio::spawn(async move {
                loop {
                    ticks.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                }
            })
        };

        let store = MemoryStore::new();
        register(&store, &registration()).await.unwrap();
        let login = LoginRequest {
            email: "ana@municipio.gob.mx".to_string(),
            password: "contraseña-segura".to_string(),
        };
        authenticate(&store, &login).await.unwrap();

        assert!(ticks.load(Ordering::SeqCst) > 0);
        ticker.abort();
    }

    #[tokio::test]
    async fn test_login_errors() {
        let store = MemoryStore::new();
        register(&store, &registration()).await.unwrap();

        let wrong = LoginRequest {
            email: "ana@municipio.gob.mx".to_string(),
            password: "equivocada".to_string(),
        };
        assert!(matches!(authenticate(&store, &wrong).await, Err(AuthError::WrongPassword)));

        let unknown = LoginRequest {
            email: "nadie@municipio.gob.mx".to_string(),
            password: "equivocada".to_string(),
        };
        assert!(matches!(authenticate(&store, &unknown).await, Err(AuthError::UnknownUser)));

        assert!(matches!(
            authenticate(&store, &LoginRequest::default()).await,
            Err(AuthError::MissingFields)
        ));
    }
}
