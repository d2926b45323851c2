//! Checks run before any request leaves the client.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::models::{NewReport, RegisterRequest};

pub const MIN_DESCRIPTION_CHARS: usize = 10;
pub const MIN_PASSWORD_CHARS: usize = 8;

/// Department entry that asks the user to type the real name.
pub const OTHER_DEPARTMENT: &str = "Otro";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("El campo {0} es obligatorio")]
    MissingField(&'static str),
    #[error("La descripción debe tener al menos 10 caracteres")]
    DescriptionTooShort,
    #[error("Selecciona al menos un departamento.")]
    NoDepartment,
    #[error("Debes especificar el departamento si seleccionas \"Otro\".")]
    OtherDepartmentUnspecified,
    #[error("Correo electrónico inválido")]
    InvalidEmail,
    #[error("Debe ser un número de 10 dígitos")]
    InvalidPhone,
    #[error("La contraseña debe tener al menos 8 caracteres")]
    PasswordTooShort,
}

fn report_email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\S+@\S+$").unwrap())
}

fn account_email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\S+@\S+\.\S+$").unwrap())
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]{10}$").unwrap())
}

/// Replaces the "Otro" pick with the typed department name.
pub fn resolve_departments(selected: &[String], other: Option<&str>) -> Result<Vec<String>, ValidationError> {
    if selected.is_empty() {
        return Err(ValidationError::NoDepartment);
    }
    let mut departments: Vec<String> = selected
        .iter()
        .filter(|d| d.as_str() != OTHER_DEPARTMENT)
        .cloned()
        .collect();
    if departments.len() < selected.len() {
        let typed = other.map(str::trim).unwrap_or_default();
        if typed.is_empty() {
            return Err(ValidationError::OtherDepartmentUnspecified);
        }
        departments.push(typed.to_string());
    }
    Ok(departments)
}

pub fn validate_new_report(report: &NewReport) -> Result<(), ValidationError> {
    if report.quien_reporta.trim().is_empty() {
        return Err(ValidationError::MissingField("quienReporta"));
    }
    if report.tipo_problema.trim().is_empty() {
        return Err(ValidationError::MissingField("tipoProblema"));
    }
    if report.descripcion.trim().is_empty() {
        return Err(ValidationError::MissingField("descripcion"));
    }
    if report.descripcion.trim().chars().count() < MIN_DESCRIPTION_CHARS {
        return Err(ValidationError::DescriptionTooShort);
    }
    if !report.departamento.iter().any(|d| !d.trim().is_empty()) {
        return Err(ValidationError::NoDepartment);
    }
    if let Some(email) = report.email.as_deref() {
        if !report_email_regex().is_match(email.trim()) {
            return Err(ValidationError::InvalidEmail);
        }
    }
    if let Some(phone) = report.telefono.as_deref() {
        if !phone_regex().is_match(phone.trim()) {
            return Err(ValidationError::InvalidPhone);
        }
    }
    Ok(())
}

pub fn validate_registration(request: &RegisterRequest) -> Result<(), ValidationError> {
    if request.nombre.trim().is_empty() {
        return Err(ValidationError::MissingField("nombre"));
    }
    if !account_email_regex().is_match(request.email.trim()) {
        return Err(ValidationError::InvalidEmail);
    }
    if request.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ValidationError::PasswordTooShort);
    }
    if request.rol.trim().is_empty() {
        return Err(ValidationError::MissingField("rol"));
    }
    Ok(())
}
