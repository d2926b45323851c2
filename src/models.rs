use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Staff members reports get assigned to when the deployment does not configure a roster.
pub const DEFAULT_ROSTER: [&str; 3] = [
    "Lic. Francisco Jahir Vazquez De Leon",
    "Ayudante Paco",
    "Roberto Carlos De La Cruz Gonzalez",
];

/// Problem categories offered by the submission form and the dashboard type filter.
pub const PROBLEM_TYPES: [&str; 11] = [
    "Hardware - Computadoras",
    "Hardware - Impresoras",
    "Hardware - Red/Internet",
    "Software - Instalación",
    "Software - Configuración",
    "Software - Licencias",
    "Sistemas - Base de datos",
    "Sistemas - Aplicaciones web",
    "Soporte - Capacitación",
    "Soporte - Mantenimiento",
    "Otro",
];

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
pub enum Priority {
    #[default]
    Baja,
    Media,
    Alta,
    #[serde(rename = "Crítica")]
    Critica,
}

impl Priority {
    /// Severity order, lowest first.
    pub const ALL: [Priority; 4] = [Priority::Baja, Priority::Media, Priority::Alta, Priority::Critica];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Baja => "Baja",
            Priority::Media => "Media",
            Priority::Alta => "Alta",
            Priority::Critica => "Crítica",
        }
    }

    /// Accepts the canonical labels case-insensitively, plus "Critica" without the accent.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "baja" => Some(Priority::Baja),
            "media" => Some(Priority::Media),
            "alta" => Some(Priority::Alta),
            "crítica" | "critica" => Some(Priority::Critica),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Status {
    #[default]
    Pendiente,
    #[serde(rename = "En Proceso")]
    EnProceso,
    Resuelto,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Pendiente, Status::EnProceso, Status::Resuelto];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pendiente => "Pendiente",
            Status::EnProceso => "En Proceso",
            Status::Resuelto => "Resuelto",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pendiente" => Some(Status::Pendiente),
            "en proceso" | "enproceso" => Some(Status::EnProceso),
            "resuelto" => Some(Status::Resuelto),
            _ => None,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A department list as it arrives on the wire: either a proper list or a comma-joined string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum DepartmentField {
    List(Vec<String>),
    Joined(String),
}

impl DepartmentField {
    /// Trimmed, non-empty department names in their original order.
    pub fn into_list(self) -> Vec<String> {
        match self {
            DepartmentField::List(items) => items
                .into_iter()
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .collect(),
            DepartmentField::Joined(joined) => split_list(&joined),
        }
    }
}

/// Splits a comma-joined list, trimming each entry and dropping empty ones.
pub fn split_list(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .collect()
}

/// Canonical report record, as stored and as served by `GET /api/reportes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub departamento: Vec<String>,
    pub descripcion: String,
    pub tipo_problema: String,
    pub quien_reporta: String,
    pub prioridad: Priority,
    pub asignado_a: String,
    pub status: Status,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub imagenes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
}

/// Body of a create-report request. The server fills in whatever is left empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub departamento: Vec<String>,
    pub descripcion: String,
    pub tipo_problema: String,
    pub quien_reporta: String,
    pub prioridad: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asignado_a: Option<String>,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub imagenes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
}

/// Partial update. Absent fields are left untouched; `timestamp` is not patchable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prioridad: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departamento: Option<DepartmentField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tipo_problema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quien_reporta: Option<String>,
}

impl ReportPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.prioridad.is_none()
            && self.departamento.is_none()
            && self.descripcion.is_none()
            && self.tipo_problema.is_none()
            && self.quien_reporta.is_none()
    }

    pub fn apply_to(&self, report: &mut Report) {
        if let Some(status) = self.status {
            report.status = status;
        }
        if let Some(prioridad) = self.prioridad {
            report.prioridad = prioridad;
        }
        if let Some(departamento) = &self.departamento {
            report.departamento = departamento.clone().into_list();
        }
        if let Some(descripcion) = &self.descripcion {
            report.descripcion = descripcion.clone();
        }
        if let Some(tipo) = &self.tipo_problema {
            report.tipo_problema = tipo.clone();
        }
        if let Some(quien) = &self.quien_reporta {
            report.quien_reporta = quien.clone();
        }
    }
}

/// User as returned to clients. The password hash never leaves the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub nombre: String,
    pub email: String,
    pub rol: String,
}

#[derive(Debug, Clone)]
pub struct StoredUser {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub rol: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

// Response DTOs
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub message: String,
    pub usuario: User,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatedResponse {
    pub message: String,
    pub id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

/// Build stamp reported by `/version`. Empty stamps are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VersionResponse {
    pub service: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub git_sha: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub build_time: String,
}
