use std::collections::HashMap;

use crate::models::{DepartmentField, Priority, Report, ReportPatch, Status};

/// A single field change made on a table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEdit {
    Status(Status),
    Prioridad(Priority),
    Departamento(Vec<String>),
    Descripcion(String),
    TipoProblema(String),
    QuienReporta(String),
}

/// Uncommitted row edits, keyed by report id. Later edits of the same field win.
#[derive(Debug, Clone, Default)]
pub struct DraftBook {
    drafts: HashMap<String, ReportPatch>,
}

impl DraftBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: &str, edit: FieldEdit) {
        let patch = self.drafts.entry(id.to_string()).or_default();
        match edit {
            FieldEdit::Status(status) => patch.status = Some(status),
            FieldEdit::Prioridad(prioridad) => patch.prioridad = Some(prioridad),
            FieldEdit::Departamento(list) => patch.departamento = Some(DepartmentField::List(list)),
            FieldEdit::Descripcion(text) => patch.descripcion = Some(text),
            FieldEdit::TipoProblema(text) => patch.tipo_problema = Some(text),
            FieldEdit::QuienReporta(text) => patch.quien_reporta = Some(text),
        }
    }

    pub fn get(&self, id: &str) -> Option<&ReportPatch> {
        self.drafts.get(id)
    }

    /// Removes and returns the draft so it can be committed.
    pub fn take(&mut self, id: &str) -> Option<ReportPatch> {
        self.drafts.remove(id).filter(|p| !p.is_empty())
    }

    pub fn discard(&mut self, id: &str) -> bool {
        self.drafts.remove(id).is_some()
    }

    pub fn pending_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.drafts.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    /// The reports as the user currently sees them, drafts applied on top.
    pub fn overlay(&self, reports: &[Report]) -> Vec<Report> {
        reports
            .iter()
            .map(|report| match self.drafts.get(&report.id) {
                Some(patch) => {
                    let mut edited = report.clone();
                    patch.apply_to(&mut edited);
                    edited
                }
                None => report.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(id: &str) -> Report {
        Report {
            id: id.to_string(),
            departamento: vec!["DIF".to_string()],
            descripcion: "Teclado no responde".to_string(),
            tipo_problema: "Hardware - Computadoras".to_string(),
            quien_reporta: "Ana".to_string(),
            prioridad: Priority::Baja,
            asignado_a: "Ayudante Paco".to_string(),
            status: Status::Pendiente,
            timestamp: "2025-03-10T09:00:00Z".parse().unwrap(),
            imagenes: vec![],
            email: None,
            telefono: None,
        }
    }

    #[test]
    fn test_edits_merge_per_row() {
        let mut book = DraftBook::new();
        book.set("R-1", FieldEdit::Status(Status::EnProceso));
        book.set("R-1", FieldEdit::Prioridad(Priority::Alta));
        book.set("R-1", FieldEdit::Status(Status::Resuelto));
        book.set("R-2", FieldEdit::Descripcion("Nueva descripción".to_string()));

        assert_eq!(book.pending_ids(), vec!["R-1", "R-2"]);
        let patch = book.take("R-1").unwrap();
        assert_eq!(patch.status, Some(Status::Resuelto));
        assert_eq!(patch.prioridad, Some(Priority::Alta));
        assert!(book.get("R-1").is_none());
        assert!(book.discard("R-2"));
        assert!(book.is_empty());
    }

    #[test]
    fn test_overlay_shows_unsaved_edits() {
        let mut book = DraftBook::new();
        book.set("R-2", FieldEdit::Departamento(vec!["CABILDO".to_string(), "DIF".to_string()]));
        let shown = book.overlay(&[report("R-1"), report("R-2")]);
        assert_eq!(shown[0].departamento, vec!["DIF"]);
        assert_eq!(shown[1].departamento, vec!["CABILDO", "DIF"]);
        assert_eq!(shown[1].timestamp, report("R-2").timestamp);
    }
}
