//! Dashboard aggregates over an already-filtered report set.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Datelike, TimeZone, Weekday};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Priority, Report, Status};
use crate::reports::date_range::DateRange;

/// Month labels used by the trend chart.
pub const MONTH_LABELS: [&str; 12] = [
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

const WEEKDAYS: [(Weekday, &str); 5] = [
    (Weekday::Mon, "Lunes"),
    (Weekday::Tue, "Martes"),
    (Weekday::Wed, "Miércoles"),
    (Weekday::Thu, "Jueves"),
    (Weekday::Fri, "Viernes"),
];

/// Number of reports listed under recent activity.
pub const RECENT_LIMIT: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total: usize,
    pub pendientes: usize,
    pub en_proceso: usize,
    pub resueltos: usize,
    pub usuarios: usize,
    pub tipos_problema: usize,
    pub criticos: usize,
    pub departamentos_activos: usize,
    /// Resolved share of the total, rounded to a whole percent.
    pub porcentaje_resolucion: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PriorityBucket {
    pub prioridad: Priority,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WeekdayBucket {
    pub dia: String,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MonthBucket {
    pub mes: String,
    pub reportes: usize,
    pub resueltos: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Trend {
    pub year: i32,
    pub months: Vec<MonthBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub kpis: Kpis,
    pub por_departamento: BTreeMap<String, usize>,
    pub por_prioridad: Vec<PriorityBucket>,
    pub por_tipo: BTreeMap<String, usize>,
    pub por_usuario: BTreeMap<String, usize>,
    pub por_dia: Vec<WeekdayBucket>,
    pub tendencia: Trend,
    pub recientes: Vec<Report>,
}

impl DashboardStats {
    /// Computes every aggregate in one pass. `date_range` only picks the trend year;
    /// `reports` is expected to be filtered already.
    pub fn compute<Tz: TimeZone>(
        reports: &[Report],
        date_range: &DateRange,
        reference: &DateTime<Tz>,
    ) -> Self {
        let tz = reference.timezone();
        let year = date_range.literal_year().unwrap_or_else(|| reference.year());

        let mut kpis = Kpis {
            total: reports.len(),
            ..Default::default()
        };
        let mut reporters = HashSet::new();
        let mut types = HashSet::new();
        let mut por_departamento = BTreeMap::new();
        let mut por_tipo = BTreeMap::new();
        let mut por_usuario = BTreeMap::new();
        let mut priorities = [0usize; 4];
        let mut weekdays = [0usize; 5];
        let mut months = [(0usize, 0usize); 12];

        for report in reports {
            match report.status {
                Status::Pendiente => kpis.pendientes += 1,
                Status::EnProceso => kpis.en_proceso += 1,
                Status::Resuelto => kpis.resueltos += 1,
            }
            if report.prioridad == Priority::Critica {
                kpis.criticos += 1;
            }
            if !report.quien_reporta.is_empty() {
                reporters.insert(report.quien_reporta.as_str());
                *por_usuario.entry(report.quien_reporta.clone()).or_insert(0) += 1;
            }
            if !report.tipo_problema.is_empty() {
                types.insert(report.tipo_problema.as_str());
                *por_tipo.entry(report.tipo_problema.clone()).or_insert(0) += 1;
            }
            for department in &report.departamento {
                *por_departamento.entry(department.clone()).or_insert(0) += 1;
            }
            if let Some(idx) = Priority::ALL.iter().position(|p| *p == report.prioridad) {
                priorities[idx] += 1;
            }

            let local = report.timestamp.with_timezone(&tz);
            if let Some(idx) = WEEKDAYS.iter().position(|(day, _)| *day == local.weekday()) {
                weekdays[idx] += 1;
            }
            if local.year() == year {
                let bucket = &mut months[local.month0() as usize];
                bucket.0 += 1;
                if report.status == Status::Resuelto {
                    bucket.1 += 1;
                }
            }
        }

        kpis.usuarios = reporters.len();
        kpis.tipos_problema = types.len();
        kpis.departamentos_activos = por_departamento.len();
        kpis.porcentaje_resolucion = resolution_percentage(kpis.resueltos, kpis.total);

        let mut recientes = reports.to_vec();
        recientes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        recientes.truncate(RECENT_LIMIT);

        Self {
            kpis,
            por_departamento,
            por_prioridad: Priority::ALL
                .iter()
                .zip(priorities)
                .map(|(prioridad, total)| PriorityBucket {
                    prioridad: *prioridad,
                    total,
                })
                .collect(),
            por_tipo,
            por_usuario,
            por_dia: WEEKDAYS
                .iter()
                .zip(weekdays)
                .map(|((_, label), total)| WeekdayBucket {
                    dia: label.to_string(),
                    total,
                })
                .collect(),
            tendencia: Trend {
                year,
                months: MONTH_LABELS
                    .iter()
                    .zip(months)
                    .map(|(label, (reportes, resueltos))| MonthBucket {
                        mes: label.to_string(),
                        reportes,
                        resueltos,
                    })
                    .collect(),
            },
            recientes,
        }
    }
}

/// Round-half-up integer percentage, 0 for an empty set.
pub fn resolution_percentage(resolved: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((resolved * 200 + total) / (total * 2)) as u32
}
