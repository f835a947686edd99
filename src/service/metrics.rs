use crate::db::goal::schema::Goal;
use crate::service::reports::{normalize, ReportKind, ReportTable};
use serde::Serialize;
use std::collections::HashMap;
use time::util::days_in_year_month;
use time::Date;
use tracing::warn;

/// The fixed set of tracked developments. Projects are never discovered from
/// the reports, rows for anything else are ignored.
pub const TARGET_PROJECTS: [&str; 4] = [
    "HELIO - SANTA BEATRIZ",
    "LITORAL 900",
    "LOMAS DE CARABAYLLO",
    "SUNNY",
];

// Logical column names, resolved against the export headers case- and
// whitespace-insensitively
const COL_PROYECTO: &str = "PROYECTO";
const COL_LEAD_UNICO: &str = "LEADUNICOXMESPROYECTO";
const COL_COMO_SE_ENTERO: &str = "COMOSEENTERO";
const COL_NRO_DOCUMENTO: &str = "NRODOCUMENTO";
const COL_SUB_ESTADO: &str = "SUBESTADO";
const COL_DESCRIPCION_PROYECTO: &str = "DESCRIPCIONPROYECTO";
const COL_TIPO_INMUEBLE: &str = "TIPOINMUEBLE_1";

/// Substrings identifying a digital acquisition channel in the "how did you
/// hear about us" field
pub const DIGITAL_KEYWORDS: [&str; 13] = [
    "META",
    "FACEBOOK",
    "NEXO",
    "WHATSAPP",
    "PAGINA WEB",
    "WEB",
    "TIK TOK",
    "TIKTOK",
    "FERIA",
    "ADS",
    "DIGITAL",
    "INSTAGRAM",
    "GOOGLE",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    #[serde(rename = "Proyecto")]
    pub project: String,
    #[serde(rename = "Metrics")]
    pub metrics: ProjectMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectMetrics {
    #[serde(rename = "Leads Totales")]
    pub leads_totales: MetricEntry,
    #[serde(rename = "Leads DNI")]
    pub leads_dni: MetricEntry,
    #[serde(rename = "Leads Digitales")]
    pub leads_digitales: MetricEntry,
    #[serde(rename = "Prospectos")]
    pub prospectos: MetricEntry,
    #[serde(rename = "Visitas Totales")]
    pub visitas_totales: MetricEntry,
    #[serde(rename = "Separaciones Totales")]
    pub separaciones_totales: MetricEntry,
    #[serde(rename = "Ventas Totales")]
    pub ventas_totales: MetricEntry,
}

/// One goal-vs-actual cell: the monthly goal, the goal prorated to the
/// elapsed fraction of the month, the actual count and the percentage of the
/// prorated goal reached
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricEntry {
    #[serde(rename = "Meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<i64>,
    #[serde(rename = "MetaDia", skip_serializing_if = "Option::is_none")]
    pub meta_dia: Option<i64>,
    #[serde(rename = "Real")]
    pub real: i64,
    #[serde(rename = "Pct", skip_serializing_if = "Option::is_none")]
    pub pct: Option<i64>,
}

impl MetricEntry {
    fn against_goal(meta: i64, real: i64, fraction: f64) -> MetricEntry {
        let meta_dia = prorated_goal(meta, fraction);
        MetricEntry {
            meta: Some(meta),
            meta_dia: Some(meta_dia),
            real,
            pct: Some(percent_of_goal(real, meta_dia)),
        }
    }

    fn real_only(real: i64) -> MetricEntry {
        MetricEntry {
            meta: None,
            meta_dia: None,
            real,
            pct: None,
        }
    }
}

/// Fraction of the current month that has elapsed as of `today`
pub fn elapsed_month_fraction(today: Date) -> f64 {
    today.day() as f64 / days_in_year_month(today.year(), today.month()) as f64
}

pub fn prorated_goal(goal: i64, fraction: f64) -> i64 {
    if goal > 0 {
        (goal as f64 * fraction).ceil() as i64
    } else {
        0
    }
}

/// Percent of the prorated goal reached. A zero prorated goal reports 0
/// instead of dividing.
pub fn percent_of_goal(real: i64, prorated: i64) -> i64 {
    if prorated > 0 {
        ((real as f64 / prorated as f64) * 100.0).round() as i64
    } else {
        0
    }
}

/// Computes the full KPI snapshot for every tracked project
pub fn compute(
    tables: &HashMap<ReportKind, ReportTable>,
    goals: &[Goal],
    today: Date,
) -> Vec<MetricRow> {
    let empty = ReportTable::empty();
    let prospectos = tables.get(&ReportKind::Prospectos).unwrap_or(&empty);
    let ventas = tables.get(&ReportKind::Ventas).unwrap_or(&empty);
    let separaciones = tables.get(&ReportKind::Separaciones).unwrap_or(&empty);
    let visitas = tables.get(&ReportKind::Visitas).unwrap_or(&empty);

    let fraction = elapsed_month_fraction(today);

    TARGET_PROJECTS
        .iter()
        .map(|project| {
            let goal = goals
                .iter()
                .find(|it| it.project == *project)
                .cloned()
                .unwrap_or_else(|| Goal::zero(project));
            MetricRow {
                project: project.to_string(),
                metrics: ProjectMetrics {
                    leads_totales: MetricEntry::against_goal(
                        goal.prospectos_totales,
                        count_leads_totales(prospectos, project),
                        fraction,
                    ),
                    leads_dni: MetricEntry::real_only(count_leads_con_dni(prospectos, project)),
                    leads_digitales: MetricEntry::against_goal(
                        goal.prospectos_digitales,
                        count_leads_digitales(prospectos, project),
                        fraction,
                    ),
                    prospectos: MetricEntry::against_goal(
                        goal.contactados,
                        count_contactados(prospectos, project),
                        fraction,
                    ),
                    visitas_totales: MetricEntry::against_goal(
                        goal.visitas_sala,
                        count_visitas(visitas, project),
                        fraction,
                    ),
                    separaciones_totales: MetricEntry::against_goal(
                        goal.separaciones_totales,
                        count_separaciones(separaciones, project),
                        fraction,
                    ),
                    ventas_totales: MetricEntry::against_goal(
                        goal.metas_minutas,
                        count_ventas(ventas, project),
                        fraction,
                    ),
                },
            }
        })
        .collect()
}

fn eq(value: &str, expected: &str) -> bool {
    normalize(value) == normalize(expected)
}

fn contains_any(value: &str, keywords: &[&str]) -> bool {
    let value = normalize(value);
    keywords.iter().any(|it| value.contains(it))
}

fn missing_column(metric: &str, column: &str) -> i64 {
    warn!(metric, column, "Column not found, counting 0");
    0
}

/// Rows where the project matches and the unique-lead-per-month flag is set
pub fn count_leads_totales(table: &ReportTable, project: &str) -> i64 {
    if table.is_empty() {
        return 0;
    }
    let Some(proyecto) = table.column(COL_PROYECTO) else {
        return missing_column("leads totales", COL_PROYECTO);
    };
    let Some(lead_unico) = table.column(COL_LEAD_UNICO) else {
        return missing_column("leads totales", COL_LEAD_UNICO);
    };
    (0..table.len())
        .filter(|&row| {
            eq(table.value(row, proyecto), project) && eq(table.value(row, lead_unico), "SI")
        })
        .count() as i64
}

/// Unique leads that carry a document number. When the export has no document
/// column at all, falls back to the plain unique-lead count.
pub fn count_leads_con_dni(table: &ReportTable, project: &str) -> i64 {
    if table.is_empty() {
        return 0;
    }
    let Some(proyecto) = table.column(COL_PROYECTO) else {
        return missing_column("leads con DNI", COL_PROYECTO);
    };
    let Some(lead_unico) = table.column(COL_LEAD_UNICO) else {
        return missing_column("leads con DNI", COL_LEAD_UNICO);
    };
    let nro_documento = table.column(COL_NRO_DOCUMENTO);
    (0..table.len())
        .filter(|&row| {
            eq(table.value(row, proyecto), project)
                && eq(table.value(row, lead_unico), "SI")
                && nro_documento
                    .map(|col| !table.value(row, col).trim().is_empty())
                    .unwrap_or(true)
        })
        .count() as i64
}

/// Unique leads whose acquisition channel matches any digital keyword
pub fn count_leads_digitales(table: &ReportTable, project: &str) -> i64 {
    if table.is_empty() {
        return 0;
    }
    let Some(proyecto) = table.column(COL_PROYECTO) else {
        return missing_column("leads digitales", COL_PROYECTO);
    };
    let Some(lead_unico) = table.column(COL_LEAD_UNICO) else {
        return missing_column("leads digitales", COL_LEAD_UNICO);
    };
    let Some(como_se_entero) = table.column(COL_COMO_SE_ENTERO) else {
        return missing_column("leads digitales", COL_COMO_SE_ENTERO);
    };
    (0..table.len())
        .filter(|&row| {
            eq(table.value(row, proyecto), project)
                && eq(table.value(row, lead_unico), "SI")
                && contains_any(table.value(row, como_se_entero), &DIGITAL_KEYWORDS)
        })
        .count() as i64
}

/// Unique leads whose sub-state reached "contactado"
pub fn count_contactados(table: &ReportTable, project: &str) -> i64 {
    if table.is_empty() {
        return 0;
    }
    let Some(proyecto) = table.column(COL_PROYECTO) else {
        return missing_column("contactados", COL_PROYECTO);
    };
    let Some(lead_unico) = table.column(COL_LEAD_UNICO) else {
        return missing_column("contactados", COL_LEAD_UNICO);
    };
    let Some(sub_estado) = table.column(COL_SUB_ESTADO) else {
        return missing_column("contactados", COL_SUB_ESTADO);
    };
    (0..table.len())
        .filter(|&row| {
            eq(table.value(row, proyecto), project)
                && eq(table.value(row, lead_unico), "SI")
                && eq(table.value(row, sub_estado), "CONTACTADO")
        })
        .count() as i64
}

/// All visit rows for the project. The visits export names its project column
/// either way depending on the portal version.
pub fn count_visitas(table: &ReportTable, project: &str) -> i64 {
    if table.is_empty() {
        return 0;
    }
    let Some(proyecto) = table
        .column(COL_PROYECTO)
        .or_else(|| table.column(COL_DESCRIPCION_PROYECTO))
    else {
        return missing_column("visitas", COL_PROYECTO);
    };
    (0..table.len())
        .filter(|&row| eq(table.value(row, proyecto), project))
        .count() as i64
}

/// Reservations of apartments for the project
pub fn count_separaciones(table: &ReportTable, project: &str) -> i64 {
    if table.is_empty() {
        return 0;
    }
    let Some(proyecto) = table.column(COL_DESCRIPCION_PROYECTO) else {
        return missing_column("separaciones", COL_DESCRIPCION_PROYECTO);
    };
    let Some(tipo_inmueble) = table.column(COL_TIPO_INMUEBLE) else {
        return missing_column("separaciones", COL_TIPO_INMUEBLE);
    };
    (0..table.len())
        .filter(|&row| {
            eq(table.value(row, proyecto), project)
                && eq(table.value(row, tipo_inmueble), "DEPARTAMENTO")
        })
        .count() as i64
}

/// Closed apartment sales for the project
pub fn count_ventas(table: &ReportTable, project: &str) -> i64 {
    if table.is_empty() {
        return 0;
    }
    let Some(proyecto) = table.column(COL_PROYECTO) else {
        return missing_column("ventas", COL_PROYECTO);
    };
    let Some(tipo_inmueble) = table.column(COL_TIPO_INMUEBLE) else {
        return missing_column("ventas", COL_TIPO_INMUEBLE);
    };
    (0..table.len())
        .filter(|&row| {
            eq(table.value(row, proyecto), project)
                && eq(table.value(row, tipo_inmueble), "DEPARTAMENTO")
        })
        .count() as i64
}
