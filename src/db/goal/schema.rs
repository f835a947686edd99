use rusqlite::Row;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use time::OffsetDateTime;

pub const TABLE_NAME: &str = "goal";

pub enum Columns {
    Project,
    ProspectosTotales,
    ProspectosDigitales,
    Contactados,
    VisitasSala,
    SeparacionesTotales,
    MetasMinutas,
    UpdatedAt,
}

impl Columns {
    pub fn as_str(&self) -> &'static str {
        match self {
            Columns::Project => "project",
            Columns::ProspectosTotales => "prospectos_totales",
            Columns::ProspectosDigitales => "prospectos_digitales",
            Columns::Contactados => "contactados",
            Columns::VisitasSala => "visitas_sala",
            Columns::SeparacionesTotales => "separaciones_totales",
            Columns::MetasMinutas => "metas_minutas",
            Columns::UpdatedAt => "updated_at",
        }
    }
}

/// The six monthly targets tracked per project. The key strings are part of
/// the wire format consumed by the dashboard and must not be renamed.
pub const METRIC_KEYS: [&str; 6] = [
    "prospectos_totales",
    "prospectos_digitales",
    "contactados",
    "visitas_sala",
    "separaciones_totales",
    "metas_minutas",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Goal {
    pub project: String,
    pub prospectos_totales: i64,
    pub prospectos_digitales: i64,
    pub contactados: i64,
    pub visitas_sala: i64,
    pub separaciones_totales: i64,
    pub metas_minutas: i64,
    pub updated_at: OffsetDateTime,
}

impl Goal {
    pub fn zero(project: &str) -> Goal {
        Goal {
            project: project.into(),
            prospectos_totales: 0,
            prospectos_digitales: 0,
            contactados: 0,
            visitas_sala: 0,
            separaciones_totales: 0,
            metas_minutas: 0,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    pub fn projection() -> &'static str {
        static PROJECTION: OnceLock<String> = OnceLock::new();
        PROJECTION.get_or_init(|| {
            [
                Columns::Project,
                Columns::ProspectosTotales,
                Columns::ProspectosDigitales,
                Columns::Contactados,
                Columns::VisitasSala,
                Columns::SeparacionesTotales,
                Columns::MetasMinutas,
                Columns::UpdatedAt,
            ]
            .iter()
            .map(Columns::as_str)
            .collect::<Vec<_>>()
            .join(", ")
        })
    }

    pub const fn mapper() -> fn(&Row) -> rusqlite::Result<Goal> {
        |row: &_| {
            Ok(Goal {
                project: row.get(Columns::Project.as_str())?,
                prospectos_totales: row.get(Columns::ProspectosTotales.as_str())?,
                prospectos_digitales: row.get(Columns::ProspectosDigitales.as_str())?,
                contactados: row.get(Columns::Contactados.as_str())?,
                visitas_sala: row.get(Columns::VisitasSala.as_str())?,
                separaciones_totales: row.get(Columns::SeparacionesTotales.as_str())?,
                metas_minutas: row.get(Columns::MetasMinutas.as_str())?,
                updated_at: row.get(Columns::UpdatedAt.as_str())?,
            })
        }
    }

    pub fn metric(&self, key: &str) -> Option<i64> {
        match key {
            "prospectos_totales" => Some(self.prospectos_totales),
            "prospectos_digitales" => Some(self.prospectos_digitales),
            "contactados" => Some(self.contactados),
            "visitas_sala" => Some(self.visitas_sala),
            "separaciones_totales" => Some(self.separaciones_totales),
            "metas_minutas" => Some(self.metas_minutas),
            _ => None,
        }
    }

    pub fn metrics_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for key in METRIC_KEYS {
            map.insert(key.into(), self.metric(key).unwrap_or_default().into());
        }
        map
    }
}
